//! Submission driver
//!
//! Runs the requested number of independent submission cycles: assemble
//! parameters, resolve the manifest, annotate for Kueue, optionally persist
//! the rendered manifest, dispatch. A rejected create call is logged with
//! its diagnostic detail and does not abort the remaining cycles; template
//! and persistence failures do.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{error, info};

use crate::gateway::JobGateway;
use crate::manifest::{self, JobIdentity, ResolvedJob};
use crate::params::ParameterSet;
use crate::queue::annotate_for_queue;
use crate::template::JobTemplate;
use crate::{Error, Result};

/// Fixed fields and flags for a submission run, resolved once at startup
#[derive(Debug, Clone)]
pub struct SubmitConfig {
    /// The work item to process
    pub work_item: String,
    /// The mode to run in
    pub mode: String,
    /// The Job namespace to run in
    pub namespace: String,
    /// The container name to run
    pub container_name: String,
    /// The container image to run
    pub image: String,
    /// The storage container/host type
    pub storage_type: String,
    /// The storage container/host
    pub storage_container: String,
    /// Kueue LocalQueue name, when admission should be queued
    pub kueue_queue: Option<String>,
    /// Extra template parameters, applied after the fixed fields
    pub overrides: Vec<(String, String)>,
    /// Number of Jobs to submit
    pub count: u32,
    /// Persist each rendered manifest before dispatch
    pub save_manifests: bool,
    /// Directory rendered manifests are written to
    pub save_dir: PathBuf,
}

impl SubmitConfig {
    /// Assemble the ordered parameter set for one submission cycle: fixed
    /// fields in declared order, then overrides, then the queue identifier.
    pub fn parameter_set(&self) -> ParameterSet {
        ParameterSet::builder()
            .field(crate::NAMING_KEY, &self.work_item)
            .field("MODE_STR", &self.mode)
            .field(crate::NAMESPACE_KEY, &self.namespace)
            .field("CONTAINER_NAME", &self.container_name)
            .field("CONTAINER_IMAGE", &self.image)
            .field("STORAGE_TYPE", &self.storage_type)
            .field("STORAGE_CONTAINER", &self.storage_container)
            .overrides(&self.overrides)
            .queue(self.kueue_queue.as_deref())
            .build()
    }
}

/// Outcome of a submission run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SubmitSummary {
    /// Cycles that created a Job
    pub created: usize,
    /// Cycles rejected by the cluster API
    pub failed: usize,
}

/// Drives repeated submission cycles against a [`JobGateway`]
pub struct Submitter<G> {
    config: SubmitConfig,
    template: JobTemplate,
    gateway: G,
}

impl<G: JobGateway> Submitter<G> {
    /// Create a driver over a template and gateway.
    pub fn new(config: SubmitConfig, template: JobTemplate, gateway: G) -> Self {
        Self {
            config,
            template,
            gateway,
        }
    }

    /// Run all submission cycles sequentially.
    ///
    /// A gateway rejection is logged and counted; any other failure aborts
    /// the run. No partial manifest is ever dispatched: a cycle that fails
    /// resolution or annotation never reaches the gateway.
    pub async fn run(&self) -> Result<SubmitSummary> {
        let mut summary = SubmitSummary::default();

        for cycle in 1..=self.config.count {
            match self.submit_once().await {
                Ok(identity) => {
                    info!(
                        job = %identity.name,
                        namespace = %identity.namespace,
                        "job created"
                    );
                    summary.created += 1;
                }
                Err(Error::Client(e)) => {
                    error!(error = %e, cycle, "job creation failed");
                    summary.failed += 1;
                }
                Err(e) => return Err(e),
            }
        }

        Ok(summary)
    }

    /// One full cycle: assemble, resolve, annotate, persist, dispatch.
    async fn submit_once(&self) -> Result<JobIdentity> {
        let params = self.config.parameter_set();
        let ResolvedJob {
            mut manifest,
            identity,
            queue,
        } = manifest::resolve(&params, &self.template)?;

        annotate_for_queue(&mut manifest, queue.as_deref());

        if self.config.save_manifests {
            let path = save_manifest(&self.config.save_dir, &identity.name, &manifest)?;
            info!(path = %path.display(), "saved job manifest");
        }

        self.gateway
            .create_job(&manifest, &identity.namespace)
            .await?;
        Ok(identity)
    }
}

/// Write the rendered manifest as YAML to `<dir>/<job_name>.yaml`,
/// creating the directory on demand and overwriting any existing file.
fn save_manifest(dir: &Path, job_name: &str, manifest: &serde_json::Value) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(format!("{job_name}.yaml"));
    std::fs::write(&path, serde_yaml::to_string(manifest)?)?;
    Ok(path)
}
