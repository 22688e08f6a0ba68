//! Submit Cloudburst batch Jobs to Kubernetes, optionally through Kueue
//!
//! Renders a `${VARIABLE_NAME}` Job template from a flat parameter set,
//! derives a unique lower-case Job name per submission, and creates the Job
//! against the cluster API. When a Kueue LocalQueue is named, the Job is
//! annotated for admission and created suspended so the queue controller can
//! release it.

pub mod error;
pub mod gateway;
pub mod manifest;
pub mod params;
pub mod queue;
pub mod submit;
pub mod template;

pub use error::{Error, Result};

use std::path::PathBuf;

use clap::Parser;
use tracing::info;

use gateway::ClusterGateway;
use params::parse_key_value;
use submit::{SubmitConfig, Submitter};
use template::JobTemplate;

/// Prefix for every derived Job name
pub const JOB_NAME_PREFIX: &str = "job-cb";

/// Parameter key that names the Job (first match wins)
pub const NAMING_KEY: &str = "WORK_ITEM";

/// Parameter key selecting the target namespace
pub const NAMESPACE_KEY: &str = "JOB_NAMESPACE";

/// Reserved parameter key carrying the Kueue LocalQueue name
pub const QUEUE_KEY: &str = "KUEUE_QUEUE";

/// Namespace used when no namespace parameter is present
pub const DEFAULT_NAMESPACE: &str = "default";

/// Annotation consumed by the Kueue controller to route admission
pub const KUEUE_QUEUE_ANNOTATION: &str = "kueue.x-k8s.io/queue-name";

/// Directory rendered manifests are saved under with `--save`
pub const DEFAULT_SAVE_DIR: &str = "tmp/saves";

/// Submit Kubernetes Jobs directly, optionally targeting Kueue
#[derive(Parser, Debug)]
#[command(name = "cloudburst-submit", version, about, long_about = None)]
pub struct Cli {
    /// The work item to process
    #[arg(short = 'w', long)]
    pub work_item: String,

    /// The mode to run in
    #[arg(long, default_value = "full")]
    pub mode: String,

    /// The number of Jobs to submit
    #[arg(short = 'c', long, default_value_t = 1)]
    pub count: u32,

    /// The Job namespace to run in
    #[arg(short = 'n', long, default_value = DEFAULT_NAMESPACE)]
    pub namespace: String,

    /// The container name to run
    #[arg(long, default_value = "cloudburst")]
    pub container_name: String,

    /// The container image to run
    #[arg(long, default_value = "bhdockr/cloudburst:latest")]
    pub image: String,

    /// The storage container/host type
    #[arg(long, env = "STORAGE_TYPE")]
    pub storage_type: String,

    /// The storage container/host
    #[arg(long, env = "STORAGE_CONTAINER")]
    pub storage_container: String,

    /// Kueue LocalQueue name; when set the Job is annotated for Kueue admission
    #[arg(long, env = "KUEUE_QUEUE")]
    pub kueue_queue: Option<String>,

    /// Path to the Job template used for substitution
    #[arg(long, default_value = "template/cloudburst-job-template.yaml")]
    pub job_template: PathBuf,

    /// Additional template parameter to include (can be repeated)
    #[arg(short = 'p', long = "param", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub params: Vec<(String, String)>,

    /// Save rendered Job manifests under ./tmp/saves without skipping submission
    #[arg(long)]
    pub save: bool,

    /// Print debug information
    #[arg(long)]
    pub debug: bool,

    /// Explicit kubeconfig path (default: in-cluster config, then local kubeconfig)
    #[arg(long)]
    pub kubeconfig: Option<PathBuf>,
}

impl Cli {
    /// Run the submission cycles described by the parsed arguments.
    pub async fn run(self) -> Result<()> {
        let template = JobTemplate::load(&self.job_template)?;
        let gateway = ClusterGateway::connect(self.kubeconfig.as_deref()).await?;

        let config = SubmitConfig {
            work_item: self.work_item,
            mode: self.mode,
            namespace: self.namespace,
            container_name: self.container_name,
            image: self.image,
            storage_type: self.storage_type,
            storage_container: self.storage_container,
            kueue_queue: self.kueue_queue,
            overrides: self.params,
            count: self.count,
            save_manifests: self.save,
            save_dir: PathBuf::from(DEFAULT_SAVE_DIR),
        };

        let summary = Submitter::new(config, template, gateway).run().await?;
        info!(
            created = summary.created,
            failed = summary.failed,
            "submission run complete"
        );
        Ok(())
    }
}
