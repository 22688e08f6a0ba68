//! Kubernetes API gateway for Job creation
//!
//! Trait-based access to the create call, enabling dependency injection and
//! mocking in driver tests.

use std::path::Path;
use std::time::Duration;

use kube::api::{Api, DynamicObject, PostParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::discovery::ApiResource;
use kube::{Client, Config};
use serde_json::Value;
use tracing::debug;

use crate::{Error, Result};

/// Default connection timeout for the cluster client
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Default read timeout for the cluster client
const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// API version assumed when a manifest omits `apiVersion`
const DEFAULT_API_VERSION: &str = "batch/v1";
/// Kind assumed when a manifest omits `kind`
const DEFAULT_KIND: &str = "Job";

/// Issues the create-resource call for a rendered Job manifest
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait JobGateway: Send + Sync {
    /// Create the Job described by `manifest` in `namespace`.
    async fn create_job(&self, manifest: &Value, namespace: &str) -> Result<()>;
}

/// Gateway backed by a live cluster connection
pub struct ClusterGateway {
    client: Client,
}

impl ClusterGateway {
    /// Wrap an existing client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Connect using an explicit kubeconfig path, or inferred configuration
    /// (in-cluster service account first, then the local kubeconfig).
    pub async fn connect(kubeconfig: Option<&Path>) -> Result<Self> {
        let mut config = match kubeconfig {
            Some(path) => {
                let kubeconfig = Kubeconfig::read_from(path).map_err(|e| {
                    Error::config(format!(
                        "failed to read kubeconfig {}: {}",
                        path.display(),
                        e
                    ))
                })?;
                Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                    .await
                    .map_err(|e| {
                        Error::config(format!(
                            "failed to load kubeconfig {}: {}",
                            path.display(),
                            e
                        ))
                    })?
            }
            None => Config::infer().await.map_err(|e| {
                Error::config(format!("failed to infer cluster configuration: {e}"))
            })?,
        };
        config.connect_timeout = Some(DEFAULT_CONNECT_TIMEOUT);
        config.read_timeout = Some(DEFAULT_READ_TIMEOUT);
        Ok(Self::new(Client::try_from(config)?))
    }
}

#[async_trait::async_trait]
impl JobGateway for ClusterGateway {
    async fn create_job(&self, manifest: &Value, namespace: &str) -> Result<()> {
        let ar = api_resource_for(manifest);
        let object: DynamicObject = serde_json::from_value(manifest.clone())
            .map_err(|e| Error::parse(format!("manifest is not a valid resource: {e}")))?;

        debug!(kind = %ar.kind, namespace = %namespace, "creating resource");
        let api: Api<DynamicObject> = Api::namespaced_with(self.client.clone(), namespace, &ar);
        api.create(&PostParams::default(), &object).await?;
        Ok(())
    }
}

/// Build the `ApiResource` from the manifest's own `apiVersion`/`kind`,
/// falling back to batch/v1 Job when absent.
fn api_resource_for(manifest: &Value) -> ApiResource {
    let api_version = manifest
        .get("apiVersion")
        .and_then(Value::as_str)
        .unwrap_or(DEFAULT_API_VERSION);
    let kind = manifest
        .get("kind")
        .and_then(Value::as_str)
        .unwrap_or(DEFAULT_KIND);

    let (group, version) = match api_version.split_once('/') {
        Some((group, version)) => (group.to_string(), version.to_string()),
        None => (String::new(), api_version.to_string()),
    };

    ApiResource {
        group,
        version,
        kind: kind.to_string(),
        api_version: api_version.to_string(),
        plural: format!("{}s", kind.to_lowercase()),
    }
}
