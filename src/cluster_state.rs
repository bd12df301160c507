use anyhow::Result;
use async_trait::async_trait;
use std::{collections::BTreeMap, sync::Arc};

pub(crate) mod in_memory;

#[derive(Debug, thiserror::Error)]
pub(crate) enum ClusterError {
    #[error("cluster {0} not found")]
    ClusterNotFound(String),

    #[error("cluster {cluster_name} has no desired config of type {config_type}")]
    DesiredConfigNotFound { cluster_name: String, config_type: String },
}

/// The currently active version of a configuration type (e.g. yarn-site) on a cluster. Callers get
/// their own copy, mutate it, and hand it back through [`Cluster::persist_config`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ClusterConfig {
    pub(crate) config_type: String,
    pub(crate) tag: String,
    pub(crate) version: u64,
    pub(crate) properties: BTreeMap<String, String>,
}

/// A single component instance (e.g. a ZOOKEEPER_SERVER) running on a host
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq, Eq)]
pub(crate) struct ServiceComponentHost {
    #[serde(rename = "service")]
    pub(crate) service_name: String,
    #[serde(rename = "component")]
    pub(crate) component_name: String,
    #[serde(rename = "host")]
    pub(crate) host_name: String,
    #[serde(flatten)]
    pub(crate) extra: serde_yaml::Mapping,
}

/// Registry of all managed clusters
#[async_trait]
pub(crate) trait Clusters: Send + Sync {
    async fn get_cluster(&self, cluster_name: &str) -> Result<Arc<dyn Cluster>, ClusterError>;
}

#[async_trait]
pub(crate) trait Cluster: Send + Sync {
    fn cluster_name(&self) -> &str;

    async fn get_desired_config_by_type(&self, config_type: &str) -> Result<Option<ClusterConfig>>;

    /// Component hosts matching the given service and component, in registration order
    async fn get_service_component_hosts(&self, service_name: &str, component_name: &str) -> Result<Vec<ServiceComponentHost>>;

    /// Replace the properties of the desired config of the same type. When write_through is false
    /// the backing store is free to defer the actual write until it is explicitly committed.
    async fn persist_config(&self, config: &ClusterConfig, write_through: bool) -> Result<()>;
}
