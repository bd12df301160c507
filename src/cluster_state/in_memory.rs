use super::{Cluster, ClusterConfig, ClusterError, Clusters, ServiceComponentHost};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{de::Error as _, Deserialize, Deserializer};
use std::{
    collections::BTreeMap,
    io::Write,
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio::sync::Mutex;

// A cluster registry backed by a YAML document on disk. The whole document is loaded into memory
// once, all reads and writes are served from memory, and changes only reach the disk when
// committed (or when a config is persisted with write-through).
pub(crate) struct InMemoryClusterState {
    internal: Arc<Mutex<InMemoryClusterStateInternal>>,
}

struct InMemoryClusterStateInternal {
    path: PathBuf,
    document: ClusterStateDocument,
    dirty: bool,
}

// Every level keeps the keys it doesn't know about in `extra`, commits write the whole document
// back and must not lose anything
#[derive(serde::Serialize, serde::Deserialize, Debug, Default)]
struct ClusterStateDocument {
    #[serde(default)]
    clusters: BTreeMap<String, ClusterDocument>,
    #[serde(flatten)]
    extra: serde_yaml::Mapping,
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Default)]
struct ClusterDocument {
    #[serde(default)]
    desired_configs: BTreeMap<String, DesiredConfig>,
    #[serde(default)]
    service_component_hosts: Vec<ServiceComponentHost>,
    #[serde(flatten)]
    extra: serde_yaml::Mapping,
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone)]
struct DesiredConfig {
    #[serde(default)]
    tag: String,
    #[serde(default)]
    version: u64,
    #[serde(default, deserialize_with = "deserialize_properties")]
    properties: BTreeMap<String, String>,
    #[serde(flatten)]
    extra: serde_yaml::Mapping,
}

// Hand-written state files tend to contain things like `clientPort: 2181`, so non-null scalar
// values are accepted and kept as their string representation
fn deserialize_properties<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error> {
    BTreeMap::<String, serde_yaml::Value>::deserialize(deserializer)?
        .into_iter()
        .map(|(key, value)| {
            let value = match value {
                serde_yaml::Value::String(value) => value,
                serde_yaml::Value::Number(value) => value.to_string(),
                serde_yaml::Value::Bool(value) => value.to_string(),
                serde_yaml::Value::Null => return Err(D::Error::custom(format!("property {} must not be null", key))),
                _ => return Err(D::Error::custom(format!("property {} must be a scalar", key))),
            };

            Ok((key, value))
        })
        .collect()
}

impl InMemoryClusterState {
    pub(crate) async fn load(path: &Path) -> Result<Self> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading cluster state file {}", path.display()))?;

        let document: ClusterStateDocument =
            serde_yaml::from_str(&contents).with_context(|| format!("parsing cluster state file {}", path.display()))?;

        log::info!("loaded {} cluster(s) from {}", document.clusters.len(), path.display());

        Ok(Self {
            internal: Arc::new(Mutex::new(InMemoryClusterStateInternal {
                path: path.to_path_buf(),
                document,
                dirty: false,
            })),
        })
    }

    pub(crate) async fn commit_to_file(&self) -> Result<()> {
        self.internal.lock().await.commit_to_file().await
    }
}

impl InMemoryClusterStateInternal {
    fn cluster(&self, cluster_name: &str) -> Result<&ClusterDocument> {
        self.document
            .clusters
            .get(cluster_name)
            .with_context(|| format!("cluster {} disappeared from state", cluster_name))
    }

    // The lock stays held until the file is replaced, so writers never interleave
    async fn commit_to_file(&mut self) -> Result<()> {
        if !self.dirty {
            log::info!("no cluster state changes to commit to {}", self.path.display());
            return Ok(());
        }

        let serialized = serde_yaml::to_string(&self.document).context("serializing cluster state")?;

        let path = self.path.clone();
        tokio::task::spawn_blocking(move || replace_file(&path, serialized.as_bytes()))
            .await
            .context("waiting for cluster state write")??;

        self.dirty = false;
        log::info!("committed cluster state to {}", self.path.display());

        Ok(())
    }
}

// The file must only ever be replaced whole: write a sibling temporary file and rename it over
fn replace_file(path: &Path, contents: &[u8]) -> Result<()> {
    let directory = path.parent().filter(|parent| !parent.as_os_str().is_empty()).unwrap_or(Path::new("."));
    let mut temp_file =
        tempfile::NamedTempFile::new_in(directory).with_context(|| format!("creating temporary file in {}", directory.display()))?;

    let permissions = std::fs::metadata(path)
        .with_context(|| format!("reading metadata of {}", path.display()))?
        .permissions();
    temp_file
        .as_file()
        .set_permissions(permissions)
        .context("copying permissions to temporary file")?;

    temp_file.write_all(contents).context("writing cluster state")?;
    temp_file
        .persist(path)
        .map_err(|err| err.error)
        .with_context(|| format!("replacing {}", path.display()))?;

    Ok(())
}

struct InMemoryCluster {
    cluster_name: String,
    internal: Arc<Mutex<InMemoryClusterStateInternal>>,
}

#[async_trait]
impl Clusters for InMemoryClusterState {
    async fn get_cluster(&self, cluster_name: &str) -> Result<Arc<dyn Cluster>, ClusterError> {
        if !self.internal.lock().await.document.clusters.contains_key(cluster_name) {
            return Err(ClusterError::ClusterNotFound(cluster_name.to_string()));
        }

        Ok(Arc::new(InMemoryCluster {
            cluster_name: cluster_name.to_string(),
            internal: Arc::clone(&self.internal),
        }))
    }
}

#[async_trait]
impl Cluster for InMemoryCluster {
    fn cluster_name(&self) -> &str {
        &self.cluster_name
    }

    async fn get_desired_config_by_type(&self, config_type: &str) -> Result<Option<ClusterConfig>> {
        let internal = self.internal.lock().await;

        Ok(internal
            .cluster(&self.cluster_name)?
            .desired_configs
            .get(config_type)
            .map(|desired_config| ClusterConfig {
                config_type: config_type.to_string(),
                tag: desired_config.tag.clone(),
                version: desired_config.version,
                properties: desired_config.properties.clone(),
            }))
    }

    async fn get_service_component_hosts(&self, service_name: &str, component_name: &str) -> Result<Vec<ServiceComponentHost>> {
        let internal = self.internal.lock().await;

        Ok(internal
            .cluster(&self.cluster_name)?
            .service_component_hosts
            .iter()
            .filter(|host| host.service_name == service_name && host.component_name == component_name)
            .cloned()
            .collect())
    }

    async fn persist_config(&self, config: &ClusterConfig, write_through: bool) -> Result<()> {
        let mut internal = self.internal.lock().await;

        let desired_config = internal
            .document
            .clusters
            .get_mut(&self.cluster_name)
            .with_context(|| format!("cluster {} disappeared from state", self.cluster_name))?
            .desired_configs
            .get_mut(&config.config_type)
            .ok_or_else(|| ClusterError::DesiredConfigNotFound {
                cluster_name: self.cluster_name.clone(),
                config_type: config.config_type.clone(),
            })?;

        desired_config.properties = config.properties.clone();
        internal.dirty = true;

        if write_through {
            internal.commit_to_file().await.context("writing through config")?;
        }

        Ok(())
    }
}

#[cfg(test)]
pub(crate) async fn load_fixture(yaml: &str) -> Result<(tempfile::NamedTempFile, InMemoryClusterState)> {
    let mut file = tempfile::NamedTempFile::new()?;
    file.write_all(yaml.as_bytes())?;
    let state = InMemoryClusterState::load(file.path()).await?;
    Ok((file, state))
}
