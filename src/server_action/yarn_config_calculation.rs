use super::{CommandReport, ExecutionCommand, HostRoleStatus, ServerAction, SharedDataContext};
use crate::cluster_state::{Cluster, Clusters, ServiceComponentHost};
use anyhow::{Context, Result};
use async_trait::async_trait;
use itertools::Itertools;
use std::sync::Arc;

const YARN_SITE_CONFIG_TYPE: &str = "yarn-site";
const ZOO_CFG_CONFIG_TYPE: &str = "zoo.cfg";
const YARN_RM_ZK_ADDRESS_PROPERTY_NAME: &str = "yarn.resourcemanager.zk-address";
const HADOOP_REGISTRY_ZK_QUORUM_PROPERTY_NAME: &str = "hadoop.registry.zk.quorum";
const ZOOKEEPER_CLIENT_PORT_PROPERTY_NAME: &str = "clientPort";
const DEFAULT_ZK_CLIENT_PORT: &str = "2181";
const ZOOKEEPER_SERVICE_NAME: &str = "ZOOKEEPER";
const ZOOKEEPER_SERVER_COMPONENT_NAME: &str = "ZOOKEEPER_SERVER";

/// Recomputes the ZooKeeper quorum addresses YARN uses (ResourceManager state store and the Hadoop
/// registry) from the ZooKeeper servers currently registered in the cluster
pub(crate) struct ZkAddressRecalculator {
    clusters: Arc<dyn Clusters>,
}

impl ZkAddressRecalculator {
    pub(crate) fn new(clusters: Arc<dyn Clusters>) -> Self {
        Self { clusters }
    }
}

#[async_trait]
impl ServerAction for ZkAddressRecalculator {
    fn name(&self) -> &'static str {
        "yarn-config-calculation"
    }

    async fn execute(&self, command: &ExecutionCommand, _shared_context: &mut SharedDataContext) -> Result<CommandReport> {
        let cluster = self
            .clusters
            .get_cluster(&command.cluster_name)
            .await
            .with_context(|| format!("getting cluster {}", command.cluster_name))?;

        let mut yarn_site_config = match cluster
            .get_desired_config_by_type(YARN_SITE_CONFIG_TYPE)
            .await
            .context("getting yarn-site config")?
        {
            Some(yarn_site_config) => yarn_site_config,
            None => {
                log::warn!("cluster {} has no {} config", cluster.cluster_name(), YARN_SITE_CONFIG_TYPE);
                return Ok(CommandReport::new(
                    0,
                    HostRoleStatus::Failed,
                    "{}",
                    format!("Source type {} not found", YARN_SITE_CONFIG_TYPE),
                    "",
                ));
            }
        };

        let old_rm_zk_address = yarn_site_config.properties.get(YARN_RM_ZK_ADDRESS_PROPERTY_NAME).cloned();
        let old_registry_zk_quorum = yarn_site_config.properties.get(HADOOP_REGISTRY_ZK_QUORUM_PROPERTY_NAME).cloned();

        let zk_client_port = zk_client_port(&*cluster).await.context("determining zookeeper client port")?;

        let zk_servers = cluster
            .get_service_component_hosts(ZOOKEEPER_SERVICE_NAME, ZOOKEEPER_SERVER_COMPONENT_NAME)
            .await
            .context("listing zookeeper servers")?;

        log::info!(
            "found {} {} host(s) in cluster {}",
            zk_servers.len(),
            ZOOKEEPER_SERVER_COMPONENT_NAME,
            cluster.cluster_name()
        );

        let zk_servers_str = zk_addresses(&zk_servers, &zk_client_port);

        yarn_site_config
            .properties
            .insert(YARN_RM_ZK_ADDRESS_PROPERTY_NAME.to_string(), zk_servers_str.clone());
        yarn_site_config
            .properties
            .insert(HADOOP_REGISTRY_ZK_QUORUM_PROPERTY_NAME.to_string(), zk_servers_str.clone());

        log::info!(
            "setting {} and {} to {:?} in {} tag {} version {}",
            YARN_RM_ZK_ADDRESS_PROPERTY_NAME,
            HADOOP_REGISTRY_ZK_QUORUM_PROPERTY_NAME,
            zk_servers_str,
            yarn_site_config.config_type,
            yarn_site_config.tag,
            yarn_site_config.version
        );

        cluster
            .persist_config(&yarn_site_config, false)
            .await
            .context("persisting yarn-site config")?;

        Ok(CommandReport::new(
            0,
            HostRoleStatus::Completed,
            "{}",
            format!(
                "{} was set from {} to {}. {} was set from {} to {}",
                YARN_RM_ZK_ADDRESS_PROPERTY_NAME,
                old_rm_zk_address.as_deref().unwrap_or("null"),
                zk_servers_str,
                HADOOP_REGISTRY_ZK_QUORUM_PROPERTY_NAME,
                old_registry_zk_quorum.as_deref().unwrap_or("null"),
                zk_servers_str
            ),
            "",
        ))
    }
}

async fn zk_client_port(cluster: &dyn Cluster) -> Result<String> {
    Ok(match cluster.get_desired_config_by_type(ZOO_CFG_CONFIG_TYPE).await? {
        Some(zoo_config) => match zoo_config.properties.get(ZOOKEEPER_CLIENT_PORT_PROPERTY_NAME) {
            Some(client_port) => client_port.clone(),
            None => {
                log::info!(
                    "{} has no {}, using default {}",
                    ZOO_CFG_CONFIG_TYPE,
                    ZOOKEEPER_CLIENT_PORT_PROPERTY_NAME,
                    DEFAULT_ZK_CLIENT_PORT
                );
                DEFAULT_ZK_CLIENT_PORT.to_string()
            }
        },
        None => {
            log::info!("no {} config, using default client port {}", ZOO_CFG_CONFIG_TYPE, DEFAULT_ZK_CLIENT_PORT);
            DEFAULT_ZK_CLIENT_PORT.to_string()
        }
    })
}

fn zk_addresses(zk_servers: &[ServiceComponentHost], zk_client_port: &str) -> String {
    zk_servers
        .iter()
        .map(|zk_server| format!("{}:{}", zk_server.host_name, zk_client_port))
        .join(",")
}
