use super::*;
use crate::config::path::ConfigPath;
use clio::ClioPath;
use serial_test::serial;
use std::path::Path;

const CLUSTER_STATE: &str = r#"
clusters:
  c1:
    desired_configs:
      yarn-site:
        tag: version1
        version: 1
        properties:
          yarn.resourcemanager.zk-address: old:2181
          hadoop.registry.zk.quorum: old:2181
          yarn.resourcemanager.recovery.enabled: "true"
      zoo.cfg:
        tag: version1
        version: 1
        properties:
          clientPort: 2182
    service_component_hosts:
      - { service: ZOOKEEPER, component: ZOOKEEPER_SERVER, host: zk1.example.com }
      - { service: ZOOKEEPER, component: ZOOKEEPER_SERVER, host: zk2.example.com }
      - { service: ZOOKEEPER, component: ZOOKEEPER_SERVER, host: zk3.example.com }
  c2:
    desired_configs: {}
"#;

fn test_config(state_dir: &Path, cluster_name: &str, dry_run: bool) -> Result<UpgradeConfig> {
    let state_file = state_dir.join("cluster-state.yaml");
    if !state_file.exists() {
        std::fs::write(&state_file, CLUSTER_STATE)?;
    }

    let summary_file = state_dir.join("summary.yaml");

    Ok(UpgradeConfig {
        cluster_name: cluster_name.to_string(),
        cluster_state_file: ConfigPath::from(ClioPath::new(state_file.to_str().context("non-utf8 state file path")?)?),
        dry_run,
        summary_file: Some(ConfigPath::from(ClioPath::new(summary_file.to_str().context("non-utf8 summary file path")?)?)),
        threads: None,
        config_file_raw: None,
        cli_raw: None,
    })
}

fn committed_yarn_site(state_dir: &Path) -> Result<serde_yaml::Value> {
    let state: serde_yaml::Value = serde_yaml::from_str(&std::fs::read_to_string(state_dir.join("cluster-state.yaml"))?)?;

    Ok(state["clusters"]["c1"]["desired_configs"]["yarn-site"]["properties"].clone())
}

#[tokio::test]
#[serial]
async fn test_main_internal_commits() -> Result<()> {
    let state_dir = tempfile::tempdir()?;

    main_internal(test_config(state_dir.path(), "c1", false)?).await?;

    let yarn_site = committed_yarn_site(state_dir.path())?;
    let expected = "zk1.example.com:2182,zk2.example.com:2182,zk3.example.com:2182";
    assert_eq!(yarn_site["yarn.resourcemanager.zk-address"].as_str(), Some(expected));
    assert_eq!(yarn_site["hadoop.registry.zk.quorum"].as_str(), Some(expected));
    assert_eq!(yarn_site["yarn.resourcemanager.recovery.enabled"].as_str(), Some("true"));

    let summary: serde_yaml::Value = serde_yaml::from_str(&std::fs::read_to_string(state_dir.path().join("summary.yaml"))?)?;
    assert_eq!(summary["report"]["status"].as_str(), Some("COMPLETED"));
    assert_eq!(summary["config"]["cluster_name"].as_str(), Some("c1"));
    assert!(summary["run_times"]["commit_run_time"].as_str().is_some());

    // Running again against the committed state changes nothing
    main_internal(test_config(state_dir.path(), "c1", false)?).await?;
    assert_eq!(committed_yarn_site(state_dir.path())?, yarn_site);

    Ok(())
}

#[tokio::test]
#[serial]
async fn test_main_internal_dry_run() -> Result<()> {
    let state_dir = tempfile::tempdir()?;

    main_internal(test_config(state_dir.path(), "c1", true)?).await?;

    assert_eq!(
        std::fs::read_to_string(state_dir.path().join("cluster-state.yaml"))?,
        CLUSTER_STATE
    );

    Ok(())
}

#[tokio::test]
#[serial]
async fn test_main_internal_missing_yarn_site() -> Result<()> {
    let state_dir = tempfile::tempdir()?;

    let err = main_internal(test_config(state_dir.path(), "c2", false)?).await.unwrap_err();
    assert!(format!("{:#}", err).contains("Source type yarn-site not found"));

    assert_eq!(
        std::fs::read_to_string(state_dir.path().join("cluster-state.yaml"))?,
        CLUSTER_STATE
    );

    let summary: serde_yaml::Value = serde_yaml::from_str(&std::fs::read_to_string(state_dir.path().join("summary.yaml"))?)?;
    assert_eq!(summary["report"]["status"].as_str(), Some("FAILED"));

    Ok(())
}

#[tokio::test]
#[serial]
async fn test_main_internal_unknown_cluster() -> Result<()> {
    let state_dir = tempfile::tempdir()?;

    let err = main_internal(test_config(state_dir.path(), "c3", false)?).await.unwrap_err();
    assert!(format!("{:#}", err).contains("cluster c3 not found"));

    let summary: serde_yaml::Value = serde_yaml::from_str(&std::fs::read_to_string(state_dir.path().join("summary.yaml"))?)?;
    assert!(summary["report"].is_null());
    assert!(summary["error"].as_str().is_some_and(|error| error.contains("cluster c3 not found")));

    Ok(())
}
