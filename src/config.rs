use self::{cli::Cli, path::ConfigPath};
use anyhow::{ensure, Context, Result};
use clap::Parser;
use clio::ClioPath;
use serde_json::Value;
use std::env;

mod cli;
pub(crate) mod path;

pub(crate) const CONFIG_ENV_VAR: &str = "YARN_CONFIG_CALCULATION_CONFIG";

/// All parsed CLI arguments, coalesced into a single struct for convenience
#[derive(serde::Serialize)]
pub(crate) struct UpgradeConfig {
    pub(crate) cluster_name: String,
    pub(crate) cluster_state_file: ConfigPath,
    pub(crate) dry_run: bool,
    pub(crate) summary_file: Option<ConfigPath>,
    pub(crate) threads: Option<usize>,

    pub(crate) config_file_raw: Option<String>,
    pub(crate) cli_raw: Option<String>,
}

impl UpgradeConfig {
    pub(crate) fn parse_from_config_file(config_bytes: &[u8]) -> Result<Self> {
        let value: Value = serde_yaml::from_slice(config_bytes)?;

        let mut value = value.as_object().context("config file must be a YAML object")?.clone();

        let cluster_name = value
            .remove("cluster_name")
            .context("cluster_name is required")?
            .as_str()
            .context("cluster_name must be a string")?
            .to_string();

        let cluster_state_file = {
            let value = value.remove("cluster_state_file").context("cluster_state_file is required")?;
            let cluster_state_file = value.as_str().context("cluster_state_file must be a string")?;
            let clio_path = ClioPath::new(cluster_state_file).context(format!("cluster_state_file {}", cluster_state_file))?;

            ensure!(clio_path.try_exists()?, format!("cluster_state_file must exist: {}", clio_path));
            ensure!(clio_path.is_file(), format!("cluster_state_file must be a file: {}", clio_path));

            ConfigPath::from(clio_path)
        };

        let dry_run = value
            .remove("dry_run")
            .unwrap_or(Value::Bool(false))
            .as_bool()
            .context("dry_run must be a boolean")?;

        let summary_file = match value.remove("summary_file") {
            Some(value) => {
                let summary_file = value.as_str().context("summary_file must be a string")?;
                Some(ConfigPath::from(
                    ClioPath::new(summary_file).context(format!("summary_file {}", summary_file))?,
                ))
            }
            None => None,
        };

        let threads = match value.remove("threads") {
            Some(value) => Some(
                value
                    .as_u64()
                    .context("threads must be an integer")?
                    .try_into()
                    .context("threads must be an integer")?,
            ),
            None => None,
        };

        ensure!(
            value.is_empty(),
            "unknown keys {:?} in config file",
            value.keys().map(|key| key.to_string()).collect::<Vec<String>>().join(", ")
        );

        let upgrade_config = Self {
            cluster_name,
            cluster_state_file,
            dry_run,
            summary_file,
            threads,

            cli_raw: None,
            config_file_raw: Some(String::from_utf8_lossy(config_bytes).to_string()),
        };

        upgrade_config.validate()?;

        Ok(upgrade_config)
    }

    pub(crate) fn parse_from_cli(cli: Cli) -> Result<Self> {
        let upgrade_config = Self {
            cluster_name: cli.cluster_name,
            cluster_state_file: ConfigPath::from(cli.cluster_state_file),
            dry_run: cli.dry_run,
            summary_file: cli.summary_file.map(ConfigPath::from),
            threads: cli.threads,

            config_file_raw: None,
            cli_raw: Some(serde_json::to_string(&env::args().collect::<Vec<String>>())?),
        };

        upgrade_config.validate()?;

        Ok(upgrade_config)
    }

    fn validate(&self) -> Result<()> {
        ensure!(!self.cluster_name.is_empty(), "cluster_name must not be empty");
        ensure!(self.threads != Some(0), "threads must be greater than zero");

        Ok(())
    }

    pub(crate) fn new() -> Result<UpgradeConfig> {
        Ok(match env::var(CONFIG_ENV_VAR) {
            Ok(var) => {
                let num_args = env::args().len();

                ensure!(
                    num_args == 1,
                    "{CONFIG_ENV_VAR} is set, but there are {num_args} CLI arguments. {CONFIG_ENV_VAR} is meant to be used with no arguments."
                );

                UpgradeConfig::parse_from_config_file(&std::fs::read(&var).context(format!("reading {} file {}", CONFIG_ENV_VAR, var))?)
                    .context(format!("parsing {} file {}", CONFIG_ENV_VAR, var))?
            }
            Err(_) => UpgradeConfig::parse_from_cli(Cli::parse()).context("CLI parsing")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn state_file() -> Result<tempfile::NamedTempFile> {
        let mut file = tempfile::NamedTempFile::new()?;
        file.write_all(b"clusters: {}\n")?;
        Ok(file)
    }

    #[test]
    fn test_parse_from_config_file() -> Result<()> {
        let state_file = state_file()?;
        let config_file = format!(
            "cluster_name: c1\ncluster_state_file: {}\ndry_run: true\nthreads: 2\nsummary_file: /tmp/summary.yaml\n",
            state_file.path().display()
        );

        let config = UpgradeConfig::parse_from_config_file(config_file.as_bytes())?;

        assert_eq!(config.cluster_name, "c1");
        assert_eq!(&*config.cluster_state_file, state_file.path());
        assert!(config.dry_run);
        assert_eq!(config.threads, Some(2));
        assert_eq!(config.summary_file.map(|path| path.to_string()).as_deref(), Some("/tmp/summary.yaml"));
        assert_eq!(config.config_file_raw.as_deref(), Some(config_file.as_str()));
        assert!(config.cli_raw.is_none());

        Ok(())
    }

    #[test]
    fn test_parse_from_config_file_defaults() -> Result<()> {
        let state_file = state_file()?;
        let config_file = format!("cluster_name: c1\ncluster_state_file: {}\n", state_file.path().display());

        let config = UpgradeConfig::parse_from_config_file(config_file.as_bytes())?;

        assert!(!config.dry_run);
        assert!(config.summary_file.is_none());
        assert!(config.threads.is_none());

        Ok(())
    }

    #[test]
    fn test_parse_from_config_file_rejects_bad_input() -> Result<()> {
        let state_file = state_file()?;
        let state_file = state_file.path().display();

        for config_file in [
            format!("cluster_state_file: {}\n", state_file),
            "cluster_name: c1\n".to_string(),
            "cluster_name: c1\ncluster_state_file: /does/not/exist.yaml\n".to_string(),
            format!("cluster_name: c1\ncluster_state_file: {}\nunexpected: 1\n", state_file),
            format!("cluster_name: \"\"\ncluster_state_file: {}\n", state_file),
            format!("cluster_name: c1\ncluster_state_file: {}\nthreads: 0\n", state_file),
            format!("cluster_name: c1\ncluster_state_file: {}\ndry_run: maybe\n", state_file),
            "- not\n- an\n- object\n".to_string(),
        ] {
            assert!(
                UpgradeConfig::parse_from_config_file(config_file.as_bytes()).is_err(),
                "expected failure for {:?}",
                config_file
            );
        }

        Ok(())
    }

    #[test]
    fn test_parse_from_cli() -> Result<()> {
        let state_file = state_file()?;

        let cli = Cli::try_parse_from([
            "yarn-config-calculation",
            "--cluster-name",
            "c1",
            "--cluster-state-file",
            state_file.path().to_str().context("non-utf8 temp path")?,
            "--dry-run",
        ])?;

        let config = UpgradeConfig::parse_from_cli(cli)?;

        assert_eq!(config.cluster_name, "c1");
        assert_eq!(&*config.cluster_state_file, state_file.path());
        assert!(config.dry_run);
        assert!(config.cli_raw.is_some());
        assert!(config.config_file_raw.is_none());

        Ok(())
    }

    #[test]
    fn test_cli_requires_existing_state_file() {
        assert!(Cli::try_parse_from([
            "yarn-config-calculation",
            "--cluster-name",
            "c1",
            "--cluster-state-file",
            "/does/not/exist.yaml",
        ])
        .is_err());
    }
}
