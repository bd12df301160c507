use crate::{
    cluster_state::{in_memory::InMemoryClusterState, Clusters},
    config::UpgradeConfig,
    server_action::{yarn_config_calculation::ZkAddressRecalculator, CommandReport, ExecutionCommand, ServerAction, SharedDataContext},
};
use anyhow::{Context, Result};
use std::sync::Arc;
use timing::{RunTime, RunTimes};

pub(crate) mod timing;

pub(crate) struct UpgradeOutcome {
    pub(crate) report: CommandReport,
    pub(crate) run_times: RunTimes,
}

pub(crate) async fn run(config: &UpgradeConfig) -> Result<UpgradeOutcome> {
    let start = std::time::Instant::now();
    let cluster_state = Arc::new(
        InMemoryClusterState::load(&config.cluster_state_file)
            .await
            .context("loading cluster state")?,
    );
    let load_run_time = RunTime::since_start(start);

    let start = std::time::Instant::now();
    let report = execute(Arc::clone(&cluster_state) as Arc<dyn Clusters>, &config.cluster_name)
        .await
        .context("executing upgrade step")?;
    let execute_run_time = RunTime::since_start(start);

    let start = std::time::Instant::now();
    finalize(&cluster_state, &report, config.dry_run).await.context("finalizing")?;
    let commit_run_time = RunTime::since_start(start);

    Ok(UpgradeOutcome {
        report,
        run_times: RunTimes {
            load_run_time,
            execute_run_time,
            commit_run_time,
        },
    })
}

async fn execute(clusters: Arc<dyn Clusters>, cluster_name: &str) -> Result<CommandReport> {
    let server_action = ZkAddressRecalculator::new(clusters);

    let command = ExecutionCommand {
        cluster_name: cluster_name.to_string(),
    };

    // Nothing runs before or after this step, so it gets a fresh context
    let mut shared_context = SharedDataContext::new();

    log::info!("executing {} on cluster {}", server_action.name(), cluster_name);

    let report = server_action
        .execute(&command, &mut shared_context)
        .await
        .with_context(|| format!("running {}", server_action.name()))?;

    log::info!("{} finished with status {}: {}", server_action.name(), report.status, report.stdout);

    Ok(report)
}

async fn finalize(cluster_state: &InMemoryClusterState, report: &CommandReport, dry_run: bool) -> Result<()> {
    if report.status.is_failed_state() {
        log::warn!("not committing cluster state, step reported {}", report.status);
        return Ok(());
    }

    // Since the cluster state is held in memory, we need to commit the changes back to the state
    // file after we're done (unless we're doing a dry run)
    if dry_run {
        log::info!("dry run, not committing cluster state");
        return Ok(());
    }

    cluster_state
        .commit_to_file()
        .await
        .context("commiting cluster state to file")?;

    Ok(())
}
