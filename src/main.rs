use anyhow::{bail, Context, Result};
use config::UpgradeConfig;

mod cluster_state;
mod config;
mod logging;
mod runtime;
mod server_action;
mod upgrade;

#[cfg(test)]
mod tests;

fn main() -> Result<()> {
    logging::init().context("initializing logging")?;

    let config = UpgradeConfig::new().context("parsing configuration")?;

    runtime::prepare_tokio_runtime(config.threads)
        .context("preparing tokio runtime")?
        .block_on(main_internal(config))
}

async fn main_internal(config: UpgradeConfig) -> Result<()> {
    let outcome = match upgrade::run(&config).await {
        Ok(outcome) => outcome,
        Err(err) => {
            log::error!("upgrade step failed: {:#}", err);
            logging::generate_summary(&config, None, Some(&err), None).context("generating summary")?;
            return Err(err);
        }
    };

    logging::generate_summary(&config, Some(&outcome.report), None, Some(&outcome.run_times)).context("generating summary")?;

    if outcome.report.status.is_failed_state() {
        bail!("upgrade step reported {}: {}", outcome.report.status, outcome.report.stdout);
    }

    println!("{}", outcome.report.stdout);

    Ok(())
}
