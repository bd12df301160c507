use crate::{config::UpgradeConfig, server_action::CommandReport, upgrade::timing::RunTimes};
use anyhow::{bail, Context, Result};
use lazy_static::lazy_static;
use log::{Level, LevelFilter, Metadata, Record};
use std::sync::{Arc, Mutex};

struct UpgradeLogger;

static LOGGER: UpgradeLogger = UpgradeLogger;

pub(crate) fn init() -> Result<()> {
    match log::set_logger(&LOGGER) {
        Ok(_) => log::set_max_level(LevelFilter::Info),
        Err(_) => bail!("Logger initialization failed"),
    };

    Ok(())
}

lazy_static! {
    pub(crate) static ref LOG_RECORDS: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
}

fn format_record(record: &Record) -> String {
    format!(
        "{} - {} - {}:{}: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        record.level(),
        record.file().unwrap_or("unknown"),
        record.line().unwrap_or(0),
        record.args()
    )
}

impl log::Log for UpgradeLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= Level::Info
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let log_string = format_record(record);

            {
                let mut log_records = match LOG_RECORDS.lock() {
                    Ok(log_records) => log_records,
                    Err(err) => {
                        println!("Failed to lock log records: {}", err);
                        return;
                    }
                };
                log_records.push(log_string.clone());
            }

            println!("{}", log_string);
        }
    }

    fn flush(&self) {}
}

#[derive(serde::Serialize)]
struct Summary<'a> {
    config: &'a UpgradeConfig,
    report: Option<&'a CommandReport>,
    error: Option<String>,
    logs: Vec<String>,
    run_times: Option<&'a RunTimes>,
}

pub(crate) fn generate_summary(
    config: &UpgradeConfig,
    report: Option<&CommandReport>,
    error: Option<&anyhow::Error>,
    run_times: Option<&RunTimes>,
) -> Result<()> {
    let summary_file = match &config.summary_file {
        Some(summary_file) => summary_file.clone(),
        None => return Ok(()),
    };

    let logs = match LOG_RECORDS.lock() {
        Ok(logs) => logs.clone(),
        Err(err) => {
            vec![format!("Failed to lock log records: {}", err)]
        }
    };

    let summary = Summary {
        config,
        report,
        error: error.map(|error| format!("{:#}", error)),
        logs,
        run_times,
    };

    let summary_file = summary_file.0.create().context("opening summary file for writing")?;
    serde_yaml::to_writer(summary_file, &summary).context("serializing summary into summary file")?;

    Ok(())
}
