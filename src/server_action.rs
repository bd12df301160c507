use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;

pub(crate) mod yarn_config_calculation;

/// Free-form data handed from one upgrade step to the next
pub(crate) type SharedDataContext = HashMap<String, serde_json::Value>;

#[derive(Debug, Clone)]
pub(crate) struct ExecutionCommand {
    pub(crate) cluster_name: String,
}

#[derive(strum_macros::Display, serde::Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub(crate) enum HostRoleStatus {
    Completed,
    Failed,
}

impl HostRoleStatus {
    pub(crate) fn is_failed_state(&self) -> bool {
        matches!(self, HostRoleStatus::Failed)
    }
}

/// What a server action reports back to the upgrade orchestrator
#[derive(serde::Serialize, Debug, Clone, PartialEq, Eq)]
pub(crate) struct CommandReport {
    pub(crate) exit_code: i32,
    pub(crate) status: HostRoleStatus,
    pub(crate) structured_out: String,
    pub(crate) stdout: String,
    pub(crate) stderr: String,
}

impl CommandReport {
    pub(crate) fn new(exit_code: i32, status: HostRoleStatus, structured_out: &str, stdout: String, stderr: &str) -> Self {
        Self {
            exit_code,
            status,
            structured_out: structured_out.to_string(),
            stdout,
            stderr: stderr.to_string(),
        }
    }
}

/// A single step of an upgrade, executed by the orchestrator on the server side
#[async_trait]
pub(crate) trait ServerAction: Send + Sync {
    fn name(&self) -> &'static str;

    async fn execute(&self, command: &ExecutionCommand, shared_context: &mut SharedDataContext) -> Result<CommandReport>;
}
