use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a sandbox process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessStatus {
    Starting,
    Running,
    Completed,
    Failed,
    Killed,
    Error,
}

impl ProcessStatus {
    /// Whether the process is still alive from the sandbox's point of view.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Starting | Self::Running)
    }

    pub fn is_terminal(self) -> bool {
        !self.is_active()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Killed => "killed",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for ProcessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A snapshot of one process tracked by the sandbox.
///
/// Snapshots are never cached across calls; re-query the sandbox for fresh state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Process {
    pub id: String,
    /// Exact invocation string used to launch the process.
    pub command: String,
    pub status: ProcessStatus,
    pub start_time: Option<DateTime<Utc>>,
    /// Present only once the process is terminal.
    pub exit_code: Option<i32>,
}

/// Captured output of a process.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessLogs {
    pub stdout: String,
    pub stderr: String,
}

/// Environment handed to the gateway when it is launched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GatewayEnv {
    vars: BTreeMap<String, String>,
}

impl GatewayEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn to_spawn_options(&self) -> SpawnOptions {
        SpawnOptions {
            env: self.vars.clone(),
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for GatewayEnv {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Options for `Sandbox::start_process`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpawnOptions {
    pub env: BTreeMap<String, String>,
}

/// Outcome of a single proxied CLI invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResult {
    pub success: bool,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub status: ProcessStatus,
    /// The bounded wait elapsed before the process reached a terminal state.
    pub timed_out: bool,
}

/// What the command proxy does with a CLI invocation that outlives its timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeoutPolicy {
    /// Leave the process alone; a slow but legitimate reply may still land.
    #[default]
    LeaveRunning,
    /// Issue a best-effort kill once the wait elapses.
    Kill,
}

/// Acknowledgement that a restart was initiated. Says nothing about whether
/// the new gateway is up; poll status for that.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestartAck {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_process_id: Option<String>,
}

/// Logical state of the supervised gateway, as last observed by the supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayState {
    Absent,
    Running,
    Restarting,
    #[default]
    Unknown,
}

impl fmt::Display for GatewayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Absent => "absent",
            Self::Running => "running",
            Self::Restarting => "restarting",
            Self::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Result of a status query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayStatus {
    pub ok: bool,
    /// The gateway's process status, or `"missing"`.
    pub status: String,
    pub process_id: Option<String>,
    pub state: GatewayState,
}

/// Result of a log query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogsReport {
    Found {
        process_id: String,
        process_status: ProcessStatus,
        logs: ProcessLogs,
    },
    /// An explicit id was requested and no such process exists.
    NotFound { id: String },
    /// No id was given and no gateway is running.
    NoProcess,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_and_terminal_statuses() {
        assert!(ProcessStatus::Starting.is_active());
        assert!(ProcessStatus::Running.is_active());
        for status in [
            ProcessStatus::Completed,
            ProcessStatus::Failed,
            ProcessStatus::Killed,
            ProcessStatus::Error,
        ] {
            assert!(status.is_terminal(), "{status} should be terminal");
        }
    }

    #[test]
    fn process_serializes_camel_case() {
        let process = Process {
            id: "proc-1".into(),
            command: "openclaw gateway".into(),
            status: ProcessStatus::Running,
            start_time: None,
            exit_code: None,
        };
        let value = serde_json::to_value(&process).unwrap();
        assert_eq!(value["status"], "running");
        assert!(value["exitCode"].is_null());
        assert!(value.get("startTime").is_some());
    }

    #[test]
    fn restart_ack_omits_missing_previous_id() {
        let ack = RestartAck {
            success: true,
            message: "No existing process found, starting new instance...".into(),
            previous_process_id: None,
        };
        let value = serde_json::to_value(&ack).unwrap();
        assert!(value.get("previousProcessId").is_none());
    }

    #[test]
    fn gateway_env_builds_spawn_options() {
        let env = GatewayEnv::new()
            .with_var("OPENCLAW_GATEWAY_TOKEN", "secret")
            .with_var("NODE_ENV", "production");
        let opts = env.to_spawn_options();
        assert_eq!(opts.env.len(), 2);
        assert_eq!(env.get("NODE_ENV"), Some("production"));
    }
}
