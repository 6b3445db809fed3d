//! Allowlisted config command proxy.
//!
//! Turns a config read/write request into exactly one gateway CLI invocation
//! inside the sandbox and waits a bounded time for it.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use clawkeeper_core::{
    CommandResult, GatewayEnv, OpsError, ProcessLogs, SpawnOptions, TimeoutPolicy,
};
use clawkeeper_logging::{redact_sensitive_data, GatewayEvent, GatewayEventLogger};
use clawkeeper_sandbox::is_allowed_config_path;

use crate::supervisor::GatewaySupervisor;
use crate::wait::{wait_for_process, WaitOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigCommandKind {
    Get,
    Set,
}

/// A validated config operation. Not yet checked against the allowlist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigCommand {
    Get { path: String },
    Set { path: String, value: String },
}

impl ConfigCommand {
    /// Build a command from raw request parameters.
    ///
    /// `path` must be non-empty. For `Set`, `value` must be present but may be
    /// the empty string.
    pub fn from_query(
        kind: ConfigCommandKind,
        path: Option<&str>,
        value: Option<&str>,
    ) -> Result<Self, OpsError> {
        let path = path.filter(|p| !p.is_empty());
        match kind {
            ConfigCommandKind::Get => {
                let path = path.ok_or_else(|| OpsError::validation("Missing path parameter"))?;
                Ok(Self::Get {
                    path: path.to_string(),
                })
            }
            ConfigCommandKind::Set => match (path, value) {
                (Some(path), Some(value)) => Ok(Self::Set {
                    path: path.to_string(),
                    value: value.to_string(),
                }),
                _ => Err(OpsError::validation("Missing path or value parameter")),
            },
        }
    }

    pub fn path(&self) -> &str {
        match self {
            Self::Get { path } | Self::Set { path, .. } => path,
        }
    }

    /// The shell command line for this operation.
    ///
    /// The path is interpolated as-is, which is only sound for allowlisted
    /// paths. The value is shell-quoted.
    pub fn render(&self, cli: &CliTemplate) -> String {
        match self {
            Self::Get { path } => {
                format!("{} config get {} --url {}", cli.binary, path, cli.control_url)
            }
            Self::Set { path, value } => format!(
                "{} config set {} {} --url {}",
                cli.binary,
                path,
                shell_words::quote(value),
                cli.control_url
            ),
        }
    }
}

/// Where the gateway CLI lives and how it reaches the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliTemplate {
    pub binary: String,
    pub control_url: String,
}

impl Default for CliTemplate {
    fn default() -> Self {
        Self {
            binary: "openclaw".to_string(),
            control_url: "ws://localhost:18789".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProxySettings {
    pub cli: CliTemplate,
    pub timeout: Duration,
    pub poll_interval: Duration,
    pub timeout_policy: TimeoutPolicy,
}

impl Default for ProxySettings {
    fn default() -> Self {
        Self {
            cli: CliTemplate::default(),
            timeout: Duration::from_millis(20_000),
            poll_interval: Duration::from_millis(500),
            timeout_policy: TimeoutPolicy::default(),
        }
    }
}

/// Runs allowlisted config commands against the supervised gateway.
#[derive(Clone)]
pub struct CommandProxy {
    supervisor: GatewaySupervisor,
    settings: Arc<ProxySettings>,
}

impl CommandProxy {
    pub fn new(supervisor: GatewaySupervisor, settings: ProxySettings) -> Self {
        Self {
            supervisor,
            settings: Arc::new(settings),
        }
    }

    pub fn settings(&self) -> &ProxySettings {
        &self.settings
    }

    /// Ensure the gateway, run one CLI invocation, and collect its output.
    ///
    /// Rejected paths never reach the sandbox. A CLI invocation that
    /// outlives the timeout is reported with `timed_out` set and whatever
    /// output it produced so far.
    pub async fn run(
        &self,
        command: &ConfigCommand,
        env: &GatewayEnv,
    ) -> Result<CommandResult, OpsError> {
        if !is_allowed_config_path(command.path()) {
            warn!(path = %command.path(), "Rejected config path outside the allowlist");
            return Err(OpsError::authorization("Config path not allowed"));
        }

        self.supervisor.ensure(env).await?;

        let cmdline = command.render(&self.settings.cli);
        let redacted = redact_sensitive_data(&cmdline);
        debug!(command = %redacted, "Running config command");

        let sandbox = self.supervisor.sandbox();
        let process = sandbox
            .start_process(&cmdline, SpawnOptions::default())
            .await?;

        let outcome = wait_for_process(
            sandbox.as_ref(),
            &process.id,
            self.settings.timeout,
            self.settings.poll_interval,
        )
        .await?;

        let (snapshot, timed_out) = match outcome {
            WaitOutcome::Finished(p) => (p, false),
            WaitOutcome::TimedOut(p) => (p, true),
        };

        if timed_out {
            let killed = self.settings.timeout_policy == TimeoutPolicy::Kill;
            if killed {
                if let Err(e) = sandbox.kill_process(&snapshot.id).await {
                    warn!(process_id = %snapshot.id, error = %e, "Failed to kill timed-out config command");
                }
            }
            GatewayEventLogger::log(GatewayEvent::CommandTimedOut {
                process_id: snapshot.id.clone(),
                command: cmdline.clone(),
                killed,
            });
        } else {
            GatewayEventLogger::log(GatewayEvent::CommandFinished {
                process_id: snapshot.id.clone(),
                command: cmdline.clone(),
                exit_code: snapshot.exit_code,
            });
        }

        let logs = sandbox.get_logs(&snapshot.id).await?;
        let ProcessLogs { stdout, stderr } = logs;
        let exit_code = snapshot.exit_code;

        info!(
            path = %command.path(),
            exit_code = ?exit_code,
            timed_out,
            "Config command finished"
        );

        Ok(CommandResult {
            success: !timed_out && exit_code == Some(0),
            exit_code,
            stdout,
            stderr,
            status: snapshot.status,
            timed_out,
        })
    }
}
