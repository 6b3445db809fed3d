//! Read-only views of the gateway: status, logs, process list.

use anyhow::Result;
use tracing::debug;

use clawkeeper_core::{GatewayEnv, GatewayStatus, LogsReport, Process};

use crate::supervisor::GatewaySupervisor;

impl GatewaySupervisor {
    /// Ensure the gateway, then report what discovery sees.
    ///
    /// Status is a side-effecting read: it launches a gateway when none runs.
    pub async fn status(&self, env: &GatewayEnv) -> Result<GatewayStatus> {
        self.ensure(env).await?;
        let found = self.find().await?;
        Ok(GatewayStatus {
            ok: found.is_some(),
            status: found
                .as_ref()
                .map(|p| p.status.to_string())
                .unwrap_or_else(|| "missing".to_string()),
            process_id: found.map(|p| p.id),
            state: self.state().await,
        })
    }

    /// Captured output of process `id`, or of the gateway when `id` is `None`.
    pub async fn logs(&self, id: Option<&str>) -> Result<LogsReport> {
        let process = match id {
            Some(id) => {
                let listed = self.sandbox().list_processes().await?;
                match listed.into_iter().find(|p| p.id == id) {
                    Some(p) => p,
                    None => {
                        return Ok(LogsReport::NotFound { id: id.to_string() });
                    }
                }
            }
            None => match self.find().await? {
                Some(p) => p,
                None => return Ok(LogsReport::NoProcess),
            },
        };

        debug!(process_id = %process.id, "Fetching process logs");
        let logs = self.sandbox().get_logs(&process.id).await?;
        Ok(LogsReport::Found {
            process_id: process.id,
            process_status: process.status,
            logs,
        })
    }

    /// Every process the sandbox tracks, in sandbox order.
    pub async fn processes(&self) -> Result<Vec<Process>> {
        self.sandbox().list_processes().await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use clawkeeper_core::{GatewayState, ProcessLogs, ProcessStatus};
    use clawkeeper_sandbox::MockSandbox;

    use super::*;
    use crate::supervisor::GatewayLaunch;

    const GATEWAY_CMD: &str = "/usr/local/bin/start-openclaw.sh";

    fn supervisor(sandbox: &Arc<MockSandbox>) -> GatewaySupervisor {
        GatewaySupervisor::new(sandbox.clone(), GatewayLaunch::default())
    }

    #[tokio::test]
    async fn status_launches_missing_gateway() {
        let sandbox = Arc::new(MockSandbox::new());
        let status = supervisor(&sandbox).status(&GatewayEnv::new()).await.unwrap();

        assert!(status.ok);
        assert_eq!(status.status, "running");
        assert_eq!(status.process_id.as_deref(), Some("mock-1"));
        assert_eq!(status.state, GatewayState::Running);
    }

    #[tokio::test]
    async fn status_spawn_failure_is_an_error() {
        let sandbox = Arc::new(MockSandbox::new().failing_start("out of memory"));
        let err = supervisor(&sandbox)
            .status(&GatewayEnv::new())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "out of memory");
    }

    #[tokio::test]
    async fn status_recovers_after_spawn_failure() {
        let sandbox = Arc::new(MockSandbox::new().failing_start("transient"));
        let sup = supervisor(&sandbox);
        assert!(sup.status(&GatewayEnv::new()).await.is_err());
        assert_eq!(sup.state().await, GatewayState::Unknown);

        sandbox.recover_start();
        let status = sup.status(&GatewayEnv::new()).await.unwrap();
        assert!(status.ok);
        assert_eq!(status.state, GatewayState::Running);
    }

    #[tokio::test]
    async fn logs_for_unknown_id_is_not_found() {
        let sandbox = Arc::new(MockSandbox::new());
        let report = supervisor(&sandbox).logs(Some("proc-nope")).await.unwrap();
        assert_eq!(
            report,
            LogsReport::NotFound {
                id: "proc-nope".into()
            }
        );
    }

    #[tokio::test]
    async fn logs_without_gateway_is_no_process() {
        let sandbox = Arc::new(MockSandbox::new());
        let report = supervisor(&sandbox).logs(None).await.unwrap();
        assert_eq!(report, LogsReport::NoProcess);
        // Reading logs never launches a gateway.
        assert!(sandbox.started_commands().is_empty());
    }

    #[tokio::test]
    async fn logs_default_to_gateway() {
        let sandbox = Arc::new(
            MockSandbox::new()
                .with_process("cli-1", "openclaw config get gateway.port", ProcessStatus::Completed)
                .with_process("gw", GATEWAY_CMD, ProcessStatus::Running)
                .with_logs("gw", "listening on 18789\n", "warn: slow start\n"),
        );
        let report = supervisor(&sandbox).logs(None).await.unwrap();
        assert_eq!(
            report,
            LogsReport::Found {
                process_id: "gw".into(),
                process_status: ProcessStatus::Running,
                logs: ProcessLogs {
                    stdout: "listening on 18789\n".into(),
                    stderr: "warn: slow start\n".into(),
                },
            }
        );
    }

    #[tokio::test]
    async fn logs_by_id_include_terminal_processes() {
        let sandbox = Arc::new(
            MockSandbox::new()
                .with_process("cli-1", "openclaw config get gateway.port", ProcessStatus::Completed)
                .with_logs("cli-1", "18789\n", ""),
        );
        let report = supervisor(&sandbox).logs(Some("cli-1")).await.unwrap();
        match report {
            LogsReport::Found {
                process_status,
                logs,
                ..
            } => {
                assert_eq!(process_status, ProcessStatus::Completed);
                assert_eq!(logs.stdout, "18789\n");
            }
            other => panic!("unexpected report: {other:?}"),
        }
    }

    #[tokio::test]
    async fn logs_fetch_failure_propagates() {
        let sandbox = Arc::new(
            MockSandbox::new()
                .with_process("gw", GATEWAY_CMD, ProcessStatus::Running)
                .failing_logs("log stream closed"),
        );
        let err = supervisor(&sandbox).logs(None).await.unwrap_err();
        assert_eq!(err.to_string(), "log stream closed");
    }

    #[tokio::test]
    async fn processes_lists_everything_unchanged() {
        let sandbox = Arc::new(
            MockSandbox::new()
                .with_process("a", "echo a", ProcessStatus::Completed)
                .with_process("gw", GATEWAY_CMD, ProcessStatus::Running),
        );
        let processes = supervisor(&sandbox).processes().await.unwrap();
        let ids: Vec<_> = processes.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, ["a", "gw"]);
    }
}
