//! Gateway lifecycle: idempotent ensure and the restart protocol.
//!
//! Single-instance discipline is best-effort. Discovery and spawn are not
//! atomic, so two concurrent `ensure` calls that both see no gateway will
//! both launch one, and a `restart` racing an `ensure` can kill a freshly
//! started gateway. Nothing here holds a lease on the process table.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use clawkeeper_core::{GatewayEnv, GatewayState, Process, RestartAck, Sandbox};
use clawkeeper_logging::{redact_sensitive_data, GatewayEvent, GatewayEventLogger};

use crate::discovery::{find_gateway_process, GatewaySignature};

const KILLED_MESSAGE: &str = "Gateway process killed, new instance starting...";
const NO_PROCESS_MESSAGE: &str = "No existing process found, starting new instance...";

/// How the gateway is launched and recognised.
#[derive(Debug, Clone)]
pub struct GatewayLaunch {
    pub command: String,
    pub signature: GatewaySignature,
    /// Pause after killing the old gateway so it can release its port.
    pub grace_period: Duration,
}

impl Default for GatewayLaunch {
    fn default() -> Self {
        Self {
            command: "/usr/local/bin/start-openclaw.sh".to_string(),
            signature: GatewaySignature::default(),
            grace_period: Duration::from_millis(2000),
        }
    }
}

/// Supervises the singleton gateway process inside a sandbox.
///
/// Cheap to clone; clones share the sandbox and the observed state.
#[derive(Clone)]
pub struct GatewaySupervisor {
    sandbox: Arc<dyn Sandbox>,
    launch: Arc<GatewayLaunch>,
    state: Arc<RwLock<GatewayState>>,
}

impl GatewaySupervisor {
    pub fn new(sandbox: Arc<dyn Sandbox>, launch: GatewayLaunch) -> Self {
        Self {
            sandbox,
            launch: Arc::new(launch),
            state: Arc::new(RwLock::new(GatewayState::Unknown)),
        }
    }

    pub fn sandbox(&self) -> &Arc<dyn Sandbox> {
        &self.sandbox
    }

    pub fn launch(&self) -> &GatewayLaunch {
        &self.launch
    }

    /// Last observed logical state.
    pub async fn state(&self) -> GatewayState {
        *self.state.read().await
    }

    async fn set_state(&self, next: GatewayState) {
        let mut state = self.state.write().await;
        let prev = *state;
        if prev != next {
            debug!(from = %prev, to = %next, "Gateway state transition");
            *state = next;
        }
    }

    /// Discovery, recording what was observed.
    pub async fn find(&self) -> Result<Option<Process>> {
        match find_gateway_process(self.sandbox.as_ref(), &self.launch.signature).await {
            Ok(Some(process)) => {
                self.set_state(GatewayState::Running).await;
                Ok(Some(process))
            }
            Ok(None) => {
                // A restart in flight stays Restarting until its relaunch lands.
                let mut state = self.state.write().await;
                if *state != GatewayState::Restarting {
                    *state = GatewayState::Absent;
                }
                Ok(None)
            }
            Err(e) => {
                self.set_state(GatewayState::Unknown).await;
                Err(e)
            }
        }
    }

    /// Make sure a gateway is running, launching one if discovery finds none.
    pub async fn ensure(&self, env: &GatewayEnv) -> Result<Process> {
        if let Some(existing) = self.find().await? {
            debug!(process_id = %existing.id, "Gateway already running");
            return Ok(existing);
        }

        info!(
            command = %redact_sensitive_data(&self.launch.command),
            env_vars = env.len(),
            "Starting gateway"
        );
        match self
            .sandbox
            .start_process(&self.launch.command, env.to_spawn_options())
            .await
        {
            Ok(process) => {
                self.set_state(GatewayState::Running).await;
                GatewayEventLogger::log(GatewayEvent::Spawned {
                    process_id: process.id.clone(),
                    command: process.command.clone(),
                });
                Ok(process)
            }
            Err(e) => {
                self.set_state(GatewayState::Unknown).await;
                Err(e)
            }
        }
    }

    /// Kill the current gateway (if any), wait out the grace period, and
    /// relaunch in the background.
    ///
    /// The acknowledgement only says the restart was initiated. Kill failures
    /// and relaunch failures are logged, never returned; the only error that
    /// reaches the caller is a failed discovery.
    pub async fn restart(&self, env: &GatewayEnv) -> Result<RestartAck> {
        let existing = self.find().await?;

        if let Some(process) = &existing {
            self.set_state(GatewayState::Restarting).await;
            match self.sandbox.kill_process(&process.id).await {
                Ok(()) => {
                    GatewayEventLogger::log(GatewayEvent::Killed {
                        process_id: process.id.clone(),
                    });
                }
                Err(e) => {
                    // Teardown is best-effort; if the old gateway survives,
                    // the relaunch's discovery will simply find it again.
                    warn!(process_id = %process.id, error = %e, "Error killing gateway process");
                    GatewayEventLogger::log(GatewayEvent::KillFailed {
                        process_id: process.id.clone(),
                        error: e.to_string(),
                    });
                }
            }
            tokio::time::sleep(self.launch.grace_period).await;
        }

        let previous_process_id = existing.map(|p| p.id);
        GatewayEventLogger::log(GatewayEvent::RestartInitiated {
            previous_process_id: previous_process_id.clone(),
        });
        self.spawn_relaunch(env.clone());

        Ok(RestartAck {
            success: true,
            message: if previous_process_id.is_some() {
                KILLED_MESSAGE
            } else {
                NO_PROCESS_MESSAGE
            }
            .to_string(),
            previous_process_id,
        })
    }

    /// Detached `ensure`, owned by the runtime rather than the caller.
    fn spawn_relaunch(&self, env: GatewayEnv) -> JoinHandle<()> {
        let supervisor = self.clone();
        tokio::spawn(async move {
            match supervisor.ensure(&env).await {
                Ok(process) => info!(process_id = %process.id, "Gateway relaunched"),
                Err(e) => {
                    error!(error = %e, "Gateway restart failed");
                    GatewayEventLogger::log(GatewayEvent::RelaunchFailed {
                        error: e.to_string(),
                    });
                }
            }
        })
    }
}
