//! Gateway Event Logger
//!
//! Lifecycle events of the supervised gateway, emitted as JSON on the
//! `gateway_events` tracing target so they land in the NDJSON log file.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::redact::redact_sensitive_data;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GatewayEvent {
    Spawned {
        process_id: String,
        command: String,
    },
    Killed {
        process_id: String,
    },
    KillFailed {
        process_id: String,
        error: String,
    },
    RestartInitiated {
        previous_process_id: Option<String>,
    },
    RelaunchFailed {
        error: String,
    },
    CommandFinished {
        process_id: String,
        command: String,
        exit_code: Option<i32>,
    },
    /// The bounded wait elapsed; `killed` records whether a kill was issued.
    CommandTimedOut {
        process_id: String,
        command: String,
        killed: bool,
    },
}

impl GatewayEvent {
    fn is_failure(&self) -> bool {
        match self {
            Self::KillFailed { .. } | Self::RelaunchFailed { .. } | Self::CommandTimedOut { .. } => {
                true
            }
            Self::CommandFinished { exit_code, .. } => *exit_code != Some(0),
            _ => false,
        }
    }

    fn redacted(mut self) -> Self {
        match &mut self {
            Self::Spawned { command, .. }
            | Self::CommandFinished { command, .. }
            | Self::CommandTimedOut { command, .. } => {
                *command = redact_sensitive_data(command);
            }
            Self::KillFailed { error, .. } | Self::RelaunchFailed { error } => {
                *error = redact_sensitive_data(error);
            }
            Self::Killed { .. } | Self::RestartInitiated { .. } => {}
        }
        self
    }
}

#[derive(Debug, Serialize)]
pub struct GatewayEventEntry {
    pub timestamp: DateTime<Utc>,
    pub event: GatewayEvent,
}

pub struct GatewayEventLogger;

impl GatewayEventLogger {
    /// Redacts the event and emits it; failures are logged at `warn`.
    pub fn log(event: GatewayEvent) -> GatewayEventEntry {
        let failure = event.is_failure();
        let entry = GatewayEventEntry {
            timestamp: Utc::now(),
            event: event.redacted(),
        };

        let json = serde_json::to_string(&entry).unwrap_or_default();
        if failure {
            warn!(target: "gateway_events", event = %json, "Gateway event");
        } else {
            info!(target: "gateway_events", event = %json, "Gateway event");
        }
        entry
    }
}
