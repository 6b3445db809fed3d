//! Gateway process discovery.

use anyhow::Result;
use tracing::debug;

use clawkeeper_core::{Process, Sandbox};

/// Command fragments that identify the gateway among all sandbox processes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewaySignature {
    fragments: Vec<String>,
}

impl GatewaySignature {
    pub fn new<I, S>(fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fragments: fragments.into_iter().map(Into::into).collect(),
        }
    }

    pub fn matches(&self, command: &str) -> bool {
        self.fragments.iter().any(|f| command.contains(f.as_str()))
    }
}

impl Default for GatewaySignature {
    fn default() -> Self {
        Self::new(["start-openclaw.sh", "openclaw gateway"])
    }
}

/// First active process whose command carries the gateway signature.
///
/// Sandbox errors propagate; they are never reported as "no gateway".
pub async fn find_gateway_process(
    sandbox: &dyn Sandbox,
    signature: &GatewaySignature,
) -> Result<Option<Process>> {
    let processes = sandbox.list_processes().await?;
    let found = processes
        .into_iter()
        .find(|p| p.status.is_active() && signature.matches(&p.command));
    debug!(process_id = ?found.as_ref().map(|p| &p.id), "Gateway discovery");
    Ok(found)
}
