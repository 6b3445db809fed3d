use anyhow::Result;
use async_trait::async_trait;

use crate::types::{Process, ProcessLogs, SpawnOptions};

/// Process primitives offered by the execution sandbox.
///
/// The supervisor only orchestrates these calls; it never owns process state.
/// Implementations must be safe to call from many concurrent tasks.
#[async_trait]
pub trait Sandbox: Send + Sync {
    /// All processes the sandbox currently tracks, in launch order.
    async fn list_processes(&self) -> Result<Vec<Process>>;

    /// Launch `command` and return its initial snapshot.
    async fn start_process(&self, command: &str, options: SpawnOptions) -> Result<Process>;

    /// Terminate a process by id.
    async fn kill_process(&self, id: &str) -> Result<()>;

    /// Captured stdout/stderr of a process so far.
    async fn get_logs(&self, id: &str) -> Result<ProcessLogs>;

    /// Fresh snapshot of one process, `None` if the sandbox no longer tracks it.
    async fn get_process(&self, id: &str) -> Result<Option<Process>> {
        Ok(self
            .list_processes()
            .await?
            .into_iter()
            .find(|p| p.id == id))
    }
}
