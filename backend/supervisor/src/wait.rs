//! Bounded wait on a sandbox process.
//!
//! Polls until the process is terminal or the deadline passes. The wait never
//! touches the process itself; what happens to a process that outlives its
//! deadline is the caller's decision.

use std::time::Duration;

use anyhow::{Context, Result};
use tokio::time::{sleep, Instant};
use tracing::debug;

use clawkeeper_core::{Process, Sandbox};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The process reached a terminal state.
    Finished(Process),
    /// The deadline passed; carries the last snapshot seen.
    TimedOut(Process),
}

/// Wait up to `timeout` for process `id`, polling every `poll_interval`.
pub async fn wait_for_process(
    sandbox: &dyn Sandbox,
    id: &str,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<WaitOutcome> {
    let deadline = Instant::now() + timeout;
    loop {
        let process = sandbox
            .get_process(id)
            .await?
            .with_context(|| format!("Process {id} disappeared while waiting"))?;

        if process.status.is_terminal() {
            return Ok(WaitOutcome::Finished(process));
        }

        let now = Instant::now();
        if now >= deadline {
            debug!(process_id = %id, ?timeout, "Bounded wait elapsed");
            return Ok(WaitOutcome::TimedOut(process));
        }
        sleep(poll_interval.min(deadline - now)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clawkeeper_core::{ProcessStatus, SpawnOptions};
    use clawkeeper_sandbox::{MockSandbox, ScriptedRun};

    #[tokio::test]
    async fn returns_finished_process() {
        let sandbox = MockSandbox::new().with_script("quick", ScriptedRun::exits(0, "", ""));
        let p = sandbox
            .start_process("quick", SpawnOptions::default())
            .await
            .unwrap();
        let outcome = wait_for_process(&sandbox, &p.id, Duration::from_secs(1), Duration::from_millis(10))
            .await
            .unwrap();
        match outcome {
            WaitOutcome::Finished(p) => assert_eq!(p.status, ProcessStatus::Completed),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn times_out_on_hanging_process() {
        let sandbox = MockSandbox::new();
        let p = sandbox
            .start_process("sleep forever", SpawnOptions::default())
            .await
            .unwrap();
        let started = std::time::Instant::now();
        let outcome = wait_for_process(&sandbox, &p.id, Duration::from_millis(80), Duration::from_millis(10))
            .await
            .unwrap();
        assert!(matches!(outcome, WaitOutcome::TimedOut(ref p) if p.status == ProcessStatus::Running));
        assert!(started.elapsed() >= Duration::from_millis(80));
    }

    #[tokio::test]
    async fn missing_process_is_an_error() {
        let sandbox = MockSandbox::new();
        let err = wait_for_process(&sandbox, "ghost", Duration::from_millis(50), Duration::from_millis(10))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("ghost"));
    }
}
