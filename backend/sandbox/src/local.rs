//! Local sandbox: runs processes as tokio children of the supervisor itself.
//!
//! Each launch gets a watcher task that owns the `Child`, records the exit
//! status, and honours kill requests. On unix every launch leads its own
//! process group so a kill reaches the shell's descendants too.
//!
//! stdout/stderr are drained into bounded in-memory buffers. Finished
//! processes are retained up to a limit; running ones are never dropped.

use std::collections::VecDeque;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::sync::{Mutex, RwLock, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use clawkeeper_core::{Process, ProcessLogs, ProcessStatus, Sandbox, SpawnOptions};

/// How long `kill_process` waits for the child to actually exit.
const KILL_SETTLE_TIMEOUT: Duration = Duration::from_secs(5);
/// How long the watcher waits for output pumps after the child exits.
const DRAIN_TIMEOUT: Duration = Duration::from_millis(500);
/// Finished processes kept for listing and logs.
pub const DEFAULT_FINISHED_LIMIT: usize = 64;
/// Per-stream output cap; older bytes are discarded first.
const MAX_OUTPUT_BYTES: usize = 1024 * 1024;

type OutputBuffer = Arc<Mutex<VecDeque<u8>>>;

struct TrackedProcess {
    snapshot: watch::Sender<Process>,
    stdout: OutputBuffer,
    stderr: OutputBuffer,
    kill_tx: Mutex<Option<oneshot::Sender<()>>>,
}

impl TrackedProcess {
    fn is_terminal(&self) -> bool {
        self.snapshot.borrow().status.is_terminal()
    }
}

/// Sandbox backed by child processes of the current host.
pub struct LocalSandbox {
    shell: String,
    finished_limit: usize,
    processes: RwLock<Vec<Arc<TrackedProcess>>>,
}

impl LocalSandbox {
    /// `shell` is invoked as `<shell> -c <command>`.
    pub fn new(shell: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
            finished_limit: DEFAULT_FINISHED_LIMIT,
            processes: RwLock::new(Vec::new()),
        }
    }

    /// Cap on retained finished processes (oldest are forgotten first).
    pub fn with_finished_limit(mut self, limit: usize) -> Self {
        self.finished_limit = limit;
        self
    }

    async fn find(&self, id: &str) -> Option<Arc<TrackedProcess>> {
        self.processes
            .read()
            .await
            .iter()
            .find(|p| p.snapshot.borrow().id == id)
            .cloned()
    }
}

impl Default for LocalSandbox {
    fn default() -> Self {
        Self::new("sh")
    }
}

#[async_trait]
impl Sandbox for LocalSandbox {
    async fn list_processes(&self) -> Result<Vec<Process>> {
        Ok(self
            .processes
            .read()
            .await
            .iter()
            .map(|p| p.snapshot.borrow().clone())
            .collect())
    }

    async fn start_process(&self, command: &str, options: SpawnOptions) -> Result<Process> {
        let mut cmd = Command::new(&self.shell);
        cmd.arg("-c")
            .arg(command)
            .envs(&options.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = cmd
            .spawn()
            .with_context(|| format!("Failed to spawn process via {}", self.shell))?;
        let pid = child.id();

        let process = Process {
            id: format!("proc-{}", Uuid::new_v4().simple()),
            command: command.to_string(),
            status: ProcessStatus::Running,
            start_time: Some(Utc::now()),
            exit_code: None,
        };

        let (snapshot, _) = watch::channel(process.clone());
        let (kill_tx, kill_rx) = oneshot::channel();
        let tracked = Arc::new(TrackedProcess {
            snapshot,
            stdout: OutputBuffer::default(),
            stderr: OutputBuffer::default(),
            kill_tx: Mutex::new(Some(kill_tx)),
        });

        let mut pumps = Vec::with_capacity(2);
        if let Some(out) = child.stdout.take() {
            pumps.push(tokio::spawn(pump(out, Arc::clone(&tracked.stdout))));
        }
        if let Some(err) = child.stderr.take() {
            pumps.push(tokio::spawn(pump(err, Arc::clone(&tracked.stderr))));
        }

        {
            let mut processes = self.processes.write().await;
            processes.push(Arc::clone(&tracked));
            prune_finished(&mut processes, self.finished_limit);
        }
        tokio::spawn(watch_child(child, pid, kill_rx, pumps, tracked));

        info!(process_id = %process.id, pid = ?pid, "Local process started");
        Ok(process)
    }

    async fn kill_process(&self, id: &str) -> Result<()> {
        let tracked = self
            .find(id)
            .await
            .with_context(|| format!("Process {id} not found"))?;

        if tracked.is_terminal() {
            debug!(process_id = %id, "Kill requested for finished process; ignoring");
            return Ok(());
        }

        if let Some(tx) = tracked.kill_tx.lock().await.take() {
            // The watcher only drops its receiver after the child has exited.
            let _ = tx.send(());
        }

        let mut rx = tracked.snapshot.subscribe();
        tokio::time::timeout(KILL_SETTLE_TIMEOUT, rx.wait_for(|p| p.status.is_terminal()))
            .await
            .with_context(|| format!("Process {id} did not exit after kill"))?
            .with_context(|| format!("Process {id} watcher went away"))?;
        Ok(())
    }

    async fn get_logs(&self, id: &str) -> Result<ProcessLogs> {
        let tracked = self
            .find(id)
            .await
            .with_context(|| format!("Process {id} not found"))?;
        let stdout = String::from_utf8_lossy(tracked.stdout.lock().await.make_contiguous())
            .into_owned();
        let stderr = String::from_utf8_lossy(tracked.stderr.lock().await.make_contiguous())
            .into_owned();
        Ok(ProcessLogs { stdout, stderr })
    }
}

/// Drop the oldest finished entries beyond `limit`. Active entries stay.
fn prune_finished(processes: &mut Vec<Arc<TrackedProcess>>, limit: usize) {
    let finished = processes.iter().filter(|p| p.is_terminal()).count();
    let mut excess = finished.saturating_sub(limit);
    if excess == 0 {
        return;
    }
    processes.retain(|p| {
        if excess > 0 && p.is_terminal() {
            excess -= 1;
            false
        } else {
            true
        }
    });
}

fn append_capped(sink: &mut VecDeque<u8>, chunk: &[u8], cap: usize) {
    sink.extend(chunk);
    if sink.len() > cap {
        let excess = sink.len() - cap;
        sink.drain(..excess);
    }
}

async fn pump<R>(mut reader: R, sink: OutputBuffer)
where
    R: AsyncRead + Unpin,
{
    let mut buf = [0u8; 4096];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => append_capped(&mut *sink.lock().await, &buf[..n], MAX_OUTPUT_BYTES),
            Err(e) => {
                warn!(error = %e, "Output pipe read failed");
                break;
            }
        }
    }
}

enum ChildExit {
    Exited(std::io::Result<ExitStatus>),
    KillRequested,
}

/// SIGKILL the whole group led by `pgid`. An already empty group is fine.
#[cfg(unix)]
fn kill_group(pgid: u32) -> Result<()> {
    use nix::errno::Errno;
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    let raw = i32::try_from(pgid).context("Process group id out of range")?;
    match killpg(Pid::from_raw(raw), Signal::SIGKILL) {
        Ok(()) | Err(Errno::ESRCH) => Ok(()),
        Err(e) => Err(e).with_context(|| format!("Failed to signal process group {pgid}")),
    }
}

fn kill_child(child: &mut Child, pid: Option<u32>) {
    #[cfg(unix)]
    if let Some(pgid) = pid {
        match kill_group(pgid) {
            Ok(()) => return,
            Err(e) => warn!(error = %e, "Group kill failed; signalling the shell only"),
        }
    }
    #[cfg(not(unix))]
    let _ = pid;

    if let Err(e) = child.start_kill() {
        warn!(error = %e, "Failed to signal child");
    }
}

async fn watch_child(
    mut child: Child,
    pid: Option<u32>,
    kill_rx: oneshot::Receiver<()>,
    pumps: Vec<JoinHandle<()>>,
    tracked: Arc<TrackedProcess>,
) {
    let exit = tokio::select! {
        res = child.wait() => ChildExit::Exited(res),
        Ok(()) = kill_rx => ChildExit::KillRequested,
    };

    let (status, exit_code) = match exit {
        ChildExit::Exited(Ok(st)) if st.success() => (ProcessStatus::Completed, st.code()),
        ChildExit::Exited(Ok(st)) => (ProcessStatus::Failed, st.code()),
        ChildExit::Exited(Err(e)) => {
            warn!(error = %e, "Waiting on child failed");
            (ProcessStatus::Error, None)
        }
        ChildExit::KillRequested => {
            kill_child(&mut child, pid);
            let code = child.wait().await.ok().and_then(|st| st.code());
            (ProcessStatus::Killed, code)
        }
    };

    for handle in pumps {
        if tokio::time::timeout(DRAIN_TIMEOUT, handle).await.is_err() {
            debug!("Output pump still open after exit; a descendant may hold the pipe");
        }
    }

    tracked.snapshot.send_modify(|p| {
        p.status = status;
        p.exit_code = exit_code;
    });
    debug!(status = %status, exit_code = ?exit_code, "Local process finished");
}
