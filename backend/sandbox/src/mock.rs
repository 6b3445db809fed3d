//! In-memory sandbox for tests.
//!
//! Records every call, lets tests script the outcome of commands by substring,
//! and can inject a failure into any primitive.

use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use chrono::Utc;

use clawkeeper_core::{Process, ProcessLogs, ProcessStatus, Sandbox, SpawnOptions};

/// A sandbox primitive invocation, in the order it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SandboxCall {
    List,
    Get(String),
    Start(String),
    Kill(String),
    Logs(String),
}

/// How a started command behaves.
#[derive(Debug, Clone)]
pub struct ScriptedRun {
    pub status: ProcessStatus,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ScriptedRun {
    /// Finishes immediately with `code`.
    pub fn exits(code: i32, stdout: &str, stderr: &str) -> Self {
        Self {
            status: if code == 0 {
                ProcessStatus::Completed
            } else {
                ProcessStatus::Failed
            },
            exit_code: Some(code),
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
        }
    }

    /// Never finishes on its own.
    pub fn hangs(stdout: &str) -> Self {
        Self {
            status: ProcessStatus::Running,
            exit_code: None,
            stdout: stdout.to_string(),
            stderr: String::new(),
        }
    }
}

struct MockProcess {
    process: Process,
    logs: ProcessLogs,
    env: SpawnOptions,
}

#[derive(Default)]
struct MockState {
    processes: Vec<MockProcess>,
    calls: Vec<SandboxCall>,
    scripts: Vec<(String, ScriptedRun)>,
    list_error: Option<String>,
    start_error: Option<String>,
    kill_error: Option<String>,
    logs_error: Option<String>,
    next_id: u32,
}

/// Scriptable [`Sandbox`] implementation.
#[derive(Default)]
pub struct MockSandbox {
    state: Mutex<MockState>,
    spawn_delay: Duration,
}

impl MockSandbox {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Seed an existing process.
    pub fn with_process(self, id: &str, command: &str, status: ProcessStatus) -> Self {
        self.lock().processes.push(MockProcess {
            process: Process {
                id: id.to_string(),
                command: command.to_string(),
                status,
                start_time: Some(Utc::now()),
                exit_code: if status.is_terminal() { Some(0) } else { None },
            },
            logs: ProcessLogs::default(),
            env: SpawnOptions::default(),
        });
        self
    }

    /// Set captured output for a seeded process.
    pub fn with_logs(self, id: &str, stdout: &str, stderr: &str) -> Self {
        if let Some(p) = self.lock().processes.iter_mut().find(|p| p.process.id == id) {
            p.logs = ProcessLogs {
                stdout: stdout.to_string(),
                stderr: stderr.to_string(),
            };
        }
        self
    }

    /// Commands containing `pattern` behave like `run` when started.
    pub fn with_script(self, pattern: &str, run: ScriptedRun) -> Self {
        self.lock().scripts.push((pattern.to_string(), run));
        self
    }

    pub fn with_spawn_delay(mut self, delay: Duration) -> Self {
        self.spawn_delay = delay;
        self
    }

    pub fn failing_list(self, msg: &str) -> Self {
        self.lock().list_error = Some(msg.to_string());
        self
    }

    pub fn failing_start(self, msg: &str) -> Self {
        self.lock().start_error = Some(msg.to_string());
        self
    }

    pub fn failing_kill(self, msg: &str) -> Self {
        self.lock().kill_error = Some(msg.to_string());
        self
    }

    pub fn failing_logs(self, msg: &str) -> Self {
        self.lock().logs_error = Some(msg.to_string());
        self
    }

    /// Clear a previously injected start failure.
    pub fn recover_start(&self) {
        self.lock().start_error = None;
    }

    pub fn calls(&self) -> Vec<SandboxCall> {
        self.lock().calls.clone()
    }

    pub fn started_commands(&self) -> Vec<String> {
        self.lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                SandboxCall::Start(cmd) => Some(cmd.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn killed_ids(&self) -> Vec<String> {
        self.lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                SandboxCall::Kill(id) => Some(id.clone()),
                _ => None,
            })
            .collect()
    }

    /// Environment a process was launched with.
    pub fn env_of(&self, id: &str) -> Option<SpawnOptions> {
        self.lock()
            .processes
            .iter()
            .find(|p| p.process.id == id)
            .map(|p| p.env.clone())
    }
}

#[async_trait]
impl Sandbox for MockSandbox {
    async fn list_processes(&self) -> Result<Vec<Process>> {
        let mut state = self.lock();
        state.calls.push(SandboxCall::List);
        if let Some(msg) = &state.list_error {
            bail!("{msg}");
        }
        Ok(state.processes.iter().map(|p| p.process.clone()).collect())
    }

    async fn get_process(&self, id: &str) -> Result<Option<Process>> {
        let mut state = self.lock();
        state.calls.push(SandboxCall::Get(id.to_string()));
        if let Some(msg) = &state.list_error {
            bail!("{msg}");
        }
        Ok(state
            .processes
            .iter()
            .find(|p| p.process.id == id)
            .map(|p| p.process.clone()))
    }

    async fn start_process(&self, command: &str, options: SpawnOptions) -> Result<Process> {
        self.lock().calls.push(SandboxCall::Start(command.to_string()));
        if !self.spawn_delay.is_zero() {
            tokio::time::sleep(self.spawn_delay).await;
        }

        let mut state = self.lock();
        if let Some(msg) = &state.start_error {
            bail!("{msg}");
        }

        let run = state
            .scripts
            .iter()
            .find(|(pattern, _)| command.contains(pattern.as_str()))
            .map(|(_, run)| run.clone())
            .unwrap_or_else(|| ScriptedRun::hangs(""));

        state.next_id += 1;
        let process = Process {
            id: format!("mock-{}", state.next_id),
            command: command.to_string(),
            status: run.status,
            start_time: Some(Utc::now()),
            exit_code: run.exit_code,
        };
        state.processes.push(MockProcess {
            process: process.clone(),
            logs: ProcessLogs {
                stdout: run.stdout,
                stderr: run.stderr,
            },
            env: options,
        });
        Ok(process)
    }

    async fn kill_process(&self, id: &str) -> Result<()> {
        let mut state = self.lock();
        state.calls.push(SandboxCall::Kill(id.to_string()));
        if let Some(msg) = &state.kill_error {
            bail!("{msg}");
        }
        let entry = state
            .processes
            .iter_mut()
            .find(|p| p.process.id == id)
            .ok_or_else(|| anyhow!("Process {id} not found"))?;
        if entry.process.status.is_active() {
            entry.process.status = ProcessStatus::Killed;
        }
        Ok(())
    }

    async fn get_logs(&self, id: &str) -> Result<ProcessLogs> {
        let mut state = self.lock();
        state.calls.push(SandboxCall::Logs(id.to_string()));
        if let Some(msg) = &state.logs_error {
            bail!("{msg}");
        }
        state
            .processes
            .iter()
            .find(|p| p.process.id == id)
            .map(|p| p.logs.clone())
            .ok_or_else(|| anyhow!("Process {id} not found"))
    }
}
