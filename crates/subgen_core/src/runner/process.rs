//! Process supervision and output streaming.

use std::fmt;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use super::command::CommandSpec;

/// Exit code reported when a program could not be started at all.
pub const START_FAILURE_CODE: i32 = -1;

const STDERR_CHUNK_SIZE: usize = 4096;

/// Errors from stopping a process.
#[derive(Error, Debug)]
pub enum RunnerError {
    /// The process did not exit within the kill timeout and was abandoned.
    #[error("process did not exit within {timeout_ms} ms after kill")]
    KillTimeout { timeout_ms: u128 },

    /// The supervising task panicked or was cancelled.
    #[error("process supervisor failed: {0}")]
    Supervisor(String),
}

/// Result type for runner operations.
pub type RunnerResult<T> = Result<T, RunnerError>;

/// How a process ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitKind {
    /// Exited on its own with a status code.
    Normal,
    /// Terminated by a signal (including our own kill).
    Crashed,
    /// Never started.
    FailedToStart(String),
}

/// Exit code plus the way the process ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExitInfo {
    pub code: i32,
    pub kind: ExitKind,
}

impl ExitInfo {
    pub fn normal(code: i32) -> Self {
        Self {
            code,
            kind: ExitKind::Normal,
        }
    }

    pub fn crashed() -> Self {
        Self {
            code: START_FAILURE_CODE,
            kind: ExitKind::Crashed,
        }
    }

    pub fn failed_to_start(message: impl Into<String>) -> Self {
        Self {
            code: START_FAILURE_CODE,
            kind: ExitKind::FailedToStart(message.into()),
        }
    }

    fn from_status(status: ExitStatus) -> Self {
        match status.code() {
            Some(code) => Self::normal(code),
            None => Self::crashed(),
        }
    }

    /// Normal exit with code 0.
    pub fn success(&self) -> bool {
        self.kind == ExitKind::Normal && self.code == 0
    }
}

impl fmt::Display for ExitInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ExitKind::Normal => write!(f, "exit code {}", self.code),
            ExitKind::Crashed => write!(f, "crashed"),
            ExitKind::FailedToStart(message) => write!(f, "could not start: {}", message),
        }
    }
}

/// Payload of a [`ProcessEvent`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessEventKind {
    /// One stdout line without its terminator.
    Stdout(String),
    /// Raw stderr bytes, split wherever the pipe delivered them.
    Stderr(Vec<u8>),
    Exited(ExitInfo),
}

/// Output or exit of the process started as `run_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessEvent {
    pub run_id: u64,
    pub kind: ProcessEventKind,
}

struct ActiveProcess {
    run_id: u64,
    kill: Option<oneshot::Sender<()>>,
    supervisor: JoinHandle<()>,
}

/// Owns the single process slot.
pub struct ProcessRunner {
    events: mpsc::UnboundedSender<ProcessEvent>,
    kill_timeout: Duration,
    drain_timeout: Duration,
    next_run_id: u64,
    active: Option<ActiveProcess>,
}

impl ProcessRunner {
    /// Create a runner delivering events to `events`.
    ///
    /// `kill_timeout` bounds the wait after a kill; `drain_timeout` bounds
    /// how long output readers may keep going after the process exited.
    pub fn new(
        events: mpsc::UnboundedSender<ProcessEvent>,
        kill_timeout: Duration,
        drain_timeout: Duration,
    ) -> Self {
        Self {
            events,
            kill_timeout,
            drain_timeout,
            next_run_id: 0,
            active: None,
        }
    }

    /// Start `spec`, stopping any process that is still running first.
    ///
    /// Returns the run id carried by every event of the new process.
    pub async fn run(&mut self, spec: &CommandSpec) -> u64 {
        if let Err(e) = self.kill().await {
            tracing::warn!("Previous process not stopped cleanly: {}", e);
        }

        self.next_run_id += 1;
        let run_id = self.next_run_id;

        let mut command = Command::new(&spec.program);
        command
            .args(&spec.args)
            .env("PYTHONUNBUFFERED", "1")
            .env("PYTHONUTF8", "1")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &spec.work_dir {
            command.current_dir(dir);
        }

        tracing::debug!("Starting run {}: {}", run_id, spec);

        match command.spawn() {
            Ok(child) => {
                let (kill_tx, kill_rx) = oneshot::channel();
                let supervisor = tokio::spawn(supervise(
                    run_id,
                    child,
                    kill_rx,
                    self.events.clone(),
                    self.drain_timeout,
                ));
                self.active = Some(ActiveProcess {
                    run_id,
                    kill: Some(kill_tx),
                    supervisor,
                });
            }
            Err(e) => {
                tracing::warn!("Could not start {}: {}", spec.program.to_string_lossy(), e);
                let _ = self.events.send(ProcessEvent {
                    run_id,
                    kind: ProcessEventKind::Exited(ExitInfo::failed_to_start(e.to_string())),
                });
            }
        }

        run_id
    }

    /// Whether a process (or its output drain) is still in progress.
    pub fn is_running(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|active| !active.supervisor.is_finished())
    }

    /// Run id of the most recent process, if one was started.
    pub fn current_run_id(&self) -> Option<u64> {
        self.active.as_ref().map(|active| active.run_id)
    }

    /// Kill the running process and wait (bounded) for it to finish.
    ///
    /// The killed process still delivers its `Exited` event.
    pub async fn kill(&mut self) -> RunnerResult<()> {
        let Some(mut active) = self.active.take() else {
            return Ok(());
        };

        if active.supervisor.is_finished() {
            return Ok(());
        }

        tracing::debug!("Killing run {}", active.run_id);
        if let Some(kill) = active.kill.take() {
            let _ = kill.send(());
        }

        match tokio::time::timeout(self.kill_timeout, &mut active.supervisor).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(RunnerError::Supervisor(e.to_string())),
            Err(_) => {
                // Dropping the supervisor's child sends SIGKILL.
                active.supervisor.abort();
                Err(RunnerError::KillTimeout {
                    timeout_ms: self.kill_timeout.as_millis(),
                })
            }
        }
    }

    /// Stop the active process before the owner goes away.
    pub async fn shutdown(&mut self) -> RunnerResult<()> {
        self.kill().await
    }
}

/// Wait for `child` to exit (or kill it on request), drain its pipes, then
/// report the exit.
async fn supervise(
    run_id: u64,
    mut child: Child,
    kill: oneshot::Receiver<()>,
    events: mpsc::UnboundedSender<ProcessEvent>,
    drain_timeout: Duration,
) {
    let mut readers = Vec::with_capacity(2);
    if let Some(stdout) = child.stdout.take() {
        readers.push(tokio::spawn(read_stdout(run_id, stdout, events.clone())));
    }
    if let Some(stderr) = child.stderr.take() {
        readers.push(tokio::spawn(read_stderr(run_id, stderr, events.clone())));
    }

    let exited = tokio::select! {
        status = child.wait() => Some(status),
        _ = kill => None,
    };

    let status = match exited {
        Some(status) => status,
        None => {
            if let Err(e) = child.start_kill() {
                tracing::debug!("Kill of run {} failed: {}", run_id, e);
            }
            child.wait().await
        }
    };

    let drained = tokio::time::timeout(drain_timeout, async {
        for reader in readers.iter_mut() {
            let _ = reader.await;
        }
    })
    .await;
    if drained.is_err() {
        tracing::warn!("Output of run {} still open after exit; dropping it", run_id);
        for reader in &readers {
            reader.abort();
        }
    }

    let exit = match status {
        Ok(status) => ExitInfo::from_status(status),
        Err(e) => {
            tracing::warn!("Waiting for run {} failed: {}", run_id, e);
            ExitInfo::crashed()
        }
    };

    tracing::debug!("Run {} finished: {}", run_id, exit);
    let _ = events.send(ProcessEvent {
        run_id,
        kind: ProcessEventKind::Exited(exit),
    });
}

async fn read_stdout<R>(run_id: u64, stdout: R, events: mpsc::UnboundedSender<ProcessEvent>)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(stdout);
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                let line = line.trim_end_matches(['\r', '\n']).to_string();
                let event = ProcessEvent {
                    run_id,
                    kind: ProcessEventKind::Stdout(line),
                };
                if events.send(event).is_err() {
                    break;
                }
            }
            Err(e) => {
                tracing::debug!("stdout of run {} closed: {}", run_id, e);
                break;
            }
        }
    }
}

async fn read_stderr<R>(run_id: u64, mut stderr: R, events: mpsc::UnboundedSender<ProcessEvent>)
where
    R: AsyncRead + Unpin,
{
    let mut buf = [0u8; STDERR_CHUNK_SIZE];

    loop {
        match stderr.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                let event = ProcessEvent {
                    run_id,
                    kind: ProcessEventKind::Stderr(buf[..n].to_vec()),
                };
                if events.send(event).is_err() {
                    break;
                }
            }
            Err(e) => {
                tracing::debug!("stderr of run {} closed: {}", run_id, e);
                break;
            }
        }
    }
}
