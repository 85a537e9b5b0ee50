// src/exec/session.rs

//! Execution session: one end-to-end run of a triggered feature.
//!
//! A session walks `Starting → Running → Draining → Completed`:
//!
//! - **Starting** emits the start banner (and any notices) and asks the
//!   launcher for a process. A launch error goes straight to `Completed`.
//! - **Running / Draining** overlap in wall-clock time: both drainers are
//!   spawned as soon as the process is up, and the session then waits on a
//!   barrier of three completions (process exit, stdout drained, stderr
//!   drained). Waiting on exit alone could lose output still sitting in the
//!   pipe buffers.
//! - **Completed** emits the completion banner, holds until the minimum
//!   visible duration has passed, then emits the single `done` notification.
//!
//! The minimum visible duration is UX pacing for whoever watches the log
//! pane. It is applied on every terminal path, launch failures included.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Local};
use tokio::sync::{oneshot, watch};
use tracing::{debug, info, warn};

use crate::errors::CheckpointError;
use crate::exec::drainer::spawn_drainer;
use crate::exec::process::{ChildHandle, ExitReport, ProcessLauncher, SpawnedProcess};
use crate::exec::CommandSpec;
use crate::sink::LogSink;
use crate::types::{SessionStatus, StreamKind};

/// Minimum time between the start banner and the `done` notification.
pub const MIN_VISIBLE_DURATION: Duration = Duration::from_millis(700);

pub const BANNER_SEPARATOR: &str = "=====================================";
pub const SUCCESS_BANNER: &str = "[OK] Process completed successfully.";
pub const CANCELLED_BANNER: &str = "[STOP] Process cancelled.";

/// How long the drainers may keep reading after a cancellation kill.
///
/// Descendants that escaped the kill can hold the pipes open; once this
/// passes the session stops reading and completes anyway.
pub const KILL_DRAIN_GRACE: Duration = Duration::from_secs(1);

/// Lifecycle position of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Starting,
    Running,
    Draining,
    Completed(SessionStatus),
}

#[derive(Debug, Clone, Copy)]
pub struct SessionOptions {
    pub min_visible: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            min_visible: MIN_VISIBLE_DURATION,
        }
    }
}

/// Summary handed back once the session has emitted `done`.
#[derive(Debug, Clone)]
pub struct SessionReport {
    pub feature: String,
    pub status: SessionStatus,
    pub elapsed: Duration,
    pub stdout_lines: usize,
    pub stderr_lines: usize,
    /// `None` when the process never started.
    pub exit: Option<ExitReport>,
    pub cancelled: bool,
}

/// Build the banner emitted when a feature starts.
pub fn start_banner(feature: &str, at: DateTime<Local>) -> String {
    format!(
        "{sep}\n[ {feature} ]\nTime : {time}\nStatus : Running...\n{sep}",
        sep = BANNER_SEPARATOR,
        time = at.format("%Y-%m-%d %H:%M:%S"),
    )
}

/// Sleep until at least `floor` has elapsed since `started`.
pub async fn hold_until_floor(started: Instant, floor: Duration) -> Duration {
    let elapsed = started.elapsed();
    if elapsed < floor {
        tokio::time::sleep(floor - elapsed).await;
    }
    started.elapsed()
}

/// One feature run, owned exclusively by the task driving it.
pub struct ExecutionSession {
    feature: String,
    spec: CommandSpec,
    notices: Vec<String>,
    sink: Arc<dyn LogSink>,
    options: SessionOptions,
    cancel_rx: Option<oneshot::Receiver<()>>,
    state: SessionState,
}

/// How the exit-wait leg of the barrier ended.
enum ExitWait {
    Exited(std::io::Result<ExitReport>),
    Cancelled(std::io::Result<ExitReport>),
}

struct Outcome {
    status: SessionStatus,
    stdout_lines: usize,
    stderr_lines: usize,
    exit: Option<ExitReport>,
    cancelled: bool,
}

impl ExecutionSession {
    pub fn new(feature: impl Into<String>, spec: CommandSpec, sink: Arc<dyn LogSink>) -> Self {
        Self {
            feature: feature.into(),
            spec,
            notices: Vec::new(),
            sink,
            options: SessionOptions::default(),
            cancel_rx: None,
            state: SessionState::Starting,
        }
    }

    /// Lines emitted right after the start banner, before any output.
    pub fn with_notices(mut self, notices: Vec<String>) -> Self {
        self.notices = notices;
        self
    }

    pub fn with_options(mut self, options: SessionOptions) -> Self {
        self.options = options;
        self
    }

    /// Attach a cancellation channel. Sending `()` kills the child; the
    /// session still drains, banners and emits `done`.
    pub fn with_cancel(mut self, cancel_rx: oneshot::Receiver<()>) -> Self {
        self.cancel_rx = Some(cancel_rx);
        self
    }

    pub fn feature(&self) -> &str {
        &self.feature
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Drive the session to completion. Emits `done` exactly once.
    pub async fn run(mut self, launcher: &dyn ProcessLauncher) -> SessionReport {
        let started = Instant::now();
        self.sink.emit(&start_banner(&self.feature, Local::now()));
        for notice in &self.notices {
            self.sink.emit(notice);
        }

        info!(feature = %self.feature, cmd = %self.spec, "starting session");

        let outcome = match launcher.launch(&self.spec) {
            Ok(process) => {
                self.transition(SessionState::Running);
                self.supervise(process).await
            }
            Err(err) => {
                warn!(feature = %self.feature, error = %err, "session could not start process");
                self.sink.emit(&err.sink_line());
                Outcome {
                    status: SessionStatus::Failed,
                    stdout_lines: 0,
                    stderr_lines: 0,
                    exit: None,
                    cancelled: false,
                }
            }
        };

        let elapsed = hold_until_floor(started, self.options.min_visible).await;
        self.transition(SessionState::Completed(outcome.status));
        self.sink.notify_done(&self.feature);

        info!(
            feature = %self.feature,
            status = ?outcome.status,
            elapsed_ms = elapsed.as_millis() as u64,
            "session done"
        );

        SessionReport {
            feature: self.feature,
            status: outcome.status,
            elapsed,
            stdout_lines: outcome.stdout_lines,
            stderr_lines: outcome.stderr_lines,
            exit: outcome.exit,
            cancelled: outcome.cancelled,
        }
    }

    async fn supervise(&mut self, process: SpawnedProcess) -> Outcome {
        let SpawnedProcess {
            stdout,
            stderr,
            mut child,
        } = process;

        let (killed_tx, killed_rx) = watch::channel(false);
        let stdout_task = spawn_drainer(
            stdout,
            StreamKind::Stdout,
            Arc::clone(&self.sink),
            grace_after_kill(killed_rx.clone()),
        );
        let stderr_task = spawn_drainer(
            stderr,
            StreamKind::Stderr,
            Arc::clone(&self.sink),
            grace_after_kill(killed_rx),
        );
        self.transition(SessionState::Draining);

        let cancel_rx = self.cancel_rx.take();
        let (exit_wait, stdout_res, stderr_res) = tokio::join!(
            wait_for_exit(child.as_mut(), cancel_rx, &killed_tx, &self.feature),
            stdout_task,
            stderr_task,
        );

        let stdout_lines = joined_count(stdout_res, StreamKind::Stdout, &self.feature);
        let stderr_lines = joined_count(stderr_res, StreamKind::Stderr, &self.feature);

        let (status, exit, cancelled) = match exit_wait {
            ExitWait::Cancelled(res) => {
                self.sink.emit(CANCELLED_BANNER);
                (SessionStatus::Failed, res.ok(), true)
            }
            ExitWait::Exited(Ok(report)) if report.success => {
                self.sink.emit(SUCCESS_BANNER);
                (SessionStatus::Succeeded, Some(report), false)
            }
            ExitWait::Exited(Ok(report)) => {
                let err = CheckpointError::ProcessExitError(report.description.clone());
                self.sink.emit(&err.sink_line());
                (SessionStatus::Failed, Some(report), false)
            }
            ExitWait::Exited(Err(e)) => {
                let err = CheckpointError::ProcessExitError(e.to_string());
                self.sink.emit(&err.sink_line());
                (SessionStatus::Failed, None, false)
            }
        };

        info!(
            feature = %self.feature,
            exit_code = ?exit.as_ref().and_then(|r| r.code),
            stdout_lines,
            stderr_lines,
            "process exited and streams drained"
        );

        Outcome {
            status,
            stdout_lines,
            stderr_lines,
            exit,
            cancelled,
        }
    }

    fn transition(&mut self, next: SessionState) {
        debug!(feature = %self.feature, from = ?self.state, to = ?next, "session state change");
        self.state = next;
    }
}

async fn wait_for_exit(
    child: &mut dyn ChildHandle,
    cancel_rx: Option<oneshot::Receiver<()>>,
    killed: &watch::Sender<bool>,
    feature: &str,
) -> ExitWait {
    let Some(mut cancel_rx) = cancel_rx else {
        return ExitWait::Exited(child.wait().await);
    };

    tokio::select! {
        res = child.wait() => ExitWait::Exited(res),

        cancel = &mut cancel_rx => match cancel {
            Ok(()) => {
                info!(feature, "cancellation requested; killing process");
                if let Err(e) = child.start_kill() {
                    warn!(feature, error = %e, "failed to kill child process on cancellation");
                }
                killed.send_replace(true);
                ExitWait::Cancelled(child.wait().await)
            }
            Err(_) => {
                debug!(feature, "cancel channel closed without explicit cancellation");
                ExitWait::Exited(child.wait().await)
            }
        },
    }
}

/// Resolves [`KILL_DRAIN_GRACE`] after the kill flag flips; never otherwise.
async fn grace_after_kill(mut killed: watch::Receiver<bool>) {
    let closed = killed.wait_for(|k| *k).await.is_err();
    if closed {
        std::future::pending::<()>().await;
    }
    tokio::time::sleep(KILL_DRAIN_GRACE).await;
}

fn joined_count(
    res: std::result::Result<usize, tokio::task::JoinError>,
    kind: StreamKind,
    feature: &str,
) -> usize {
    match res {
        Ok(n) => n,
        Err(e) => {
            warn!(feature, stream = %kind, error = %e, "drainer task failed");
            0
        }
    }
}
