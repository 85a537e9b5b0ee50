// src/exec/process.rs

//! Process runner: start one child with both output pipes attached.
//!
//! The session talks to a [`ProcessLauncher`] rather than to
//! `tokio::process` directly, so tests can hand it scripted streams and exit
//! codes without spawning anything. [`TokioLauncher`] is the production
//! implementation.
//!
//! On unix each child leads its own process group, and killing it signals
//! the whole group so shell wrappers do not leave descendants holding the
//! output pipes.

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::process::{ExitStatus, Stdio};

use tokio::io::AsyncRead;
use tokio::process::Child;
use tracing::{debug, warn};

use crate::errors::{CheckpointError, Result};
use crate::exec::CommandSpec;
use crate::types::StreamKind;

/// A readable child output stream.
pub type OutputStream = Box<dyn AsyncRead + Send + Unpin>;

/// How a child process ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExitReport {
    pub code: Option<i32>,
    pub success: bool,
    /// Human readable status, e.g. `exit status: 1`.
    pub description: String,
}

impl ExitReport {
    pub fn from_status(status: ExitStatus) -> Self {
        Self {
            code: status.code(),
            success: status.success(),
            description: status.to_string(),
        }
    }

    pub fn succeeded() -> Self {
        Self {
            code: Some(0),
            success: true,
            description: "exit status: 0".to_string(),
        }
    }

    pub fn failed(code: i32) -> Self {
        Self {
            code: Some(code),
            success: false,
            description: format!("exit status: {code}"),
        }
    }
}

/// Handle on a live child process.
pub trait ChildHandle: Send {
    /// Wait for the process to exit.
    fn wait(&mut self) -> Pin<Box<dyn Future<Output = io::Result<ExitReport>> + Send + '_>>;

    /// Ask the OS to kill the process. Does not wait for it.
    fn start_kill(&mut self) -> io::Result<()>;
}

/// A started child with its two output streams detached from the handle.
pub struct SpawnedProcess {
    pub stdout: OutputStream,
    pub stderr: OutputStream,
    pub child: Box<dyn ChildHandle>,
}

/// Trait abstracting how a [`CommandSpec`] becomes a running process.
pub trait ProcessLauncher: Send + Sync {
    /// Start the command.
    ///
    /// Fails with [`CheckpointError::StartFailure`] when the executable cannot
    /// be launched and [`CheckpointError::PipeSetupFailure`] when either
    /// output pipe is unavailable.
    fn launch(&self, spec: &CommandSpec) -> Result<SpawnedProcess>;
}

/// Launches real OS processes through `tokio::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioLauncher;

impl ProcessLauncher for TokioLauncher {
    fn launch(&self, spec: &CommandSpec) -> Result<SpawnedProcess> {
        let mut cmd = spec.to_command();
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = cmd.spawn().map_err(|source| CheckpointError::StartFailure {
            program: spec.program.clone(),
            source,
        })?;

        debug!(program = %spec.program, pid = ?child.id(), "child process spawned");

        let stdout = match child.stdout.take() {
            Some(s) => s,
            None => return Err(abandon(child, StreamKind::Stdout)),
        };
        let stderr = match child.stderr.take() {
            Some(s) => s,
            None => return Err(abandon(child, StreamKind::Stderr)),
        };

        Ok(SpawnedProcess {
            stdout: Box::new(stdout),
            stderr: Box::new(stderr),
            child: Box::new(TokioChild {
                group: child.id(),
                child,
            }),
        })
    }
}

/// Kill a child whose pipes could not be taken and build the error for it.
fn abandon(mut child: Child, stream: StreamKind) -> CheckpointError {
    if let Err(e) = child.start_kill() {
        warn!(error = %e, %stream, "failed to kill child after pipe setup failure");
    }
    CheckpointError::PipeSetupFailure {
        stream,
        reason: format!("{stream} handle was not captured"),
    }
}

struct TokioChild {
    child: Child,
    /// Process group id (the child's pid). Only used on unix.
    #[cfg_attr(not(unix), allow(dead_code))]
    group: Option<u32>,
}

impl ChildHandle for TokioChild {
    fn wait(&mut self) -> Pin<Box<dyn Future<Output = io::Result<ExitReport>> + Send + '_>> {
        Box::pin(async move { self.child.wait().await.map(ExitReport::from_status) })
    }

    fn start_kill(&mut self) -> io::Result<()> {
        #[cfg(unix)]
        if let Some(pgid) = self.group {
            kill_group(pgid);
        }
        self.child.start_kill()
    }
}

/// SIGKILL every process in the group led by `pgid`.
#[cfg(unix)]
fn kill_group(pgid: u32) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let Ok(raw) = i32::try_from(pgid) else {
        warn!(pgid, "process group id out of range; not signalling group");
        return;
    };
    match killpg(Pid::from_raw(raw), Signal::SIGKILL) {
        Ok(()) => debug!(pgid, "killed process group"),
        Err(nix::errno::Errno::ESRCH) => debug!(pgid, "process group already gone"),
        Err(e) => warn!(pgid, error = %e, "failed to kill process group"),
    }
}
