// src/cleanup/mod.rs

//! Full cleanup composite action.
//!
//! A cleanup run follows the same outer contract as an execution session
//! (start banner, minimum visible duration, one `done`), but the body is a
//! platform routine of filesystem operations and short blocking commands
//! instead of one streamed process.
//!
//! - [`macos`] works through the [`FileSystem`] seam.
//! - [`windows`] runs hidden PowerShell steps through a [`StepRunner`].

pub mod macos;
pub mod windows;

use std::future::Future;
use std::io;
use std::path::PathBuf;
use std::pin::Pin;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Instant;

use chrono::Local;
use tracing::{info, warn};

use crate::catalog::builtin::FULL_CLEANUP;
use crate::exec::session::{hold_until_floor, start_banner};
use crate::exec::{CommandSpec, SessionOptions, SessionReport};
use crate::fs::FileSystem;
use crate::sink::LogSink;
use crate::types::{Platform, SessionStatus};

pub const CLEANUP_DONE_BANNER: &str = "[OK] Cleanup process completed.";
pub const UNSUPPORTED_PLATFORM_LINE: &str = "[ERROR] Unsupported platform for cleanup.";

/// Result of one blocking cleanup step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOutput {
    pub success: bool,
    /// Stdout followed by stderr.
    pub combined: String,
}

/// Runs a command to completion and collects its output.
pub trait StepRunner: Send + Sync {
    fn run_step<'a>(
        &'a self,
        spec: &'a CommandSpec,
    ) -> Pin<Box<dyn Future<Output = io::Result<StepOutput>> + Send + 'a>>;
}

/// Production step runner backed by `tokio::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioStepRunner;

impl StepRunner for TokioStepRunner {
    fn run_step<'a>(
        &'a self,
        spec: &'a CommandSpec,
    ) -> Pin<Box<dyn Future<Output = io::Result<StepOutput>> + Send + 'a>> {
        Box::pin(async move {
            let mut cmd = spec.to_command();
            cmd.stdin(Stdio::null()).kill_on_drop(true);
            let output = cmd.output().await?;
            let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
            combined.push_str(&String::from_utf8_lossy(&output.stderr));
            Ok(StepOutput {
                success: output.status.success(),
                combined,
            })
        })
    }
}

/// Locations the macOS routine inspects.
#[derive(Debug, Clone)]
pub struct CleanupPaths {
    pub home: PathBuf,
    /// `$TMPDIR`, if set.
    pub temp_dir: Option<PathBuf>,
    /// Mount point directory for removable volumes.
    pub volumes: PathBuf,
}

impl CleanupPaths {
    pub fn from_env() -> Self {
        Self {
            home: dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")),
            temp_dir: std::env::var_os("TMPDIR")
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
            volumes: PathBuf::from("/Volumes"),
        }
    }
}

/// One full-cleanup run.
pub struct CleanupSession {
    platform: Platform,
    sink: Arc<dyn LogSink>,
    fs: Arc<dyn FileSystem>,
    steps: Arc<dyn StepRunner>,
    paths: CleanupPaths,
    options: SessionOptions,
}

impl CleanupSession {
    pub fn new(
        platform: Platform,
        sink: Arc<dyn LogSink>,
        fs: Arc<dyn FileSystem>,
        steps: Arc<dyn StepRunner>,
        paths: CleanupPaths,
    ) -> Self {
        Self {
            platform,
            sink,
            fs,
            steps,
            paths,
            options: SessionOptions::default(),
        }
    }

    pub fn with_options(mut self, options: SessionOptions) -> Self {
        self.options = options;
        self
    }

    /// Run the routine for this platform and emit `done` once.
    pub async fn run(self) -> SessionReport {
        let started = Instant::now();
        self.sink.emit(&start_banner(FULL_CLEANUP, Local::now()));
        info!(platform = %self.platform, "starting full cleanup");

        let status = match self.platform {
            Platform::Windows => {
                windows::run(self.steps.as_ref(), self.sink.as_ref()).await;
                SessionStatus::Succeeded
            }
            Platform::Macos => {
                // Plain blocking fs calls; keep them off the async workers.
                let fs = Arc::clone(&self.fs);
                let sink = Arc::clone(&self.sink);
                let paths = self.paths.clone();
                let routine = tokio::task::spawn_blocking(move || {
                    macos::run(fs.as_ref(), &paths, sink.as_ref());
                });
                match routine.await {
                    Ok(()) => SessionStatus::Succeeded,
                    Err(e) => {
                        warn!(error = %e, "macOS cleanup routine did not finish");
                        SessionStatus::Failed
                    }
                }
            }
            Platform::Linux => {
                self.sink.emit(UNSUPPORTED_PLATFORM_LINE);
                SessionStatus::Failed
            }
        };

        let elapsed = hold_until_floor(started, self.options.min_visible).await;
        self.sink.emit(CLEANUP_DONE_BANNER);
        self.sink.notify_done(FULL_CLEANUP);

        info!(status = ?status, elapsed_ms = elapsed.as_millis() as u64, "full cleanup done");

        SessionReport {
            feature: FULL_CLEANUP.to_string(),
            status,
            elapsed,
            stdout_lines: 0,
            stderr_lines: 0,
            exit: None,
            cancelled: false,
        }
    }
}
