// src/app.rs

//! Application facade used by the presentation layer.
//!
//! [`Checkpoint::run`] is the feature trigger: it resolves the feature,
//! answers synchronously with a short acknowledgement, and (for runnable
//! features) starts one independent session on the Tokio runtime. Output
//! and `done` arrive through the [`LogSink`] the facade was built with.
//!
//! Unknown and unsupported features never create a session and never
//! produce a `done`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tracing::{debug, info};

use crate::catalog::{Catalog, CompositeAction, FeatureDef, Resolution};
use crate::cleanup::{CleanupPaths, CleanupSession, StepRunner, TokioStepRunner};
use crate::config::ConfigFile;
use crate::errors::{CheckpointError, Result};
use crate::exec::{
    ExecutionSession, ProcessLauncher, SessionOptions, SessionReport, TokioLauncher,
};
use crate::fs::{FileSystem, RealFileSystem};
use crate::sink::LogSink;
use crate::types::Platform;

/// Acknowledgement returned when a session has been started.
pub const REQUEST_ACK: &str = "Request received...";

/// Bookkeeping for a session that has not emitted `done` yet.
struct ActiveSession {
    feature: String,
    cancel: Option<oneshot::Sender<()>>,
}

type ActiveMap = Arc<Mutex<HashMap<u64, ActiveSession>>>;

enum Job {
    Command(ExecutionSession),
    Cleanup(CleanupSession),
}

pub struct Checkpoint {
    catalog: Catalog,
    platform: Platform,
    sink: Arc<dyn LogSink>,
    launcher: Arc<dyn ProcessLauncher>,
    fs: Arc<dyn FileSystem>,
    steps: Arc<dyn StepRunner>,
    cleanup_paths: CleanupPaths,
    options: SessionOptions,
    runtime: Handle,
    active: ActiveMap,
    next_id: AtomicU64,
}

impl Checkpoint {
    pub fn builder(sink: Arc<dyn LogSink>) -> CheckpointBuilder {
        CheckpointBuilder::new(sink)
    }

    /// Trigger a feature.
    ///
    /// Returns [`REQUEST_ACK`] once a session is running in the background,
    /// or a short description when the feature is unknown or unavailable on
    /// this platform.
    pub fn run(&self, feature: &str) -> String {
        match self.prepare(feature) {
            Ok((id, job)) => {
                self.spawn(id, job);
                REQUEST_ACK.to_string()
            }
            Err(err) => err.to_string(),
        }
    }

    /// Like [`Checkpoint::run`], but drives the session on the current task
    /// and returns its report.
    pub async fn execute(&self, feature: &str) -> Result<SessionReport> {
        let (id, job) = self.prepare(feature)?;
        Ok(drive(id, job, Arc::clone(&self.launcher), Arc::clone(&self.active)).await)
    }

    /// Cancel every live session for `feature`. Returns how many were signalled.
    pub fn cancel(&self, feature: &str) -> usize {
        self.signal_cancel(|s| s.feature == feature)
    }

    pub fn cancel_all(&self) -> usize {
        self.signal_cancel(|_| true)
    }

    /// Feature ids of sessions that have not emitted `done` yet.
    pub fn active_sessions(&self) -> Vec<String> {
        lock(&self.active).values().map(|s| s.feature.clone()).collect()
    }

    pub fn features(&self) -> impl Iterator<Item = &FeatureDef> {
        self.catalog.features()
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn version(&self) -> String {
        format!("v{}", env!("CARGO_PKG_VERSION"))
    }

    /// Save log text to `path`; `None` means the user cancelled.
    pub fn export_logs(&self, content: &str, path: Option<&Path>) -> Result<Option<PathBuf>> {
        crate::export::export_logs(self.fs.as_ref(), content, path)
    }

    fn prepare(&self, feature: &str) -> Result<(u64, Job)> {
        let job = match self.catalog.resolve(feature, self.platform) {
            Resolution::Unknown => {
                debug!(feature, "unknown feature requested");
                return Err(CheckpointError::UnknownFeature(feature.to_string()));
            }
            Resolution::Unsupported => {
                debug!(feature, platform = %self.platform, "feature unsupported on platform");
                return Err(CheckpointError::Unsupported {
                    feature: feature.to_string(),
                    platform: self.platform,
                });
            }
            Resolution::Composite(CompositeAction::FullCleanup) => Job::Cleanup(
                CleanupSession::new(
                    self.platform,
                    Arc::clone(&self.sink),
                    Arc::clone(&self.fs),
                    Arc::clone(&self.steps),
                    self.cleanup_paths.clone(),
                )
                .with_options(self.options),
            ),
            Resolution::Command { spec, notices } => Job::Command(
                ExecutionSession::new(feature, spec, Arc::clone(&self.sink))
                    .with_notices(notices)
                    .with_options(self.options),
            ),
        };

        // Cleanup runs have no child process to kill, so they are not cancellable.
        let (job, cancel) = match job {
            Job::Command(session) => {
                let (cancel_tx, cancel_rx) = oneshot::channel::<()>();
                (Job::Command(session.with_cancel(cancel_rx)), Some(cancel_tx))
            }
            cleanup @ Job::Cleanup(_) => (cleanup, None),
        };

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        lock(&self.active).insert(
            id,
            ActiveSession {
                feature: feature.to_string(),
                cancel,
            },
        );

        info!(feature, session_id = id, "session accepted");
        Ok((id, job))
    }

    fn spawn(&self, id: u64, job: Job) {
        let launcher = Arc::clone(&self.launcher);
        let active = Arc::clone(&self.active);
        self.runtime.spawn(drive(id, job, launcher, active));
    }

    fn signal_cancel(&self, matches: impl Fn(&ActiveSession) -> bool) -> usize {
        let mut active = lock(&self.active);
        let mut signalled = 0;
        for session in active.values_mut().filter(|s| matches(s)) {
            if let Some(tx) = session.cancel.take() {
                if tx.send(()).is_ok() {
                    signalled += 1;
                }
            }
        }
        info!(signalled, "cancellation requested");
        signalled
    }
}

async fn drive(
    id: u64,
    job: Job,
    launcher: Arc<dyn ProcessLauncher>,
    active: ActiveMap,
) -> SessionReport {
    let report = match job {
        Job::Command(session) => session.run(launcher.as_ref()).await,
        Job::Cleanup(session) => session.run().await,
    };
    lock(&active).remove(&id);
    report
}

fn lock(active: &ActiveMap) -> MutexGuard<'_, HashMap<u64, ActiveSession>> {
    active.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Builder for [`Checkpoint`]; every collaborator has a production default.
pub struct CheckpointBuilder {
    sink: Arc<dyn LogSink>,
    catalog: Option<Catalog>,
    platform: Platform,
    launcher: Arc<dyn ProcessLauncher>,
    fs: Arc<dyn FileSystem>,
    steps: Arc<dyn StepRunner>,
    cleanup_paths: Option<CleanupPaths>,
    options: SessionOptions,
    runtime: Option<Handle>,
}

impl CheckpointBuilder {
    pub fn new(sink: Arc<dyn LogSink>) -> Self {
        Self {
            sink,
            catalog: None,
            platform: Platform::current(),
            launcher: Arc::new(TokioLauncher),
            fs: Arc::new(RealFileSystem),
            steps: Arc::new(TokioStepRunner),
            cleanup_paths: None,
            options: SessionOptions::default(),
            runtime: None,
        }
    }

    /// Take catalog and session options from a loaded config.
    pub fn config(mut self, config: &ConfigFile) -> Self {
        self.catalog = Some(config.build_catalog());
        self.options = config.session_options();
        self
    }

    pub fn catalog(mut self, catalog: Catalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    pub fn launcher(mut self, launcher: Arc<dyn ProcessLauncher>) -> Self {
        self.launcher = launcher;
        self
    }

    pub fn file_system(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = fs;
        self
    }

    pub fn step_runner(mut self, steps: Arc<dyn StepRunner>) -> Self {
        self.steps = steps;
        self
    }

    pub fn cleanup_paths(mut self, paths: CleanupPaths) -> Self {
        self.cleanup_paths = Some(paths);
        self
    }

    pub fn session_options(mut self, options: SessionOptions) -> Self {
        self.options = options;
        self
    }

    pub fn runtime(mut self, handle: Handle) -> Self {
        self.runtime = Some(handle);
        self
    }

    /// Fails with [`CheckpointError::RuntimeUnavailable`] when no runtime
    /// handle was given and none is current.
    pub fn build(self) -> Result<Checkpoint> {
        let runtime = match self.runtime {
            Some(handle) => handle,
            None => Handle::try_current().map_err(|_| CheckpointError::RuntimeUnavailable)?,
        };

        Ok(Checkpoint {
            catalog: self.catalog.unwrap_or_else(Catalog::builtin),
            platform: self.platform,
            sink: self.sink,
            launcher: self.launcher,
            fs: self.fs,
            steps: self.steps,
            cleanup_paths: self.cleanup_paths.unwrap_or_else(CleanupPaths::from_env),
            options: self.options,
            runtime,
            active: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(1),
        })
    }
}
