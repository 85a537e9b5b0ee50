use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use checkpoint::errors::Result;
use checkpoint::exec::{
    ChildHandle, CommandSpec, ExitReport, OutputStream, ProcessLauncher, SpawnedProcess,
};
use checkpoint::types::StreamKind;
use checkpoint::CheckpointError;
use tokio::io::AsyncWriteExt;
use tokio::sync::Notify;

/// Which launch step the fake should fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FakeFailure {
    Start,
    StdoutPipe,
    StderrPipe,
}

/// Scripted behaviour for one fake process.
#[derive(Debug, Clone)]
pub struct FakeScript {
    stdout: Vec<(Duration, Vec<u8>)>,
    stderr: Vec<(Duration, Vec<u8>)>,
    exit: ExitReport,
    exit_after: Duration,
    wait_error: Option<String>,
    hang_until_killed: bool,
    streams_outlive_kill: bool,
    failure: Option<FakeFailure>,
}

impl Default for FakeScript {
    fn default() -> Self {
        Self {
            stdout: Vec::new(),
            stderr: Vec::new(),
            exit: ExitReport::succeeded(),
            exit_after: Duration::ZERO,
            wait_error: None,
            hang_until_killed: false,
            streams_outlive_kill: false,
            failure: None,
        }
    }
}

impl FakeScript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines written to stdout immediately, each terminated by `\n`.
    pub fn stdout_lines<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for line in lines {
            self.stdout
                .push((Duration::ZERO, format!("{}\n", line.as_ref()).into_bytes()));
        }
        self
    }

    pub fn stderr_lines<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for line in lines {
            self.stderr
                .push((Duration::ZERO, format!("{}\n", line.as_ref()).into_bytes()));
        }
        self
    }

    /// Raw bytes written to stdout after `delay` (relative to the previous chunk).
    pub fn stdout_chunk_after(mut self, delay: Duration, bytes: impl Into<Vec<u8>>) -> Self {
        self.stdout.push((delay, bytes.into()));
        self
    }

    pub fn stderr_chunk_after(mut self, delay: Duration, bytes: impl Into<Vec<u8>>) -> Self {
        self.stderr.push((delay, bytes.into()));
        self
    }

    pub fn exit_code(mut self, code: i32) -> Self {
        self.exit = if code == 0 {
            ExitReport::succeeded()
        } else {
            ExitReport::failed(code)
        };
        self
    }

    pub fn exit_after(mut self, delay: Duration) -> Self {
        self.exit_after = delay;
        self
    }

    /// Make `wait()` fail with an IO error.
    pub fn wait_error(mut self, msg: &str) -> Self {
        self.wait_error = Some(msg.to_string());
        self
    }

    /// Keep the process and both streams open until it is killed.
    pub fn hang_until_killed(mut self) -> Self {
        self.hang_until_killed = true;
        self
    }

    /// Like [`FakeScript::hang_until_killed`], but the streams never reach
    /// end-of-input, as if a descendant survived the kill.
    pub fn streams_outlive_kill(mut self) -> Self {
        self.hang_until_killed = true;
        self.streams_outlive_kill = true;
        self
    }

    pub fn fail(mut self, failure: FakeFailure) -> Self {
        self.failure = Some(failure);
        self
    }
}

/// A launcher that never spawns OS processes.
///
/// Every launch plays back the same [`FakeScript`] and records the spec.
#[derive(Clone)]
pub struct FakeLauncher {
    script: FakeScript,
    started: Arc<AtomicUsize>,
    specs: Arc<Mutex<Vec<CommandSpec>>>,
}

impl FakeLauncher {
    pub fn new(script: FakeScript) -> Self {
        Self {
            script,
            started: Arc::new(AtomicUsize::new(0)),
            specs: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Number of launches that produced a "running" process.
    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    /// Every spec passed to `launch`, including failed ones.
    pub fn specs(&self) -> Vec<CommandSpec> {
        self.specs.lock().unwrap().clone()
    }
}

impl ProcessLauncher for FakeLauncher {
    fn launch(&self, spec: &CommandSpec) -> Result<SpawnedProcess> {
        self.specs.lock().unwrap().push(spec.clone());

        match self.script.failure {
            Some(FakeFailure::Start) => {
                return Err(CheckpointError::StartFailure {
                    program: spec.program.clone(),
                    source: io::Error::new(io::ErrorKind::NotFound, "program not found"),
                });
            }
            Some(FakeFailure::StdoutPipe) => {
                return Err(CheckpointError::PipeSetupFailure {
                    stream: StreamKind::Stdout,
                    reason: "pipe unavailable".to_string(),
                });
            }
            Some(FakeFailure::StderrPipe) => {
                return Err(CheckpointError::PipeSetupFailure {
                    stream: StreamKind::Stderr,
                    reason: "pipe unavailable".to_string(),
                });
            }
            None => {}
        }

        self.started.fetch_add(1, Ordering::SeqCst);

        let kill = Arc::new(KillSwitch::default());
        let hold = if self.script.streams_outlive_kill {
            Hold::Forever
        } else if self.script.hang_until_killed {
            Hold::UntilKilled
        } else {
            Hold::Close
        };
        let stdout = scripted_stream(self.script.stdout.clone(), hold, Arc::clone(&kill));
        let stderr = scripted_stream(self.script.stderr.clone(), hold, Arc::clone(&kill));

        Ok(SpawnedProcess {
            stdout,
            stderr,
            child: Box::new(FakeChild {
                script: self.script.clone(),
                kill,
            }),
        })
    }
}

#[derive(Default)]
struct KillSwitch {
    tripped: AtomicBool,
    notify: Notify,
}

impl KillSwitch {
    fn trip(&self) {
        self.tripped.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    fn is_tripped(&self) -> bool {
        self.tripped.load(Ordering::SeqCst)
    }

    async fn wait(&self) {
        loop {
            let notified = self.notify.notified();
            if self.is_tripped() {
                return;
            }
            notified.await;
        }
    }
}

/// When the writer side of a scripted stream is dropped.
#[derive(Clone, Copy)]
enum Hold {
    Close,
    UntilKilled,
    Forever,
}

/// Stream fed by a background writer task following the chunk schedule.
fn scripted_stream(
    chunks: Vec<(Duration, Vec<u8>)>,
    hold: Hold,
    kill: Arc<KillSwitch>,
) -> OutputStream {
    let (mut writer, reader) = tokio::io::duplex(64 * 1024);
    tokio::spawn(async move {
        for (delay, bytes) in chunks {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            if writer.write_all(&bytes).await.is_err() {
                return;
            }
        }
        match hold {
            Hold::Close => {}
            Hold::UntilKilled => kill.wait().await,
            Hold::Forever => std::future::pending::<()>().await,
        }
        // Dropping the writer is end-of-input for the reader.
    });
    Box::new(reader)
}

struct FakeChild {
    script: FakeScript,
    kill: Arc<KillSwitch>,
}

impl ChildHandle for FakeChild {
    fn wait(&mut self) -> Pin<Box<dyn Future<Output = io::Result<ExitReport>> + Send + '_>> {
        Box::pin(async move {
            if self.script.hang_until_killed {
                self.kill.wait().await;
            } else if !self.script.exit_after.is_zero() {
                tokio::time::sleep(self.script.exit_after).await;
            }

            if self.kill.is_tripped() {
                return Ok(ExitReport {
                    code: None,
                    success: false,
                    description: "signal: 9 (SIGKILL)".to_string(),
                });
            }
            match &self.script.wait_error {
                Some(msg) => Err(io::Error::other(msg.clone())),
                None => Ok(self.script.exit.clone()),
            }
        })
    }

    fn start_kill(&mut self) -> io::Result<()> {
        self.kill.trip();
        Ok(())
    }
}
