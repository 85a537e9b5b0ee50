use std::error::Error;
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use checkpoint::catalog::builtin::FULL_CLEANUP;
use checkpoint::cleanup::{
    CleanupPaths, CleanupSession, StepOutput, StepRunner, TokioStepRunner, CLEANUP_DONE_BANNER,
};
use checkpoint::exec::CommandSpec;
use checkpoint::fs::mock::MockFileSystem;
use checkpoint::fs::FileSystem;
use checkpoint::types::{Platform, SessionStatus};

mod common;
use crate::common::{quick, RecordingSink};

type TestResult = Result<(), Box<dyn Error>>;

/// Step runner that succeeds for the first `ok` steps and fails after that.
#[derive(Default)]
struct ScriptedSteps {
    ok: usize,
    output: String,
    seen: Mutex<Vec<CommandSpec>>,
}

impl StepRunner for ScriptedSteps {
    fn run_step<'a>(
        &'a self,
        spec: &'a CommandSpec,
    ) -> Pin<Box<dyn Future<Output = io::Result<StepOutput>> + Send + 'a>> {
        Box::pin(async move {
            let mut seen = self.seen.lock().unwrap();
            let index = seen.len();
            seen.push(spec.clone());
            Ok(StepOutput {
                success: index < self.ok,
                combined: self.output.clone(),
            })
        })
    }
}

/// Mock filesystem whose `remove_dir_all` blocks the calling thread.
#[derive(Debug)]
struct SlowRemoval {
    inner: MockFileSystem,
    delay: Duration,
}

impl FileSystem for SlowRemoval {
    fn write(&self, path: &Path, contents: &[u8]) -> anyhow::Result<()> {
        self.inner.write(path, contents)
    }

    fn exists(&self, path: &Path) -> bool {
        self.inner.exists(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.inner.is_dir(path)
    }

    fn create_dir(&self, path: &Path) -> anyhow::Result<()> {
        self.inner.create_dir(path)
    }

    fn remove_dir_all(&self, path: &Path) -> anyhow::Result<()> {
        std::thread::sleep(self.delay);
        self.inner.remove_dir_all(path)
    }

    fn read_dir(&self, path: &Path) -> anyhow::Result<Vec<PathBuf>> {
        self.inner.read_dir(path)
    }
}

fn paths() -> CleanupPaths {
    CleanupPaths {
        home: PathBuf::from("/Users/ana"),
        temp_dir: Some(PathBuf::from("/var/folders/xy/T")),
        volumes: PathBuf::from("/Volumes"),
    }
}

fn session(
    platform: Platform,
    sink: &Arc<RecordingSink>,
    fs: &Arc<MockFileSystem>,
    steps: Arc<dyn StepRunner>,
) -> CleanupSession {
    CleanupSession::new(platform, sink.clone(), fs.clone(), steps, paths()).with_options(quick())
}

#[tokio::test]
async fn macos_cleanup_reports_folders_trash_caches_and_volumes() -> TestResult {
    let sink = Arc::new(RecordingSink::new());
    let fs = Arc::new(MockFileSystem::new());
    fs.add_file("/Users/ana/Desktop/a.txt", "a");
    fs.add_file("/Users/ana/Desktop/b.txt", "b");
    fs.add_dir("/Users/ana/Documents");
    fs.add_file("/Users/ana/.Trash/old.zip", "zip");
    fs.add_dir("/Users/ana/Library/Caches/com.apple.Safari");
    fs.add_dir("/Volumes/Macintosh HD");
    fs.add_dir("/Volumes/USB STICK");

    let report = session(Platform::Macos, &sink, &fs, Arc::new(TokioStepRunner))
        .run()
        .await;

    assert_eq!(report.status, SessionStatus::Succeeded);
    let lines = sink.lines();
    let has = |needle: &str| lines.iter().any(|l| l == needle);

    assert!(has("  - Desktop: Contains 2 files (Manual review recommended)"));
    assert!(has("  - Documents: Contains 0 files (Manual review recommended)"));
    assert!(has("  - Downloads: Not accessible"));
    assert!(has("  [OK] Trash emptied."));
    assert!(has("  - Cleaning: /var/folders/xy/T"));
    assert!(has("  - Found cache: com.apple.Safari"));
    assert!(has("  [DETECTED] External Drive: USB STICK - Please verify contents."));
    assert!(!lines.iter().any(|l| l.contains("Macintosh HD")));
    assert_eq!(lines.last().map(String::as_str), Some(CLEANUP_DONE_BANNER));
    assert_eq!(sink.done_count(FULL_CLEANUP), 1);

    // Trash is recreated empty.
    let trash = Path::new("/Users/ana/.Trash");
    assert!(fs.is_dir(trash));
    assert!(!fs.exists(&trash.join("old.zip")));
    Ok(())
}

#[tokio::test]
async fn macos_trash_permission_error_is_informational() -> TestResult {
    let sink = Arc::new(RecordingSink::new());
    let fs = Arc::new(MockFileSystem::new());
    fs.add_file("/Users/ana/.Trash/keep", "k");
    fs.deny_removal("/Users/ana/.Trash");

    let report = session(Platform::Macos, &sink, &fs, Arc::new(TokioStepRunner))
        .run()
        .await;

    assert_eq!(report.status, SessionStatus::Succeeded);
    assert!(sink
        .lines()
        .iter()
        .any(|l| l.starts_with("  [INFO] Trash empty or requires permission: ")));
    assert!(fs.exists(Path::new("/Users/ana/.Trash/keep")));
    Ok(())
}

#[tokio::test]
async fn windows_cleanup_runs_hidden_powershell_steps() -> TestResult {
    let sink = Arc::new(RecordingSink::new());
    let fs = Arc::new(MockFileSystem::new());
    let steps = Arc::new(ScriptedSteps {
        ok: 1,
        ..Default::default()
    });

    let report = session(Platform::Windows, &sink, &fs, steps.clone()).run().await;

    assert_eq!(report.status, SessionStatus::Succeeded);
    let seen = steps.seen.lock().unwrap().clone();
    assert!(!seen.is_empty());
    assert!(seen.iter().all(|s| s.program == "powershell" && s.hidden));

    let lines = sink.lines();
    assert!(lines.iter().any(|l| l == "[Clean Files] Starting Windows cleanup..."));
    assert!(lines.iter().any(|l| l == "    [OK] Completed."));
    let partial = lines.iter().filter(|l| l.ends_with("(Partial/Locks)")).count();
    assert_eq!(partial, seen.len() - 1);
    assert!(lines
        .iter()
        .any(|l| l == "  - Cleaning Thumbnails (Skipping to prevent explorer restart)"));
    assert_eq!(lines.last().map(String::as_str), Some(CLEANUP_DONE_BANNER));
    Ok(())
}

#[tokio::test]
async fn windows_step_output_is_forwarded_trimmed() -> TestResult {
    let sink = Arc::new(RecordingSink::new());
    let fs = Arc::new(MockFileSystem::new());
    let steps = Arc::new(ScriptedSteps {
        ok: usize::MAX,
        output: "Found 3 files\r\n".to_string(),
        ..Default::default()
    });

    session(Platform::Windows, &sink, &fs, steps).run().await;

    assert!(sink.lines().iter().any(|l| l == "    [OK] Found 3 files"));
    Ok(())
}

#[tokio::test]
async fn macos_routine_does_not_stall_the_runtime() -> TestResult {
    let sink = Arc::new(RecordingSink::new());
    let inner = MockFileSystem::new();
    inner.add_file("/Users/ana/.Trash/big.iso", "iso");
    let fs = Arc::new(SlowRemoval {
        inner,
        delay: Duration::from_millis(400),
    });

    let cleanup = CleanupSession::new(
        Platform::Macos,
        sink.clone(),
        fs,
        Arc::new(TokioStepRunner),
        paths(),
    )
    .with_options(quick());
    let run = tokio::spawn(cleanup.run());

    // Single-threaded runtime: this timer only fires on time if the
    // routine yielded the thread while the removal blocks.
    let started = Instant::now();
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(
        started.elapsed() < Duration::from_millis(300),
        "runtime was blocked for {:?}",
        started.elapsed()
    );

    let report = run.await?;
    assert_eq!(report.status, SessionStatus::Succeeded);
    assert!(sink.lines().iter().any(|l| l == "  [OK] Trash emptied."));
    Ok(())
}
