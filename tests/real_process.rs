#![cfg(unix)]

use std::error::Error;
use std::sync::Arc;
use std::time::{Duration, Instant};

use checkpoint::exec::{
    CommandSpec, ExecutionSession, TokioLauncher, KILL_DRAIN_GRACE, SUCCESS_BANNER,
};
use checkpoint::types::SessionStatus;
use tokio::sync::oneshot;

mod common;
use crate::common::{init_tracing, position, quick, with_timeout, RecordingSink};

type TestResult = Result<(), Box<dyn Error>>;

fn sh(script: &str) -> CommandSpec {
    CommandSpec::new("sh").args(["-c", script])
}

#[tokio::test]
async fn real_process_output_is_tagged_per_stream() -> TestResult {
    init_tracing();
    let sink = Arc::new(RecordingSink::new());

    let report = with_timeout(
        ExecutionSession::new("Echo", sh("echo out; echo err 1>&2"), sink.clone())
            .with_options(quick())
            .run(&TokioLauncher),
    )
    .await;

    assert_eq!(report.status, SessionStatus::Succeeded);
    let lines = sink.lines();
    assert!(position(&lines, "out").is_some());
    assert!(position(&lines, "[ERR] err").is_some());
    assert_eq!(lines.last().map(String::as_str), Some(SUCCESS_BANNER));
    Ok(())
}

#[tokio::test]
async fn real_process_exit_code_is_reported() -> TestResult {
    let sink = Arc::new(RecordingSink::new());

    let report = ExecutionSession::new("Exit", sh("exit 2"), sink.clone())
        .with_options(quick())
        .run(&TokioLauncher)
        .await;

    assert_eq!(report.status, SessionStatus::Failed);
    assert_eq!(report.exit.and_then(|e| e.code), Some(2));
    assert_eq!(
        sink.lines().last().map(String::as_str),
        Some("[STOP] Process finished with error: exit status: 2")
    );
    Ok(())
}

#[tokio::test]
async fn missing_program_is_a_start_failure() -> TestResult {
    let sink = Arc::new(RecordingSink::new());
    let spec = CommandSpec::new("definitely-not-a-real-binary-checkpoint");

    let report = ExecutionSession::new("Missing", spec, sink.clone())
        .with_options(quick())
        .run(&TokioLauncher)
        .await;

    assert_eq!(report.status, SessionStatus::Failed);
    let last = sink.lines().pop().ok_or("no lines")?;
    assert!(last.starts_with("[ERROR] Failed to start command: "), "{last}");
    assert_eq!(sink.done_count("Missing"), 1);
    Ok(())
}

#[tokio::test]
async fn large_output_on_both_streams_does_not_deadlock() -> TestResult {
    let sink = Arc::new(RecordingSink::new());
    let script = "i=0; while [ $i -lt 5000 ]; do echo \"out $i\"; echo \"err $i\" 1>&2; i=$((i+1)); done";

    let report = tokio::time::timeout(
        Duration::from_secs(30),
        ExecutionSession::new("Flood", sh(script), sink.clone())
            .with_options(quick())
            .run(&TokioLauncher),
    )
    .await?;

    assert_eq!(report.status, SessionStatus::Succeeded);
    assert_eq!(report.stdout_lines, 5000);
    assert_eq!(report.stderr_lines, 5000);

    let lines = sink.lines();
    let first = position(&lines, "out 0").ok_or("missing out 0")?;
    let last = position(&lines, "out 4999").ok_or("missing out 4999")?;
    assert!(first < last);
    Ok(())
}

#[tokio::test]
async fn cancelling_a_long_running_process_returns_promptly() -> TestResult {
    let (sink, waited) =
        run_and_cancel("Sleep", "echo begin; exec sleep 30", Duration::from_millis(200)).await?;

    assert!(waited < KILL_DRAIN_GRACE, "cancel took {waited:?}");
    assert_eq!(sink.done_count("Sleep"), 1);
    Ok(())
}

/// Run `script` under a cancellable session and cancel it after `after`.
/// Returns the sink and how long the session took to finish once cancelled.
async fn run_and_cancel(
    feature: &str,
    script: &str,
    after: Duration,
) -> Result<(Arc<RecordingSink>, Duration), Box<dyn Error>> {
    let sink = Arc::new(RecordingSink::new());
    let (tx, rx) = oneshot::channel();

    let run = tokio::spawn({
        let sink = sink.clone();
        let spec = sh(script);
        let feature = feature.to_string();
        async move {
            ExecutionSession::new(feature, spec, sink)
                .with_options(quick())
                .with_cancel(rx)
                .run(&TokioLauncher)
                .await
        }
    });

    tokio::time::sleep(after).await;
    let cancelled_at = Instant::now();
    tx.send(()).map_err(|_| "session ended before cancellation")?;

    let report = with_timeout(run).await?;
    assert!(report.cancelled);
    Ok((sink, cancelled_at.elapsed()))
}

#[tokio::test]
async fn cancelling_a_shell_also_kills_its_children() -> TestResult {
    init_tracing();
    let (sink, waited) =
        run_and_cancel("Wrapped", "echo begin; sleep 5; echo end", Duration::from_millis(200))
            .await?;

    // The group kill closes the pipes, so no grace period is needed.
    assert!(waited < KILL_DRAIN_GRACE, "cancel took {waited:?}");
    let lines = sink.lines();
    assert!(position(&lines, "begin").is_some());
    assert!(position(&lines, "end").is_none());
    assert_eq!(sink.done_count("Wrapped"), 1);
    Ok(())
}

#[tokio::test]
async fn background_job_holding_the_pipe_is_killed_with_the_shell() -> TestResult {
    let (sink, waited) =
        run_and_cancel("Background", "sleep 30 & echo started; wait", Duration::from_millis(200))
            .await?;

    // The background `sleep` shares stdout; the session can only finish
    // before the grace period if it died along with the shell.
    assert!(waited < KILL_DRAIN_GRACE, "cancel took {waited:?}");
    assert!(position(&sink.lines(), "started").is_some());
    assert_eq!(sink.done_count("Background"), 1);
    Ok(())
}
