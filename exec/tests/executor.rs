#![cfg(unix)]
#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::path::PathBuf;
use std::time::Duration;

use assert_matches::assert_matches;
use aurora_exec::CANCELLED_EXIT_CODE;
use aurora_exec::ExecError;
use aurora_exec::ExecState;
use aurora_exec::ExecutorConfig;
use aurora_exec::OutputStream;
use aurora_exec::ProcessExecutor;
use aurora_exec::SPAWN_FAILURE_EXIT_CODE;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn sh_executor() -> ProcessExecutor {
    ProcessExecutor::new(ExecutorConfig {
        shell: PathBuf::from("/bin/sh"),
        kill_grace_period: Duration::from_millis(200),
        ..ExecutorConfig::default()
    })
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn echo_reports_stdout_and_zero_exit() {
    let executor = sh_executor();

    let result = executor.run("echo hello").unwrap().wait().await;

    assert_eq!(result.command(), "echo hello");
    assert_eq!(result.exit_code(), 0);
    assert!(result.output().contains("hello"), "{}", result.output());
    assert_eq!(executor.state(), ExecState::Completed);
    assert!(!executor.is_busy());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn stderr_is_appended_after_stdout() {
    let executor = sh_executor();

    let result = executor
        .run("echo out; echo bad 1>&2; exit 3")
        .unwrap()
        .wait()
        .await;

    assert_eq!(result.exit_code(), 3);
    assert_eq!(result.output(), "out\n\nError: bad\n");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unknown_program_fails_with_diagnostic() {
    let executor = sh_executor();

    let result = executor
        .run("definitely-not-a-real-binary-aurora")
        .unwrap()
        .wait()
        .await;

    assert_eq!(result.exit_code(), 127);
    assert!(!result.output().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn missing_shell_is_a_failed_result_not_an_error() {
    let executor = ProcessExecutor::new(ExecutorConfig {
        shell: PathBuf::from("/nonexistent/aurora-shell"),
        ..ExecutorConfig::default()
    });

    let result = executor.run("echo hi").unwrap().wait().await;

    assert_eq!(result.exit_code(), SPAWN_FAILURE_EXIT_CODE);
    assert!(result.output().starts_with("Error:"), "{}", result.output());
    assert_eq!(executor.state(), ExecState::Failed);
    assert!(!executor.is_busy());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn second_command_is_rejected_while_busy() {
    let executor = sh_executor();
    let first = executor.run("sleep 5").unwrap();

    let err = executor.run("echo second").unwrap_err();

    assert_matches!(err, ExecError::Busy { running } if running == "sleep 5");
    assert_eq!(executor.current_command().as_deref(), Some("sleep 5"));

    first.cancel();
    let result = first.wait().await;
    assert_ne!(result.exit_code(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn busy_rejection_leaves_first_result_intact() {
    let executor = sh_executor();
    let first = executor.run("sleep 0.3; echo first").unwrap();

    assert_matches!(
        executor.run("echo second"),
        Err(ExecError::Busy { running }) if running == "sleep 0.3; echo first"
    );

    let result = first.wait().await;
    assert_eq!(result.exit_code(), 0);
    assert_eq!(result.output(), "first\n");
    assert_eq!(executor.state(), ExecState::Completed);
    assert!(!executor.is_busy());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn detached_grandchild_delays_result_until_drain_timeout() {
    let executor = ProcessExecutor::new(ExecutorConfig {
        shell: PathBuf::from("/bin/sh"),
        io_drain_timeout: Duration::from_millis(300),
        ..ExecutorConfig::default()
    });
    let started = std::time::Instant::now();

    let result = tokio::time::timeout(
        Duration::from_secs(5),
        executor.run("echo hi; sleep 3 &").unwrap().wait(),
    )
    .await
    .expect("drain timeout should bound the wait");

    let elapsed = started.elapsed();
    assert_eq!(result.exit_code(), 0);
    assert_eq!(result.output(), "hi\n");
    assert!(elapsed >= Duration::from_millis(300), "{elapsed:?}");
    assert!(elapsed < Duration::from_secs(3), "{elapsed:?}");
    assert_eq!(executor.state(), ExecState::Completed);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn cancel_stops_long_running_command_promptly() {
    let executor = sh_executor();
    let handle = executor.run("sleep 30").unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(executor.cancel_current());
    let result = tokio::time::timeout(Duration::from_secs(5), handle.wait())
        .await
        .expect("cancelled command should finish");

    // SIGTERM from the group kill: 128 + 15.
    assert_eq!(result.exit_code(), 143);
    assert_ne!(result.exit_code(), CANCELLED_EXIT_CODE);
    assert_eq!(executor.state(), ExecState::Cancelled);
    assert!(!executor.is_busy());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn cancel_reaches_background_children() {
    let executor = sh_executor();
    // The backgrounded sleep keeps stdout open unless the whole group dies.
    let handle = executor.run("sleep 30 & wait").unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    handle.cancel();
    let result = tokio::time::timeout(Duration::from_secs(5), handle.wait())
        .await
        .expect("process group should be terminated");

    assert_ne!(result.exit_code(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn cancel_after_clean_exit_keeps_real_code() {
    let executor = sh_executor();
    let handle = executor.run("true").unwrap();
    let token = handle.cancellation_token();

    let result = handle.wait().await;
    token.cancel();

    assert_eq!(result.exit_code(), 0);
    assert_eq!(result.output(), "");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn partial_output_is_visible_before_exit() {
    let executor = sh_executor();
    let handle = executor.run("echo first; sleep 30").unwrap();
    let mut chunks = handle.subscribe();

    let chunk = tokio::time::timeout(Duration::from_secs(5), chunks.recv())
        .await
        .expect("first chunk")
        .unwrap();
    assert_eq!(chunk.stream, OutputStream::Stdout);
    assert_eq!(handle.partial_output().stdout, "first\n");
    assert_eq!(executor.state(), ExecState::Running);

    handle.cancel();
    let result = handle.wait().await;
    assert!(result.output().starts_with("first\n"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn executor_is_reusable_after_completion() {
    let executor = sh_executor();

    let first = executor.run("echo one").unwrap().wait().await;
    let second = executor.run("echo two").unwrap().wait().await;

    assert_eq!(first.output(), "one\n");
    assert_eq!(second.output(), "two\n");
    assert_ne!(first.id(), second.id());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn honours_working_directory_and_env() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("marker.txt"), "x").unwrap();
    let executor = ProcessExecutor::new(ExecutorConfig {
        shell: PathBuf::from("/bin/sh"),
        cwd: Some(dir.path().to_path_buf()),
        env: [("AURORA_TEST_VAR".to_string(), "set".to_string())]
            .into_iter()
            .collect(),
        ..ExecutorConfig::default()
    });

    let result = executor
        .run("ls; echo $AURORA_TEST_VAR")
        .unwrap()
        .wait()
        .await;

    assert_eq!(result.output(), "marker.txt\nset\n");
}

#[test]
fn run_outside_runtime_is_an_error() {
    let executor = sh_executor();
    assert_matches!(executor.run("echo hi"), Err(ExecError::NoRuntime { .. }));
    assert!(!executor.is_busy());
}
