#![cfg(unix)]
#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::path::PathBuf;
use std::time::Duration;

use assert_matches::assert_matches;
use aurora_core::Started;
use aurora_core::TerminalConfig;
use aurora_core::TerminalService;
use aurora_exec::ExecError;
use aurora_execpolicy::SecurityLevel;
use aurora_protocol::POLICY_REJECTION_MESSAGE;
use pretty_assertions::assert_eq;

fn terminal(level: SecurityLevel) -> TerminalService {
    TerminalService::from_config(&TerminalConfig {
        security_level: level,
        shell: PathBuf::from("/bin/sh"),
        ..TerminalConfig::default()
    })
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn allowed_command_runs_and_is_recorded() {
    let terminal = terminal(SecurityLevel::Medium);

    let result = terminal.execute("echo hello").await.unwrap();

    assert_eq!(result.exit_code(), 0);
    assert_eq!(result.output(), "hello\n");
    assert_eq!(terminal.history(), vec![result]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn denied_command_never_spawns() {
    let terminal = terminal(SecurityLevel::Low);

    let result = terminal.execute("sudo touch /tmp/aurora-x").await.unwrap();

    assert_eq!(result.exit_code(), 1);
    assert_eq!(result.output(), POLICY_REJECTION_MESSAGE);
    assert_eq!(terminal.history().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn high_level_rejects_writes_until_switched() {
    let terminal = terminal(SecurityLevel::High);

    let rejected = terminal.execute("mkdir aurora-never").await.unwrap();
    assert_eq!(rejected.output(), POLICY_REJECTION_MESSAGE);

    terminal.set_security_level(SecurityLevel::Medium);
    assert_eq!(terminal.security_level(), SecurityLevel::Medium);
    let allowed = terminal.execute("pwd").await.unwrap();
    assert!(allowed.is_success());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn list_edits_take_effect_immediately() {
    let terminal = terminal(SecurityLevel::Custom);

    assert!(terminal.add_allowed_command("printf"));
    let result = terminal.execute("printf ok").await.unwrap();
    assert_eq!(result.output(), "ok");

    assert!(terminal.add_denied_command("printf ok"));
    let rejected = terminal.execute("printf ok").await.unwrap();
    assert_eq!(rejected.output(), POLICY_REJECTION_MESSAGE);

    assert!(terminal.remove_denied_command("printf ok"));
    assert!(terminal.remove_allowed_command("printf"));
    assert!(!terminal.policy().allowed().contains("printf"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn busy_terminal_rejects_second_command() {
    let terminal = terminal(SecurityLevel::Low);
    let Started::Running(handle) = terminal.start("sleep 5").unwrap() else {
        panic!("sleep should be allowed");
    };

    assert_matches!(terminal.execute("echo hi").await, Err(ExecError::Busy { .. }));
    assert!(terminal.is_busy());

    assert!(terminal.cancel_current());
    let result = tokio::time::timeout(Duration::from_secs(5), terminal.finish(handle))
        .await
        .unwrap();
    assert_ne!(result.exit_code(), 0);
    assert_eq!(terminal.history().len(), 1);

    terminal.clear_history();
    assert!(terminal.history().is_empty());
}
