use std::io;
use std::io::ErrorKind;
use std::process::ExitStatus;
use std::process::Stdio;

use aurora_protocol::CommandResult;
use tokio::io::AsyncRead;
use tokio::io::AsyncReadExt;
use tokio::process::Child;
use tokio::process::Command;
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::info;
use tracing::trace;
use tracing::warn;

use crate::executor::ExecState;
use crate::executor::ExecutorConfig;
use crate::output::OutputBuffers;
use crate::output::OutputStream;

/// Exit code reported for a command stopped by cancellation when the
/// process itself did not report a failure (shell convention for SIGINT).
pub const CANCELLED_EXIT_CODE: i32 = 130;
/// Exit code reported when the shell could not be started at all.
pub const SPAWN_FAILURE_EXIT_CODE: i32 = 1;

const READ_CHUNK_BYTES: usize = 8_192;

/// Spawns `command` through the configured shell and drives it to a
/// terminal [`CommandResult`]. `on_running` is invoked once the child
/// process exists.
pub(crate) async fn run_to_completion(
    config: &ExecutorConfig,
    command: &str,
    cancel: &CancellationToken,
    buffers: &OutputBuffers,
    on_running: impl FnOnce(),
) -> (CommandResult, ExecState) {
    if cancel.is_cancelled() {
        debug!(command, "cancelled before spawn");
        return (
            CommandResult::new(command, "Error: Command cancelled", CANCELLED_EXIT_CODE),
            ExecState::Cancelled,
        );
    }

    let mut child = match build_command(config, command).spawn() {
        Ok(child) => child,
        Err(err) => {
            warn!(command, shell = %config.shell.display(), "failed to spawn command: {err}");
            return (
                CommandResult::new(
                    command,
                    format!("Error: failed to start {}: {err}", config.shell.display()),
                    SPAWN_FAILURE_EXIT_CODE,
                ),
                ExecState::Failed,
            );
        }
    };
    let pid = child.id();
    on_running();
    debug!(command, ?pid, "command running");

    let readers: Vec<JoinHandle<()>> = [
        child
            .stdout
            .take()
            .map(|pipe| tokio::spawn(pump(pipe, OutputStream::Stdout, buffers.clone()))),
        child
            .stderr
            .take()
            .map(|pipe| tokio::spawn(pump(pipe, OutputStream::Stderr, buffers.clone()))),
    ]
    .into_iter()
    .flatten()
    .collect();

    let exited = tokio::select! {
        status = child.wait() => Some(status),
        _ = cancel.cancelled() => None,
    };
    let cancelled = exited.is_none();
    let status = match exited {
        Some(status) => status,
        None => {
            info!(command, ?pid, "cancelling command");
            terminate(&mut child, pid, config.kill_grace_period).await
        }
    };

    drain_readers(readers, config.io_drain_timeout).await;
    let output = buffers.snapshot();

    let (exit_code, state) = match status {
        Ok(status) => {
            let code = exit_code_of(status);
            if cancelled {
                let code = if code == 0 { CANCELLED_EXIT_CODE } else { code };
                (code, ExecState::Cancelled)
            } else {
                (code, ExecState::Completed)
            }
        }
        Err(err) => {
            warn!(command, "failed to wait for command: {err}");
            let state = if cancelled {
                ExecState::Cancelled
            } else {
                ExecState::Failed
            };
            let stderr = if output.stderr.is_empty() {
                format!("failed to wait for process: {err}")
            } else {
                format!("{}\nfailed to wait for process: {err}", output.stderr)
            };
            return (
                CommandResult::from_streams(
                    command,
                    &output.stdout,
                    &stderr,
                    SPAWN_FAILURE_EXIT_CODE,
                ),
                state,
            );
        }
    };

    info!(command, exit_code, cancelled, "command finished");
    (
        CommandResult::from_streams(command, &output.stdout, &output.stderr, exit_code),
        state,
    )
}

fn build_command(config: &ExecutorConfig, command: &str) -> Command {
    let mut cmd = Command::new(&config.shell);
    cmd.arg("-c").arg(command);
    if let Some(cwd) = &config.cwd {
        cmd.current_dir(cwd);
    }
    cmd.envs(&config.env);
    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());
    cmd.kill_on_drop(true);
    // Own process group so cancellation also reaches grandchildren that keep
    // the pipes open.
    #[cfg(unix)]
    cmd.process_group(0);
    cmd
}

async fn pump<R>(mut reader: R, stream: OutputStream, buffers: OutputBuffers)
where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; READ_CHUNK_BYTES];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => buffers.push(stream, &buf[..n]),
            Err(ref e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(err) => {
                trace!(?stream, "pipe read failed: {err}");
                break;
            }
        }
    }
}

/// Waits for the pipe readers, giving up on those still blocked after
/// `timeout` (a background grandchild may hold the pipe open).
async fn drain_readers(readers: Vec<JoinHandle<()>>, timeout: Duration) {
    let deadline = Instant::now() + timeout;
    for reader in readers {
        let abort = reader.abort_handle();
        if tokio::time::timeout_at(deadline, reader).await.is_err() {
            debug!("output pipe still open after exit; abandoning reader");
            abort.abort();
        }
    }
}

#[cfg(unix)]
async fn terminate(
    child: &mut Child,
    pid: Option<u32>,
    grace: Duration,
) -> io::Result<ExitStatus> {
    let Some(pid) = pid else {
        // Already reaped.
        return child.wait().await;
    };
    signal_group(pid, libc::SIGTERM);
    match tokio::time::timeout(grace, child.wait()).await {
        Ok(status) => status,
        Err(_) => {
            debug!(pid, "process ignored SIGTERM; sending SIGKILL");
            signal_group(pid, libc::SIGKILL);
            let _ = child.start_kill();
            child.wait().await
        }
    }
}

#[cfg(not(unix))]
async fn terminate(
    child: &mut Child,
    _pid: Option<u32>,
    _grace: Duration,
) -> io::Result<ExitStatus> {
    let _ = child.start_kill();
    child.wait().await
}

#[cfg(unix)]
fn signal_group(pid: u32, signal: libc::c_int) {
    let Ok(pgid) = libc::pid_t::try_from(pid) else {
        return;
    };
    // SAFETY: kill(2) with a negative pid signals the process group created
    // for this child by `process_group(0)`.
    let rc = unsafe { libc::kill(-pgid, signal) };
    if rc != 0 {
        trace!(pid, signal, "kill failed: {}", io::Error::last_os_error());
    }
}

fn exit_code_of(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    -1
}
