use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::sync::PoisonError;
use std::time::Duration;

use aurora_protocol::CommandResult;
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::warn;

use crate::error::ExecError;
use crate::error::Result;
use crate::output::OutputBuffers;
use crate::output::OutputChunk;
use crate::output::OutputSnapshot;
use crate::spawn::SPAWN_FAILURE_EXIT_CODE;
use crate::spawn::run_to_completion;

const DEFAULT_SHELL: &str = "/bin/bash";
const DEFAULT_IO_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);
const DEFAULT_KILL_GRACE_PERIOD: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutorConfig {
    /// Shell used as `<shell> -c <command>`.
    pub shell: PathBuf,
    /// Working directory; inherits the parent's when unset.
    pub cwd: Option<PathBuf>,
    /// Extra variables layered over the inherited environment.
    pub env: HashMap<String, String>,
    /// How long to keep reading pipes after the child exits.
    ///
    /// A background grandchild that inherited the pipes (`echo hi; sleep 30 &`)
    /// keeps them open after the shell exits, so such a command resolves only
    /// once this timeout elapses, with the output read up to then. The
    /// grandchild is not signalled and keeps running.
    pub io_drain_timeout: Duration,
    /// Time between SIGTERM and SIGKILL when cancelling.
    pub kill_grace_period: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            shell: PathBuf::from(DEFAULT_SHELL),
            cwd: None,
            env: HashMap::new(),
            io_drain_timeout: DEFAULT_IO_DRAIN_TIMEOUT,
            kill_grace_period: DEFAULT_KILL_GRACE_PERIOD,
        }
    }
}

/// Lifecycle of the most recent command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecState {
    #[default]
    Idle,
    Spawning,
    Running,
    Completed,
    Failed,
    Cancelled,
}

#[derive(Debug)]
struct InFlight {
    id: u64,
    command: String,
    cancel: CancellationToken,
}

#[derive(Debug, Default)]
struct ExecutorInner {
    state: ExecState,
    current: Option<InFlight>,
    next_id: u64,
}

/// Single-slot shell executor: at most one command runs at a time.
#[derive(Debug, Clone)]
pub struct ProcessExecutor {
    config: Arc<ExecutorConfig>,
    inner: Arc<StdMutex<ExecutorInner>>,
}

impl Default for ProcessExecutor {
    fn default() -> Self {
        Self::new(ExecutorConfig::default())
    }
}

impl ProcessExecutor {
    pub fn new(config: ExecutorConfig) -> Self {
        Self {
            config: Arc::new(config),
            inner: Arc::new(StdMutex::new(ExecutorInner::default())),
        }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Starts `command` on the current tokio runtime.
    ///
    /// Fails with [`ExecError::Busy`] while another command is in flight.
    /// Everything that goes wrong after that point (the shell cannot be
    /// spawned, the command fails, it is cancelled) is reported through the
    /// [`CommandResult`] returned by [`ExecHandle::wait`].
    pub fn run(&self, command: &str) -> Result<ExecHandle> {
        let runtime = Handle::try_current().map_err(|_| ExecError::NoRuntime {
            command: command.to_string(),
        })?;

        let cancel = CancellationToken::new();
        let id = {
            let mut inner = self.lock();
            if let Some(current) = &inner.current {
                return Err(ExecError::Busy {
                    running: current.command.clone(),
                });
            }
            let id = inner.next_id;
            inner.next_id += 1;
            inner.state = ExecState::Spawning;
            inner.current = Some(InFlight {
                id,
                command: command.to_string(),
                cancel: cancel.clone(),
            });
            id
        };
        debug!(id, command, "accepted command");

        let output = OutputBuffers::new();
        let (result_tx, result_rx) = oneshot::channel();
        let slot = SlotGuard {
            inner: Arc::clone(&self.inner),
            id,
            state: ExecState::Failed,
        };
        let config = Arc::clone(&self.config);
        let task_command = command.to_string();
        let task_cancel = cancel.clone();
        let task_output = output.clone();
        let task_inner = Arc::clone(&self.inner);
        runtime.spawn(async move {
            let mut slot = slot;
            let (result, state) = run_to_completion(
                &config,
                &task_command,
                &task_cancel,
                &task_output,
                || mark_running(&task_inner, id),
            )
            .await;
            slot.state = state;
            // The slot must be free before the caller observes the result.
            drop(slot);
            if result_tx.send(result).is_err() {
                debug!(id, "result receiver dropped");
            }
        });

        Ok(ExecHandle {
            id,
            command: command.to_string(),
            cancel,
            output,
            result_rx,
        })
    }

    pub fn state(&self) -> ExecState {
        self.lock().state
    }

    pub fn is_busy(&self) -> bool {
        self.lock().current.is_some()
    }

    /// Command line currently occupying the slot, if any.
    pub fn current_command(&self) -> Option<String> {
        self.lock().current.as_ref().map(|c| c.command.clone())
    }

    /// Cancels the in-flight command. Returns `false` when idle.
    pub fn cancel_current(&self) -> bool {
        let inner = self.lock();
        match &inner.current {
            Some(current) => {
                debug!(id = current.id, command = %current.command, "cancel requested");
                current.cancel.cancel();
                true
            }
            None => false,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ExecutorInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn mark_running(inner: &StdMutex<ExecutorInner>, id: u64) {
    let mut inner = inner.lock().unwrap_or_else(PoisonError::into_inner);
    if inner.current.as_ref().is_some_and(|c| c.id == id) {
        inner.state = ExecState::Running;
    }
}

/// Frees the executor slot when the runner finishes, including on panic.
struct SlotGuard {
    inner: Arc<StdMutex<ExecutorInner>>,
    id: u64,
    state: ExecState,
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if inner.current.as_ref().is_some_and(|c| c.id == self.id) {
            inner.current = None;
            inner.state = self.state;
        }
    }
}

/// Handle to one accepted command.
#[derive(Debug)]
pub struct ExecHandle {
    id: u64,
    command: String,
    cancel: CancellationToken,
    output: OutputBuffers,
    result_rx: oneshot::Receiver<CommandResult>,
}

impl ExecHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    /// Requests termination. The result still arrives through [`Self::wait`].
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Output captured so far.
    pub fn partial_output(&self) -> OutputSnapshot {
        self.output.snapshot()
    }

    /// Live output chunks from this point on.
    pub fn subscribe(&self) -> broadcast::Receiver<OutputChunk> {
        self.output.subscribe()
    }

    /// Resolves once with the command's terminal result.
    pub async fn wait(self) -> CommandResult {
        match self.result_rx.await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    id = self.id,
                    command = %self.command,
                    "command runner exited without a result"
                );
                let output = self.output.snapshot();
                CommandResult::from_streams(
                    self.command,
                    &output.stdout,
                    "command runner stopped unexpectedly",
                    SPAWN_FAILURE_EXIT_CODE,
                )
            }
        }
    }
}
