use std::sync::Mutex;
use std::sync::PoisonError;
use std::sync::RwLock;

use aurora_exec::ExecError;
use aurora_exec::ExecHandle;
use aurora_exec::ExecState;
use aurora_exec::ProcessExecutor;
use aurora_execpolicy::Decision;
use aurora_execpolicy::SecurityLevel;
use aurora_execpolicy::SecurityPolicy;
use aurora_protocol::CommandResult;
use tracing::info;

use crate::config::TerminalConfig;

/// Outcome of [`TerminalService::start`].
#[derive(Debug)]
pub enum Started {
    Running(ExecHandle),
    /// Refused by the policy; no process was started.
    Rejected(CommandResult),
}

/// The in-app terminal: every command is checked against the
/// [`SecurityPolicy`], run on a single-slot [`ProcessExecutor`] and its
/// result appended to the history.
#[derive(Debug)]
pub struct TerminalService {
    policy: RwLock<SecurityPolicy>,
    executor: ProcessExecutor,
    history: Mutex<Vec<CommandResult>>,
}

impl TerminalService {
    pub fn new(policy: SecurityPolicy, executor: ProcessExecutor) -> Self {
        Self {
            policy: RwLock::new(policy),
            executor,
            history: Mutex::new(Vec::new()),
        }
    }

    pub fn from_config(config: &TerminalConfig) -> Self {
        Self::new(config.policy(), ProcessExecutor::new(config.executor_config()))
    }

    /// Checks and runs `command`, resolving once it has finished. Rejected
    /// commands resolve immediately with the rejection result.
    pub async fn execute(&self, command: &str) -> Result<CommandResult, ExecError> {
        let result = match self.start(command)? {
            Started::Rejected(result) => result,
            Started::Running(handle) => handle.wait().await,
        };
        self.record(result.clone());
        Ok(result)
    }

    /// Like [`Self::execute`] but hands back the running command so the
    /// caller can stream its output. Rejections are recorded here; running
    /// commands are recorded when passed to [`Self::finish`].
    pub fn start(&self, command: &str) -> Result<Started, ExecError> {
        let decision = self.read_policy().check(command);
        match decision {
            Decision::Allow => Ok(Started::Running(self.executor.run(command)?)),
            Decision::Deny(reason) => {
                info!(command, %reason, "command rejected");
                Ok(Started::Rejected(CommandResult::rejected(command)))
            }
        }
    }

    /// Waits for a command from [`Self::start`] and records its result.
    pub async fn finish(&self, handle: ExecHandle) -> CommandResult {
        let result = handle.wait().await;
        self.record(result.clone());
        result
    }

    /// Cancels whatever is running. Returns `false` when idle.
    pub fn cancel_current(&self) -> bool {
        self.executor.cancel_current()
    }

    pub fn is_busy(&self) -> bool {
        self.executor.is_busy()
    }

    pub fn executor_state(&self) -> ExecState {
        self.executor.state()
    }

    pub fn history(&self) -> Vec<CommandResult> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn clear_history(&self) {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn record(&self, result: CommandResult) {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(result);
    }

    pub fn policy(&self) -> SecurityPolicy {
        self.read_policy().clone()
    }

    pub fn security_level(&self) -> SecurityLevel {
        self.read_policy().level()
    }

    pub fn set_security_level(&self, level: SecurityLevel) {
        self.write_policy().set_level(level);
    }

    pub fn add_allowed_command(&self, command: &str) -> bool {
        self.write_policy().add_allowed(command)
    }

    pub fn remove_allowed_command(&self, command: &str) -> bool {
        self.write_policy().remove_allowed(command)
    }

    pub fn add_denied_command(&self, entry: &str) -> bool {
        self.write_policy().add_denied(entry)
    }

    pub fn remove_denied_command(&self, entry: &str) -> bool {
        self.write_policy().remove_denied(entry)
    }

    fn read_policy(&self) -> std::sync::RwLockReadGuard<'_, SecurityPolicy> {
        self.policy.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_policy(&self) -> std::sync::RwLockWriteGuard<'_, SecurityPolicy> {
        self.policy.write().unwrap_or_else(PoisonError::into_inner)
    }
}
