use thiserror::Error;

pub type Result<T> = std::result::Result<T, ExecError>;

#[derive(Debug, Error)]
pub enum ExecError {
    /// A command is already in flight on this executor.
    #[error("executor is busy running `{running}`")]
    Busy { running: String },
    #[error("no tokio runtime available to run `{command}`")]
    NoRuntime { command: String },
}
