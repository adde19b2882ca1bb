//! Runs terminal commands through a shell, one at a time.
//!
//! [`ProcessExecutor::run`] accepts a raw command line, spawns it as
//! `<shell> -c <command>` and returns an [`ExecHandle`] that resolves exactly
//! once to a [`CommandResult`](aurora_protocol::CommandResult). Spawn
//! failures and cancellations are reported as results with a non-zero exit
//! code, never as errors.

mod error;
mod executor;
mod output;
mod spawn;

pub use error::ExecError;
pub use error::Result;
pub use executor::ExecHandle;
pub use executor::ExecState;
pub use executor::ExecutorConfig;
pub use executor::ProcessExecutor;
pub use output::OutputChunk;
pub use output::OutputSnapshot;
pub use output::OutputStream;
pub use spawn::CANCELLED_EXIT_CODE;
pub use spawn::SPAWN_FAILURE_EXIT_CODE;
