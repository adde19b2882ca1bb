use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use uuid::Uuid;

/// Output delivered for a command that the security policy refused to run.
pub const POLICY_REJECTION_MESSAGE: &str = "Error: Command not allowed for security reasons";

const STDERR_SEPARATOR: &str = "\nError: ";

/// Terminal outcome of one shell command.
///
/// Fields are private so a result cannot be altered once it has been handed
/// to a history sink; use the accessors to read it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandResult {
    id: Uuid,
    command: String,
    output: String,
    exit_code: i32,
    timestamp: DateTime<Utc>,
}

impl CommandResult {
    pub fn new(command: impl Into<String>, output: impl Into<String>, exit_code: i32) -> Self {
        Self {
            id: Uuid::new_v4(),
            command: command.into(),
            output: output.into(),
            exit_code,
            timestamp: Utc::now(),
        }
    }

    /// Builds a result from the separately captured stdout and stderr text.
    pub fn from_streams(
        command: impl Into<String>,
        stdout: &str,
        stderr: &str,
        exit_code: i32,
    ) -> Self {
        Self::new(command, combine_output(stdout, stderr), exit_code)
    }

    /// Synthetic result for a command rejected before any process started.
    pub fn rejected(command: impl Into<String>) -> Self {
        Self::new(command, POLICY_REJECTION_MESSAGE, 1)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn exit_code(&self) -> i32 {
        self.exit_code
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }
}

/// `stdout`, followed by `"\nError: " + stderr` when stderr is non-empty.
pub fn combine_output(stdout: &str, stderr: &str) -> String {
    if stderr.is_empty() {
        return stdout.to_string();
    }
    let mut combined = String::with_capacity(stdout.len() + STDERR_SEPARATOR.len() + stderr.len());
    combined.push_str(stdout);
    combined.push_str(STDERR_SEPARATOR);
    combined.push_str(stderr);
    combined
}
