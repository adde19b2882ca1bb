use std::fmt;

/// Why a command was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenyReason {
    /// The command contains an entry of the deny-list.
    DenyListed { entry: String },
    /// The first token of the command is not on the allow-list.
    NotAllowListed { command_name: String },
    /// Nothing to run.
    EmptyCommand,
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DenyReason::DenyListed { entry } => {
                write!(f, "command contains denied entry `{entry}`")
            }
            DenyReason::NotAllowListed { command_name } => {
                write!(f, "`{command_name}` is not on the allow-list")
            }
            DenyReason::EmptyCommand => write!(f, "empty command"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}
