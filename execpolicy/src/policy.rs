use std::collections::BTreeSet;

use tracing::debug;

use crate::decision::Decision;
use crate::decision::DenyReason;
use crate::level::SecurityLevel;
use crate::level::default_denied;

/// Whitespace-delimited first token of `command`.
pub fn command_name(command: &str) -> Option<&str> {
    command.split_whitespace().next()
}

/// Decides whether `command` may run.
///
/// The deny-list always wins: any entry that occurs as a substring of the
/// raw command refuses it, whatever the level. At [`SecurityLevel::Low`] the
/// deny-list is the only gate; at every other level the command name must
/// be on the allow-list.
pub fn decide(
    command: &str,
    level: SecurityLevel,
    allowed: &BTreeSet<String>,
    denied: &BTreeSet<String>,
) -> Decision {
    if let Some(entry) = denied.iter().find(|entry| command.contains(entry.as_str())) {
        return Decision::Deny(DenyReason::DenyListed {
            entry: entry.clone(),
        });
    }

    if level == SecurityLevel::Low {
        return Decision::Allow;
    }

    match command_name(command) {
        Some(name) if allowed.contains(name) => Decision::Allow,
        Some(name) => Decision::Deny(DenyReason::NotAllowListed {
            command_name: name.to_string(),
        }),
        None => Decision::Deny(DenyReason::EmptyCommand),
    }
}

/// Mutable allow/deny lists plus the active [`SecurityLevel`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityPolicy {
    level: SecurityLevel,
    allowed: BTreeSet<String>,
    denied: BTreeSet<String>,
}

impl Default for SecurityPolicy {
    fn default() -> Self {
        Self::new(SecurityLevel::default())
    }
}

impl SecurityPolicy {
    /// Policy with the preset lists of `level` and the default deny-list.
    /// `Custom` starts from the medium preset.
    pub fn new(level: SecurityLevel) -> Self {
        let allowed = level
            .default_allowed()
            .or_else(|| SecurityLevel::Medium.default_allowed())
            .unwrap_or_default();
        Self {
            level,
            allowed,
            denied: default_denied(),
        }
    }

    /// Policy with explicit lists, used by configuration loading.
    pub fn with_lists(
        level: SecurityLevel,
        allowed: BTreeSet<String>,
        denied: BTreeSet<String>,
    ) -> Self {
        Self {
            level,
            allowed,
            denied,
        }
    }

    pub fn level(&self) -> SecurityLevel {
        self.level
    }

    pub fn allowed(&self) -> &BTreeSet<String> {
        &self.allowed
    }

    pub fn denied(&self) -> &BTreeSet<String> {
        &self.denied
    }

    /// Switches level, installing the level's preset allow-list. The
    /// deny-list is never touched and `Custom` keeps the current lists.
    pub fn set_level(&mut self, level: SecurityLevel) {
        if let Some(allowed) = level.default_allowed() {
            self.allowed = allowed;
        }
        debug!(from = %self.level, to = %level, "security level changed");
        self.level = level;
    }

    pub fn add_allowed(&mut self, command: impl Into<String>) -> bool {
        self.allowed.insert(command.into())
    }

    pub fn remove_allowed(&mut self, command: &str) -> bool {
        self.allowed.remove(command)
    }

    pub fn add_denied(&mut self, entry: impl Into<String>) -> bool {
        self.denied.insert(entry.into())
    }

    pub fn remove_denied(&mut self, entry: &str) -> bool {
        self.denied.remove(entry)
    }

    pub fn check(&self, command: &str) -> Decision {
        let decision = decide(command, self.level, &self.allowed, &self.denied);
        if let Decision::Deny(reason) = &decision {
            debug!(level = %self.level, %reason, "command denied by security policy");
        }
        decision
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::DEFAULT_DENIED_COMMANDS;
    use crate::level::HIGH_ALLOWED_COMMANDS;
    use pretty_assertions::assert_eq;

    const ALL_LEVELS: &[SecurityLevel] = &[
        SecurityLevel::Low,
        SecurityLevel::Medium,
        SecurityLevel::High,
        SecurityLevel::Custom,
    ];

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|item| (*item).to_string()).collect()
    }

    #[test]
    fn deny_list_wins_at_every_level() {
        let allowed = set(&["sudo", "rm", "ls", "echo"]);
        let denied = set(DEFAULT_DENIED_COMMANDS);
        let commands = [
            "sudo ls",
            "echo hi && sudo reboot",
            "rm -rf / --no-preserve-root",
            ":(){ :|:& };:",
            "ls; su root",
        ];
        for level in ALL_LEVELS {
            for command in commands {
                let decision = decide(command, *level, &allowed, &denied);
                assert!(
                    matches!(decision, Decision::Deny(DenyReason::DenyListed { .. })),
                    "expected {command:?} to be denied at {level}, got {decision:?}"
                );
            }
        }
    }

    #[test]
    fn low_level_with_empty_deny_list_allows_everything() {
        let empty = BTreeSet::new();
        for command in ["", "   ", "sudo rm -rf /", "anything | goes > here", "ñ"] {
            assert_eq!(
                decide(command, SecurityLevel::Low, &empty, &empty),
                Decision::Allow,
                "{command:?}"
            );
        }
    }

    #[test]
    fn high_level_only_allows_the_read_only_set() {
        let policy = SecurityPolicy::new(SecurityLevel::High);
        for name in HIGH_ALLOWED_COMMANDS {
            assert_eq!(policy.check(&format!("{name} something")), Decision::Allow);
        }
        for command in ["git status", "rm file", "python3 -V", "curl example.com"] {
            assert!(!policy.check(command).is_allowed(), "{command:?}");
        }
    }

    #[test]
    fn command_name_is_the_first_whitespace_token() {
        assert_eq!(command_name("  ls   -la"), Some("ls"));
        assert_eq!(command_name("ls\t-la"), Some("ls"));
        assert_eq!(command_name("   "), None);

        let policy = SecurityPolicy::new(SecurityLevel::High);
        assert_eq!(
            policy.check("lsblk"),
            Decision::Deny(DenyReason::NotAllowListed {
                command_name: "lsblk".to_string()
            })
        );
        assert_eq!(policy.check(""), Decision::Deny(DenyReason::EmptyCommand));
    }

    #[test]
    fn level_transitions_reset_the_allow_list() {
        let mut policy = SecurityPolicy::new(SecurityLevel::Medium);
        policy.add_allowed("cargo");
        assert!(policy.check("cargo build").is_allowed());

        policy.set_level(SecurityLevel::Custom);
        assert!(policy.check("cargo build").is_allowed());

        policy.set_level(SecurityLevel::High);
        assert!(!policy.check("cargo build").is_allowed());
        assert_eq!(policy.allowed(), &set(HIGH_ALLOWED_COMMANDS));

        policy.set_level(SecurityLevel::Low);
        assert!(policy.allowed().is_empty());
        assert!(policy.check("cargo build").is_allowed());

        policy.set_level(SecurityLevel::Medium);
        assert!(policy.check("git status").is_allowed());
        assert!(!policy.check("cargo build").is_allowed());
    }

    #[test]
    fn deny_list_survives_level_changes_and_can_be_edited() {
        let mut policy = SecurityPolicy::new(SecurityLevel::Low);
        policy.add_denied("shutdown");
        policy.set_level(SecurityLevel::High);
        policy.set_level(SecurityLevel::Low);
        assert!(!policy.check("shutdown -h now").is_allowed());

        assert!(policy.remove_denied("shutdown"));
        assert!(policy.check("shutdown -h now").is_allowed());
        assert!(!policy.remove_denied("shutdown"));
    }

    #[test]
    fn decisions_are_reproducible() {
        let policy = SecurityPolicy::new(SecurityLevel::Medium);
        for command in ["git log", "sudo ls", "make", ""] {
            assert_eq!(policy.check(command), policy.check(command));
        }
    }
}
