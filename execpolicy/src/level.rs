use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;
use strum_macros::Display;
use strum_macros::EnumString;

/// Common developer commands permitted at [`SecurityLevel::Medium`].
pub const MEDIUM_ALLOWED_COMMANDS: &[&str] = &[
    "ls", "cd", "pwd", "echo", "cat", "grep", "find", "mkdir", "touch", "rm", "cp", "mv", "curl",
    "wget", "python", "python3", "node", "npm", "git",
];

/// Read-only commands permitted at [`SecurityLevel::High`].
pub const HIGH_ALLOWED_COMMANDS: &[&str] = &["ls", "pwd", "echo", "cat", "grep", "find"];

/// Substrings refused at every level.
pub const DEFAULT_DENIED_COMMANDS: &[&str] = &["sudo", "su", "rm -rf /", ":(){ :|:& };:"];

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum SecurityLevel {
    /// Only the deny-list applies.
    Low,
    /// Curated developer command set.
    #[default]
    Medium,
    /// Minimal read-only command set.
    High,
    /// Lists are whatever the caller configured.
    Custom,
}

impl SecurityLevel {
    /// Allow-list installed when switching to this level. `None` keeps the
    /// current list.
    pub fn default_allowed(self) -> Option<BTreeSet<String>> {
        let preset: &[&str] = match self {
            SecurityLevel::Low => &[],
            SecurityLevel::Medium => MEDIUM_ALLOWED_COMMANDS,
            SecurityLevel::High => HIGH_ALLOWED_COMMANDS,
            SecurityLevel::Custom => return None,
        };
        Some(preset.iter().map(|name| (*name).to_string()).collect())
    }
}

pub fn default_denied() -> BTreeSet<String> {
    DEFAULT_DENIED_COMMANDS
        .iter()
        .map(|entry| (*entry).to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    #[test]
    fn parses_and_prints_lowercase_names() {
        assert_eq!(SecurityLevel::from_str("HIGH"), Ok(SecurityLevel::High));
        assert_eq!(SecurityLevel::Custom.to_string(), "custom");
        let level: SecurityLevel = serde_json::from_str("\"low\"").unwrap();
        assert_eq!(level, SecurityLevel::Low);
    }

    #[test]
    fn high_preset_is_a_subset_of_medium() {
        let high = SecurityLevel::High.default_allowed().unwrap();
        let medium = SecurityLevel::Medium.default_allowed().unwrap();
        assert!(high.is_subset(&medium));
        assert_eq!(SecurityLevel::Custom.default_allowed(), None);
        assert_eq!(SecurityLevel::Low.default_allowed(), Some(BTreeSet::new()));
    }
}
