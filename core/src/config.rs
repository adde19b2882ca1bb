use std::collections::BTreeSet;
use std::io;
use std::path::Path;
use std::path::PathBuf;

use aurora_backend_client::OrchestratorConfig;
use aurora_exec::ExecutorConfig;
use aurora_execpolicy::SecurityLevel;
use aurora_execpolicy::SecurityPolicy;
use aurora_provider_config::BackendConfig;
use aurora_provider_config::DirectApiConfig;
use aurora_provider_config::SamplingConfig;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

pub const CONFIG_TOML_FILE: &str = "config.toml";
const AURORA_HOME_ENV: &str = "AURORA_HOME";
const DEFAULT_SHELL: &str = "/bin/bash";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unable to determine the Aurora home directory: {0}")]
    Home(#[source] io::Error),
    #[error("unable to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("unable to parse config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Contents of `config.toml`. Every section and field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub direct_api: DirectApiConfig,
    #[serde(default)]
    pub sampling: SamplingConfig,
    #[serde(default)]
    pub terminal: TerminalConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminalConfig {
    #[serde(default)]
    pub security_level: SecurityLevel,
    #[serde(default = "default_shell")]
    pub shell: PathBuf,
    #[serde(default)]
    pub cwd: Option<PathBuf>,
    /// Added on top of the level's preset allow-list.
    #[serde(default)]
    pub allowed_commands: Vec<String>,
    /// Added on top of the default deny-list.
    #[serde(default)]
    pub denied_commands: Vec<String>,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            security_level: SecurityLevel::default(),
            shell: default_shell(),
            cwd: None,
            allowed_commands: Vec::new(),
            denied_commands: Vec::new(),
        }
    }
}

impl TerminalConfig {
    pub fn policy(&self) -> SecurityPolicy {
        let base = SecurityPolicy::new(self.security_level);
        let allowed: BTreeSet<String> = base
            .allowed()
            .iter()
            .cloned()
            .chain(self.allowed_commands.iter().cloned())
            .collect();
        let denied: BTreeSet<String> = base
            .denied()
            .iter()
            .cloned()
            .chain(self.denied_commands.iter().cloned())
            .collect();
        SecurityPolicy::with_lists(self.security_level, allowed, denied)
    }

    pub fn executor_config(&self) -> ExecutorConfig {
        ExecutorConfig {
            shell: self.shell.clone(),
            cwd: self.cwd.clone(),
            ..ExecutorConfig::default()
        }
    }
}

impl Config {
    /// Loads `path`, or `config.toml` in the Aurora home when `path` is
    /// `None`. Only the implicit file may be absent.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load_from_path(path),
            None => {
                let path = find_aurora_home()
                    .map_err(ConfigError::Home)?
                    .join(CONFIG_TOML_FILE);
                if !path.exists() {
                    debug!(path = %path.display(), "no config file; using defaults");
                    return Ok(Self::default());
                }
                Self::load_from_path(&path)
            }
        }
    }

    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            backend: self.backend.clone(),
            direct_api: self.direct_api.clone(),
            sampling: self.sampling,
        }
    }
}

/// `$AURORA_HOME` when set and non-empty, otherwise `~/.aurora`. The
/// directory is not required to exist.
pub fn find_aurora_home() -> io::Result<PathBuf> {
    if let Ok(val) = std::env::var(AURORA_HOME_ENV)
        && !val.is_empty()
    {
        return Ok(PathBuf::from(val));
    }
    let mut home = dirs::home_dir().ok_or_else(|| {
        io::Error::new(io::ErrorKind::NotFound, "could not find home directory")
    })?;
    home.push(".aurora");
    Ok(home)
}

fn default_shell() -> PathBuf {
    PathBuf::from(DEFAULT_SHELL)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use aurora_execpolicy::Decision;
    use aurora_provider_config::ProviderPreset;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn empty_file_is_all_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_TOML_FILE);
        std::fs::write(&path, "").unwrap();

        assert_eq!(Config::load(Some(&path)).unwrap(), Config::default());
    }

    #[test]
    fn parses_every_section() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_TOML_FILE);
        std::fs::write(
            &path,
            r#"
[backend]
base_url = "http://127.0.0.1:9999"

[direct_api]
provider = "openai"
model = "gpt-4o-mini"

[sampling]
temperature = 0.2

[terminal]
security_level = "high"
shell = "/bin/sh"
allowed_commands = ["cargo"]
denied_commands = ["shutdown"]
"#,
        )
        .unwrap();

        let config = Config::load_from_path(&path).unwrap();

        assert_eq!(config.backend.base_url, "http://127.0.0.1:9999");
        assert_eq!(config.direct_api.provider, ProviderPreset::OpenAi);
        assert_eq!(config.direct_api.model, "gpt-4o-mini");
        assert_eq!(config.sampling.max_tokens, 512);
        assert_eq!(config.terminal.shell, PathBuf::from("/bin/sh"));

        let policy = config.terminal.policy();
        assert_eq!(policy.level(), SecurityLevel::High);
        assert!(policy.check("cargo build").is_allowed());
        assert!(policy.check("ls").is_allowed());
        assert!(!policy.check("mkdir x").is_allowed());
        assert_matches!(policy.check("shutdown now"), Decision::Deny(_));
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_TOML_FILE);
        std::fs::write(&path, "[backend\nbase_url = 1").unwrap();

        assert_matches!(
            Config::load_from_path(&path),
            Err(ConfigError::Parse { .. })
        );
    }

    #[test]
    fn explicit_missing_file_is_a_read_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("absent.toml");
        assert_matches!(Config::load(Some(&path)), Err(ConfigError::Read { .. }));
    }
}
