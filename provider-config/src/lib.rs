//! Endpoint configuration for the local inference backend and the direct
//! LLM API.
//!
//! These types are plain serde data so they can be embedded in the TOML
//! config file as-is; they carry no HTTP client of their own.

use std::collections::HashMap;
use std::env::VarError;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;
use strum_macros::Display;
use strum_macros::EnumString;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("missing environment variable {var}")]
    MissingEnvVar {
        var: String,
        instructions: Option<String>,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";
pub const DEFAULT_MODEL: &str = "llama-2-7b-chat";
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 60_000;
const DEFAULT_TEMPERATURE: f32 = 0.7;
const DEFAULT_MAX_TOKENS: u32 = 512;

const LOCAL_DIRECT_BASE_URL: &str = "http://localhost:8000/v1";
const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com/v1";

/// The local inference server that also offers search and indexing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default = "default_backend_url")]
    pub base_url: String,
    /// Used for the `model` field until a model listing has succeeded.
    #[serde(default = "default_model")]
    pub default_model: String,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_backend_url(),
            default_model: default_model(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl BackendConfig {
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// `path` joined onto the base URL with exactly one separating slash.
    pub fn url(&self, path: &str) -> String {
        join_url(&self.base_url, path)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Well-known OpenAI-compatible endpoints.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ProviderPreset {
    /// The local server's OpenAI-compatible surface.
    #[default]
    Local,
    OpenAi,
    Anthropic,
    /// Everything comes from explicit configuration.
    Custom,
}

/// Built-in defaults for a [`ProviderPreset`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderInfo {
    pub name: &'static str,
    pub base_url: Option<&'static str>,
    pub env_key: Option<&'static str>,
    pub env_key_instructions: Option<&'static str>,
}

impl ProviderPreset {
    pub fn info(self) -> ProviderInfo {
        match self {
            Self::Local => ProviderInfo {
                name: "Local",
                base_url: Some(LOCAL_DIRECT_BASE_URL),
                env_key: None,
                env_key_instructions: None,
            },
            Self::OpenAi => ProviderInfo {
                name: "OpenAI",
                base_url: Some(OPENAI_BASE_URL),
                env_key: Some("OPENAI_API_KEY"),
                env_key_instructions: Some(
                    "Create an API key at https://platform.openai.com/api-keys and export it as OPENAI_API_KEY.",
                ),
            },
            Self::Anthropic => ProviderInfo {
                name: "Anthropic",
                base_url: Some(ANTHROPIC_BASE_URL),
                env_key: Some("ANTHROPIC_API_KEY"),
                env_key_instructions: None,
            },
            Self::Custom => ProviderInfo {
                name: "Custom",
                base_url: None,
                env_key: None,
                env_key_instructions: None,
            },
        }
    }
}

pub fn built_in_providers() -> HashMap<ProviderPreset, ProviderInfo> {
    [
        ProviderPreset::Local,
        ProviderPreset::OpenAi,
        ProviderPreset::Anthropic,
        ProviderPreset::Custom,
    ]
    .into_iter()
    .map(|preset| (preset, preset.info()))
    .collect()
}

/// Remote (or local) OpenAI-compatible API used while the backend is down.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectApiConfig {
    #[serde(default)]
    pub provider: ProviderPreset,
    /// Overrides the preset's base URL.
    #[serde(default)]
    pub base_url: Option<String>,
    /// Environment variable holding the API key. Overrides the preset's.
    #[serde(default)]
    pub env_key: Option<String>,
    /// Literal token for `Authorization: Bearer`. Prefer `env_key`.
    #[serde(default)]
    pub bearer_token: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    /// Additional static HTTP headers to include in requests.
    #[serde(default)]
    pub http_headers: Option<HashMap<String, String>>,
}

impl Default for DirectApiConfig {
    fn default() -> Self {
        Self::for_provider(ProviderPreset::default())
    }
}

impl DirectApiConfig {
    pub fn for_provider(provider: ProviderPreset) -> Self {
        Self {
            provider,
            base_url: None,
            env_key: None,
            bearer_token: None,
            model: default_model(),
            http_headers: None,
        }
    }

    /// A custom endpoint at `base_url`.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: Some(base_url.into()),
            ..Self::for_provider(ProviderPreset::Custom)
        }
    }

    /// `None` for a custom provider without a configured base URL.
    pub fn base_url(&self) -> Option<String> {
        self.base_url
            .clone()
            .or_else(|| self.provider.info().base_url.map(str::to_string))
            .filter(|url| !url.trim().is_empty())
    }

    pub fn chat_completions_url(&self) -> Option<String> {
        self.base_url()
            .map(|base| join_url(&base, "chat/completions"))
    }

    pub fn embeddings_url(&self) -> Option<String> {
        self.base_url().map(|base| join_url(&base, "embeddings"))
    }

    fn effective_env_key(&self) -> Option<String> {
        self.env_key
            .clone()
            .or_else(|| self.provider.info().env_key.map(str::to_string))
    }

    /// Bearer token for requests: the literal token if set, else the value
    /// of the configured environment variable. A named variable that is not
    /// set is an error; one that is set but blank means no auth.
    pub fn api_key(&self) -> Result<Option<String>> {
        if let Some(token) = self.bearer_token.as_ref().filter(|t| !t.trim().is_empty()) {
            return Ok(Some(token.clone()));
        }
        let Some(env_key) = self.effective_env_key() else {
            return Ok(None);
        };
        match std::env::var(&env_key) {
            Ok(value) if !value.trim().is_empty() => Ok(Some(value)),
            Ok(_blank) => Ok(None),
            Err(VarError::NotPresent) => Err(Error::MissingEnvVar {
                var: env_key,
                instructions: self
                    .provider
                    .info()
                    .env_key_instructions
                    .map(str::to_string),
            }),
            Err(VarError::NotUnicode(_)) => Err(Error::MissingEnvVar {
                var: env_key,
                instructions: None,
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplingConfig {
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

fn join_url(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    if path.is_empty() {
        format!("{base}/")
    } else {
        format!("{base}/{path}")
    }
}

fn default_backend_url() -> String {
    DEFAULT_BACKEND_URL.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_request_timeout_ms() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_MS
}

fn default_temperature() -> f32 {
    DEFAULT_TEMPERATURE
}

fn default_max_tokens() -> u32 {
    DEFAULT_MAX_TOKENS
}
