use http::StatusCode;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ApiError>;

/// Failure to complete an HTTP round trip with a 2xx status.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("network error: {0}")]
    Network(String),
    #[error("request timed out")]
    Timeout,
    #[error("unexpected status {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("failed to build request: {0}")]
    Build(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_builder() {
            Self::Build(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("failed to decode response: {source}")]
    Decode {
        #[source]
        source: serde_json::Error,
    },
    #[error("no response content")]
    NoResponseContent,
    #[error("no embedding data in response")]
    NoEmbeddingData,
    /// Search and indexing exist only on the local backend.
    #[error("backend is not connected")]
    BackendUnavailable,
    #[error("no API endpoint configured")]
    NoEndpointConfigured,
    #[error("missing environment variable {var}")]
    MissingEnvVar {
        var: String,
        instructions: Option<String>,
    },
    #[error("request cancelled")]
    Cancelled,
}

impl From<aurora_provider_config::Error> for ApiError {
    fn from(err: aurora_provider_config::Error) -> Self {
        match err {
            aurora_provider_config::Error::MissingEnvVar { var, instructions } => {
                Self::MissingEnvVar { var, instructions }
            }
        }
    }
}

impl ApiError {
    pub(crate) fn decode(source: serde_json::Error) -> Self {
        Self::Decode { source }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
