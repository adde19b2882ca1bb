use serde::Deserialize;
use serde::Serialize;

const UNKNOWN: &str = "Unknown";
/// `/v1/models` does not report a context window; this is what the backend
/// serves by default.
pub const DEFAULT_CONTEXT_LENGTH: u32 = 2048;

/// Model served by the local backend, as reported by its model listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    pub name: String,
    pub parameters: String,
    pub quantization: String,
    pub context_length: u32,
}

impl ModelInfo {
    /// Fills in what the listing endpoint leaves out.
    pub fn from_listed_id(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            parameters: UNKNOWN.to_string(),
            quantization: UNKNOWN.to_string(),
            context_length: DEFAULT_CONTEXT_LENGTH,
        }
    }
}

/// Point-in-time view of the local backend connection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendConnectionState {
    pub is_connected: bool,
    pub last_error: Option<String>,
    pub model_info: Option<ModelInfo>,
}
