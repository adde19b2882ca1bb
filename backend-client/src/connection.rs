use std::sync::PoisonError;
use std::sync::RwLock;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use aurora_protocol::BackendConnectionState;
use aurora_protocol::ModelInfo;

/// Recorded as the last error when a health check fails.
pub const BACKEND_CONNECTION_LOST: &str = "Backend connection lost";

/// Shared view of the local backend. Written by health checks and model
/// listing, read by transport selection.
#[derive(Debug, Default)]
pub struct ConnectionState {
    connected: AtomicBool,
    last_error: RwLock<Option<String>>,
    model_info: RwLock<Option<ModelInfo>>,
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Returns the previous value.
    pub fn set_connected(&self, connected: bool) -> bool {
        self.connected.swap(connected, Ordering::AcqRel)
    }

    pub fn last_error(&self) -> Option<String> {
        self.last_error
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_last_error(&self, error: impl Into<String>) {
        *self.last_error.write().unwrap_or_else(PoisonError::into_inner) = Some(error.into());
    }

    pub fn model_info(&self) -> Option<ModelInfo> {
        self.model_info
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_model_info(&self, info: ModelInfo) {
        *self.model_info.write().unwrap_or_else(PoisonError::into_inner) = Some(info);
    }

    pub fn snapshot(&self) -> BackendConnectionState {
        BackendConnectionState {
            is_connected: self.is_connected(),
            last_error: self.last_error(),
            model_info: self.model_info(),
        }
    }
}
