//! HTTP access to the local inference backend and the direct LLM API.
//!
//! [`BackendOrchestrator`] is the entry point: it owns the shared
//! [`ConnectionState`], picks a transport per call and exposes chat,
//! embeddings, search and indexing. Everything below it is reachable for
//! callers that want a single transport.

mod backend;
mod connection;
mod direct;
mod error;
mod orchestrator;
mod transport;
pub mod wire;

pub use backend::BackendClient;
pub use connection::BACKEND_CONNECTION_LOST;
pub use connection::ConnectionState;
pub use direct::DirectClient;
pub use error::ApiError;
pub use error::Result;
pub use error::TransportError;
pub use orchestrator::BackendOrchestrator;
pub use orchestrator::CONTEXT_SYSTEM_PROMPT_PREFIX;
pub use orchestrator::DEFAULT_SEARCH_LIMIT;
pub use orchestrator::OrchestratorConfig;
pub use orchestrator::PERSONA_SYSTEM_PROMPT;
pub use orchestrator::build_chat_messages;
pub use orchestrator::cancellable;
pub use transport::HttpTransport;
pub use transport::ReqwestTransport;
pub use transport::Request;
pub use transport::Response;
