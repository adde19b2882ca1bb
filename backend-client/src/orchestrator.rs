use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use aurora_protocol::BackendConnectionState;
use aurora_protocol::ChatMessage;
use aurora_protocol::ModelInfo;
use aurora_protocol::Role;
use aurora_protocol::SearchResponse;
use aurora_provider_config::BackendConfig;
use aurora_provider_config::DirectApiConfig;
use aurora_provider_config::SamplingConfig;
use serde::Deserialize;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::backend::BackendClient;
use crate::connection::BACKEND_CONNECTION_LOST;
use crate::connection::ConnectionState;
use crate::direct::DirectClient;
use crate::error::ApiError;
use crate::error::Result;
use crate::transport::HttpTransport;
use crate::transport::ReqwestTransport;

pub const DEFAULT_SEARCH_LIMIT: usize = 5;

pub const PERSONA_SYSTEM_PROMPT: &str =
    "You are Aurora, an AI assistant integrated into a web browser. Be helpful, concise, and accurate.";
/// Followed directly by the caller's context.
pub const CONTEXT_SYSTEM_PROMPT_PREFIX: &str =
    "You are Aurora, an AI assistant integrated into a web browser. Use the following context from the current webpage to answer the user's question: ";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub direct_api: DirectApiConfig,
    #[serde(default)]
    pub sampling: SamplingConfig,
}

/// Routes AI requests to the local backend while it is reachable and to the
/// direct API otherwise.
///
/// Calls are independent: nothing here serializes them, and each can be
/// raced against a [`CancellationToken`] with [`cancellable`].
#[derive(Debug)]
pub struct BackendOrchestrator {
    backend: BackendClient,
    direct: DirectClient,
    sampling: SamplingConfig,
    state: ConnectionState,
    in_flight: AtomicUsize,
}

impl BackendOrchestrator {
    pub fn new(transport: Arc<dyn HttpTransport>, config: OrchestratorConfig) -> Self {
        let timeout = config.backend.request_timeout();
        Self {
            backend: BackendClient::new(Arc::clone(&transport), config.backend),
            direct: DirectClient::new(transport, config.direct_api, timeout),
            sampling: config.sampling,
            state: ConnectionState::default(),
            in_flight: AtomicUsize::new(0),
        }
    }

    pub fn with_reqwest(config: OrchestratorConfig) -> Self {
        Self::new(Arc::new(ReqwestTransport::default()), config)
    }

    pub fn connection(&self) -> BackendConnectionState {
        self.state.snapshot()
    }

    pub fn is_connected(&self) -> bool {
        self.state.is_connected()
    }

    /// Whether any request is currently outstanding. Informational only.
    pub fn is_processing(&self) -> bool {
        self.in_flight.load(Ordering::Acquire) > 0
    }

    /// Probes the backend and records the outcome. On success the model
    /// listing is refreshed as well.
    pub async fn check_health(&self) -> bool {
        let connected = self.backend.health().await;
        let was_connected = self.state.set_connected(connected);
        if connected {
            if !was_connected {
                info!(url = %self.backend.config().base_url, "backend connected");
            }
            if let Err(err) = self.refresh_models().await {
                warn!("failed to list backend models: {err}");
            }
        } else {
            if was_connected {
                warn!(url = %self.backend.config().base_url, "backend connection lost");
            }
            self.state.set_last_error(BACKEND_CONNECTION_LOST);
        }
        connected
    }

    /// Fetches `/v1/models` and caches the first entry. A failure is
    /// recorded as the last error and leaves the cached model in place.
    pub async fn refresh_models(&self) -> Result<Option<ModelInfo>> {
        match self.backend.list_models().await {
            Ok(models) => {
                let first = models.into_iter().next();
                if let Some(model) = &first {
                    debug!(model = %model.id, "backend model");
                    self.state.set_model_info(model.clone());
                }
                Ok(first)
            }
            Err(err) => {
                self.state.set_last_error(err.to_string());
                Err(err)
            }
        }
    }

    fn backend_model(&self) -> String {
        self.state
            .model_info()
            .map(|info| info.id)
            .unwrap_or_else(|| self.backend.config().default_model.clone())
    }

    /// Chat with the Aurora persona, or with `context` from the current page.
    pub async fn chat(&self, messages: &[ChatMessage], context: Option<&str>) -> Result<String> {
        let messages = build_chat_messages(messages, context);
        self.complete(&messages).await
    }

    /// Sends `messages` as given.
    pub async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        let _processing = ProcessingGuard::enter(&self.in_flight);
        if self.state.is_connected() {
            debug!(transport = "backend", "chat completion");
            self.backend
                .chat(&self.backend_model(), messages, &self.sampling)
                .await
        } else {
            debug!(transport = "direct", "chat completion");
            self.direct.chat(messages, &self.sampling).await
        }
    }

    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let _processing = ProcessingGuard::enter(&self.in_flight);
        if self.state.is_connected() {
            debug!(transport = "backend", "embedding");
            self.backend.embed(&self.backend_model(), text).await
        } else {
            debug!(transport = "direct", "embedding");
            self.direct.embed(text).await
        }
    }

    /// Backend-only; fails without a network call while disconnected.
    pub async fn search(&self, query: &str, limit: usize) -> Result<SearchResponse> {
        if !self.state.is_connected() {
            return Err(ApiError::BackendUnavailable);
        }
        let _processing = ProcessingGuard::enter(&self.in_flight);
        self.backend.search(query, limit).await
    }

    /// Backend-only. Once connected, any failure is reported as `Ok(false)`.
    pub async fn index(
        &self,
        content: &str,
        metadata: Option<&HashMap<String, String>>,
    ) -> Result<bool> {
        if !self.state.is_connected() {
            return Err(ApiError::BackendUnavailable);
        }
        let _processing = ProcessingGuard::enter(&self.in_flight);
        Ok(self.backend.index(content, metadata).await)
    }
}

struct ProcessingGuard<'a>(&'a AtomicUsize);

impl<'a> ProcessingGuard<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::AcqRel);
        Self(counter)
    }
}

impl Drop for ProcessingGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

/// One leading system message (page context or the default persona)
/// followed by the caller's non-system messages in order. Caller system
/// messages are appended to the leading one.
pub fn build_chat_messages(messages: &[ChatMessage], context: Option<&str>) -> Vec<ChatMessage> {
    let mut system = match context {
        Some(context) => format!("{CONTEXT_SYSTEM_PROMPT_PREFIX}{context}"),
        None => PERSONA_SYSTEM_PROMPT.to_string(),
    };
    let mut out = Vec::with_capacity(messages.len() + 1);
    out.push(ChatMessage::system(String::new()));
    for message in messages {
        if message.role == Role::System {
            system.push_str("\n\n");
            system.push_str(&message.content);
        } else {
            out.push(message.clone());
        }
    }
    out[0].content = system;
    out
}

/// Resolves with [`ApiError::Cancelled`] as soon as `token` fires, dropping
/// `fut` and any request it has in flight.
pub async fn cancellable<T, F>(token: &CancellationToken, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(ApiError::Cancelled),
        result = fut => result,
    }
}
