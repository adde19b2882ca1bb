use std::collections::HashMap;
use std::sync::Arc;

use aurora_protocol::ChatMessage;
use aurora_protocol::ModelInfo;
use aurora_protocol::SearchResponse;
use aurora_provider_config::BackendConfig;
use aurora_provider_config::SamplingConfig;
use http::StatusCode;
use tracing::debug;
use tracing::warn;

use crate::error::Result;
use crate::error::TransportError;
use crate::transport::HttpTransport;
use crate::transport::Request;
use crate::transport::Response;
use crate::wire::ChatCompletionRequest;
use crate::wire::ChatCompletionResponse;
use crate::wire::EmbeddingRequest;
use crate::wire::EmbeddingResponse;
use crate::wire::IndexRequest;
use crate::wire::ModelsResponse;
use crate::wire::SearchRequest;

const HEALTH_PATH: &str = "/";
const MODELS_PATH: &str = "v1/models";
const CHAT_COMPLETIONS_PATH: &str = "v1/chat/completions";
const EMBEDDINGS_PATH: &str = "v1/embeddings";
const SEARCH_PATH: &str = "api/search";
const INDEX_PATH: &str = "api/index";

/// Client for the local inference backend.
#[derive(Clone)]
pub struct BackendClient {
    transport: Arc<dyn HttpTransport>,
    config: BackendConfig,
}

impl std::fmt::Debug for BackendClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl BackendClient {
    pub fn new(transport: Arc<dyn HttpTransport>, config: BackendConfig) -> Self {
        Self { transport, config }
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    async fn execute(&self, req: Request) -> std::result::Result<Response, TransportError> {
        self.transport
            .execute(req.with_timeout(self.config.request_timeout()))
            .await
    }

    async fn post<T: serde::Serialize>(&self, path: &str, body: &T) -> Result<Response> {
        let req = Request::post_json(self.config.url(path), body)?;
        let resp = self.execute(req).await?.error_for_status().inspect_err(|err| {
            warn!(path, "backend request failed: {err}");
        })?;
        Ok(resp)
    }

    /// `true` iff `GET /` answers 200.
    pub async fn health(&self) -> bool {
        match self.execute(Request::get(self.config.url(HEALTH_PATH))).await {
            Ok(resp) => resp.status == StatusCode::OK,
            Err(err) => {
                debug!("backend health check failed: {err}");
                false
            }
        }
    }

    pub async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let resp = self
            .execute(Request::get(self.config.url(MODELS_PATH)))
            .await?
            .error_for_status()?;
        let models: ModelsResponse = resp.json()?;
        Ok(models
            .data
            .into_iter()
            .map(|entry| ModelInfo::from_listed_id(entry.id))
            .collect())
    }

    pub async fn chat(
        &self,
        model: &str,
        messages: &[ChatMessage],
        sampling: &SamplingConfig,
    ) -> Result<String> {
        let body = ChatCompletionRequest {
            model,
            messages,
            temperature: sampling.temperature,
            max_tokens: sampling.max_tokens,
        };
        let resp = self.post(CHAT_COMPLETIONS_PATH, &body).await?;
        resp.json::<ChatCompletionResponse>()?.into_content()
    }

    pub async fn embed(&self, model: &str, text: &str) -> Result<Vec<f32>> {
        let body = EmbeddingRequest { model, input: text };
        let resp = self.post(EMBEDDINGS_PATH, &body).await?;
        resp.json::<EmbeddingResponse>()?.into_embedding()
    }

    pub async fn search(&self, query: &str, limit: usize) -> Result<SearchResponse> {
        let resp = self.post(SEARCH_PATH, &SearchRequest { query, limit }).await?;
        resp.json()
    }

    /// `true` iff the backend answered 200. Never an error.
    pub async fn index(&self, content: &str, metadata: Option<&HashMap<String, String>>) -> bool {
        let req = match Request::post_json(
            self.config.url(INDEX_PATH),
            &IndexRequest { content, metadata },
        ) {
            Ok(req) => req,
            Err(err) => {
                warn!("failed to build index request: {err}");
                return false;
            }
        };
        match self.execute(req).await {
            Ok(resp) if resp.status == StatusCode::OK => true,
            Ok(resp) => {
                warn!(status = %resp.status, "index request rejected");
                false
            }
            Err(err) => {
                warn!("index request failed: {err}");
                false
            }
        }
    }
}
