use std::sync::Arc;
use std::time::Duration;

use aurora_protocol::ChatMessage;
use aurora_provider_config::DirectApiConfig;
use aurora_provider_config::SamplingConfig;

use crate::error::ApiError;
use crate::error::Result;
use crate::transport::HttpTransport;
use crate::transport::Request;
use crate::wire::ChatCompletionRequest;
use crate::wire::ChatCompletionResponse;
use crate::wire::EmbeddingRequest;
use crate::wire::EmbeddingResponse;

/// Client for an OpenAI-compatible API reached without the local backend.
/// Supports chat and embeddings only.
#[derive(Clone)]
pub struct DirectClient {
    transport: Arc<dyn HttpTransport>,
    config: DirectApiConfig,
    timeout: Duration,
}

impl std::fmt::Debug for DirectClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectClient")
            .field("provider", &self.config.provider)
            .field("base_url", &self.config.base_url())
            .finish_non_exhaustive()
    }
}

impl DirectClient {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        config: DirectApiConfig,
        timeout: Duration,
    ) -> Self {
        Self {
            transport,
            config,
            timeout,
        }
    }

    pub fn config(&self) -> &DirectApiConfig {
        &self.config
    }

    fn authorize(&self, mut req: Request) -> Result<Request> {
        if let Some(key) = self.config.api_key()? {
            req = req.with_bearer_token(&key)?;
        }
        if let Some(headers) = &self.config.http_headers {
            for (name, value) in headers {
                req = req.with_header(name, value)?;
            }
        }
        Ok(req.with_timeout(self.timeout))
    }

    pub async fn chat(
        &self,
        messages: &[ChatMessage],
        sampling: &SamplingConfig,
    ) -> Result<String> {
        let url = self
            .config
            .chat_completions_url()
            .ok_or(ApiError::NoEndpointConfigured)?;
        let body = ChatCompletionRequest {
            model: &self.config.model,
            messages,
            temperature: sampling.temperature,
            max_tokens: sampling.max_tokens,
        };
        let req = self.authorize(Request::post_json(url, &body)?)?;
        let resp = self.transport.execute(req).await?.error_for_status()?;
        resp.json::<ChatCompletionResponse>()?.into_content()
    }

    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let url = self
            .config
            .embeddings_url()
            .ok_or(ApiError::NoEndpointConfigured)?;
        let body = EmbeddingRequest {
            model: &self.config.model,
            input: text,
        };
        let req = self.authorize(Request::post_json(url, &body)?)?;
        let resp = self.transport.execute(req).await?.error_for_status()?;
        resp.json::<EmbeddingResponse>()?.into_embedding()
    }
}
