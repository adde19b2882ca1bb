use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use http::HeaderMap;
use http::HeaderValue;
use http::Method;
use http::StatusCode;
use http::header::AUTHORIZATION;
use http::header::CONTENT_TYPE;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::trace;

use crate::error::ApiError;
use crate::error::TransportError;

/// One HTTP request, independent of the client library that sends it.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
    pub timeout: Option<Duration>,
}

impl Request {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            url: url.into(),
            headers: HeaderMap::new(),
            body: None,
            timeout: None,
        }
    }

    pub fn post_json<T: Serialize>(
        url: impl Into<String>,
        body: &T,
    ) -> Result<Self, TransportError> {
        let body = serde_json::to_vec(body).map_err(|e| TransportError::Build(e.to_string()))?;
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(Self {
            method: Method::POST,
            url: url.into(),
            headers,
            body: Some(Bytes::from(body)),
            timeout: None,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_bearer_token(mut self, token: &str) -> Result<Self, TransportError> {
        let value = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|e| TransportError::Build(e.to_string()))?;
        self.headers.insert(AUTHORIZATION, value);
        Ok(self)
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Result<Self, TransportError> {
        let name = http::HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| TransportError::Build(e.to_string()))?;
        let value = HeaderValue::from_str(value).map_err(|e| TransportError::Build(e.to_string()))?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// The JSON body, if any, for assertions in tests and logs.
    pub fn json_body(&self) -> Option<serde_json::Value> {
        self.body
            .as_ref()
            .and_then(|body| serde_json::from_slice(body).ok())
    }
}

#[derive(Debug, Clone)]
pub struct Response {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl Response {
    /// Converts any non-2xx response into [`TransportError::Status`].
    pub fn error_for_status(self) -> Result<Self, TransportError> {
        if self.status.is_success() {
            return Ok(self);
        }
        Err(TransportError::Status {
            status: self.status,
            body: String::from_utf8_lossy(&self.body).into_owned(),
        })
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        serde_json::from_slice(&self.body).map_err(ApiError::decode)
    }
}

/// Sends a [`Request`]. Implementations return every response that arrived,
/// whatever its status; only failures to get one are errors.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn execute(&self, req: Request) -> Result<Response, TransportError>;
}

#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(&self, req: Request) -> Result<Response, TransportError> {
        trace!(method = %req.method, url = %req.url, "sending request");
        let mut builder = self
            .client
            .request(req.method, &req.url)
            .headers(req.headers);
        if let Some(timeout) = req.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(body) = req.body {
            builder = builder.body(body);
        }
        let resp = builder.send().await?;
        let status = resp.status();
        let headers = resp.headers().clone();
        let body = resp.bytes().await?;
        Ok(Response {
            status,
            headers,
            body,
        })
    }
}
