//! Request and response bodies of the OpenAI-compatible endpoints and the
//! backend's search and index API.

use std::collections::HashMap;

use aurora_protocol::ChatMessage;
use serde::Deserialize;
use serde::Serialize;

use crate::error::ApiError;

#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [ChatMessage],
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionResponse {
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoice {
    pub message: ChatChoiceMessage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
}

impl ChatCompletionResponse {
    /// Content of the first choice.
    pub fn into_content(self) -> Result<String, ApiError> {
        self.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(ApiError::NoResponseContent)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EmbeddingRequest<'a> {
    pub model: &'a str,
    pub input: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingResponse {
    pub data: Vec<EmbeddingData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingData {
    pub embedding: Vec<f32>,
}

impl EmbeddingResponse {
    pub fn into_embedding(self) -> Result<Vec<f32>, ApiError> {
        self.data
            .into_iter()
            .next()
            .map(|data| data.embedding)
            .ok_or(ApiError::NoEmbeddingData)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelsResponse {
    pub data: Vec<ModelEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelEntry {
    pub id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchRequest<'a> {
    pub query: &'a str,
    pub limit: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct IndexRequest<'a> {
    pub content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<&'a HashMap<String, String>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn chat_request_matches_openai_shape() {
        let messages = [ChatMessage::system("sys"), ChatMessage::user("hi")];
        let request = ChatCompletionRequest {
            model: "m",
            messages: &messages,
            temperature: 0.5,
            max_tokens: 16,
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "model": "m",
                "messages": [
                    {"role": "system", "content": "sys"},
                    {"role": "user", "content": "hi"},
                ],
                "temperature": 0.5,
                "max_tokens": 16,
            })
        );
    }

    #[test]
    fn extra_response_fields_are_ignored() {
        let response: ChatCompletionResponse = serde_json::from_value(json!({
            "id": "x",
            "object": "chat.completion",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "hello"}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 1},
        }))
        .unwrap();
        assert_eq!(response.into_content().unwrap(), "hello");
    }

    #[test]
    fn empty_choices_and_data_are_typed_errors() {
        let chat = ChatCompletionResponse { choices: vec![] };
        assert_matches!(chat.into_content(), Err(ApiError::NoResponseContent));

        let embedding = EmbeddingResponse { data: vec![] };
        assert_matches!(embedding.into_embedding(), Err(ApiError::NoEmbeddingData));
    }

    #[test]
    fn index_request_omits_absent_metadata() {
        let request = IndexRequest {
            content: "body",
            metadata: None,
        };
        assert_eq!(serde_json::to_value(&request).unwrap(), json!({"content": "body"}));
    }
}
