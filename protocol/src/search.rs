use std::collections::HashMap;

use serde::Deserialize;
use serde::Serialize;

/// Body returned by the backend's `/api/search` endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub results: Vec<SearchResult>,
    pub llm_response: String,
    pub query_time_ms: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, String>>,
    pub score: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn decodes_backend_search_body() {
        let body = json!({
            "results": [
                {"id": "doc-1", "content": "rust ownership", "score": 0.92},
                {"id": "doc-2", "content": "borrowing", "metadata": {"url": "https://a.example"}, "score": 0.5}
            ],
            "llm_response": "Ownership moves values.",
            "query_time_ms": 12.5
        });
        let response: SearchResponse = serde_json::from_value(body).unwrap();
        assert_eq!(response.results.len(), 2);
        assert_eq!(response.results[0].metadata, None);
        assert_eq!(
            response.results[1]
                .metadata
                .as_ref()
                .and_then(|m| m.get("url"))
                .map(String::as_str),
            Some("https://a.example")
        );
        assert_eq!(response.llm_response, "Ownership moves values.");
    }

    #[test]
    fn missing_llm_response_is_rejected() {
        let body = json!({"results": [], "query_time_ms": 1.0});
        assert!(serde_json::from_value::<SearchResponse>(body).is_err());
    }
}
