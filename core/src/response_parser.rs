//! Recovers a JSON object embedded in free-form model output.
//!
//! Models asked to "respond as JSON" routinely wrap the object in prose or
//! code fences. The object is taken to span from the first `{` to the last
//! `}`; anything outside is ignored. Required fields are never filled with
//! placeholders: a missing one fails the parse.

use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("no JSON object found in response")]
    NoEmbeddedObject,
    #[error("malformed JSON in response: {source}")]
    MalformedJson {
        #[source]
        source: serde_json::Error,
    },
    #[error("unexpected JSON structure in response: {source}")]
    InvalidShape {
        #[source]
        source: serde_json::Error,
    },
}

/// The substring from the first `{` through the last `}`.
pub fn extract_json_object(raw: &str) -> Result<&str, ParseError> {
    let start = raw.find('{').ok_or(ParseError::NoEmbeddedObject)?;
    let end = raw.rfind('}').ok_or(ParseError::NoEmbeddedObject)?;
    if end < start {
        return Err(ParseError::NoEmbeddedObject);
    }
    Ok(&raw[start..=end])
}

/// Parses the embedded object into `T`. Syntax errors and shape mismatches
/// are reported separately.
pub fn extract_structured<T: DeserializeOwned>(raw: &str) -> Result<T, ParseError> {
    let json = extract_json_object(raw)?;
    let value: serde_json::Value = serde_json::from_str(json).map_err(|source| {
        debug!("model output is not valid JSON: {source}");
        ParseError::MalformedJson { source }
    })?;
    serde_json::from_value(value).map_err(|source| {
        debug!("model output has the wrong shape: {source}");
        ParseError::InvalidShape { source }
    })
}
