//! Result Formatter — structural validation of the reasoning service's final answer.
//!
//! Strictly structural: required fields, types, and the recommendation enum are checked;
//! unknown fields are dropped. Nothing is corrected or inferred.

use serde_json::Value;
use thiserror::Error;

use crate::llm_client::strip_json_fences;
use crate::models::analysis::AnalysisResult;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct SchemaViolation(pub String);

/// Validates a parsed JSON value as an `AnalysisResult`.
pub fn normalize(raw: Value) -> Result<AnalysisResult, SchemaViolation> {
    serde_json::from_value(raw).map_err(|e| SchemaViolation(e.to_string()))
}

/// Parses and validates a final-answer text block.
///
/// Markdown code fences are stripped. If the model wrapped the JSON object in prose,
/// the outermost `{...}` span is tried before giving up.
pub fn normalize_text(text: &str) -> Result<AnalysisResult, SchemaViolation> {
    let body = strip_json_fences(text);

    let value = match serde_json::from_str::<Value>(body) {
        Ok(value) => value,
        Err(e) => match extract_object(body) {
            Some(inner) => serde_json::from_str::<Value>(inner)
                .map_err(|_| SchemaViolation(format!("final answer is not valid JSON: {e}")))?,
            None => return Err(SchemaViolation(format!("final answer is not valid JSON: {e}"))),
        },
    };

    normalize(value)
}

fn extract_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}
