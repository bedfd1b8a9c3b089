//! Invocation event and response envelope.

use serde::Serialize;
use serde_json::Value;

use crate::store::TableData;
use crate::{Error, Result};

/// Message returned when the event carries no query.
pub const MISSING_QUERY: &str = "No userQuery provided in event";

/// Pull the user's query out of the invocation event.
///
/// Accepts both a direct payload (`{"userQuery": ...}`) and an AppSync
/// resolver event (`{"arguments": {"userQuery": ...}}`). The top-level key
/// takes precedence.
pub fn extract_user_query(event: &Value) -> Result<String> {
    let query = event
        .get("userQuery")
        .or_else(|| event.get("arguments").and_then(|args| args.get("userQuery")))
        .ok_or_else(|| Error::Validation(MISSING_QUERY.to_string()))?;

    query
        .as_str()
        .map(String::from)
        .ok_or_else(|| Error::Validation("userQuery must be a string".to_string()))
}

/// Lambda response envelope with a JSON-encoded body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvokeResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub body: String,
}

impl InvokeResponse {
    /// Wrap a serializable body with the given status code.
    pub fn json<T: Serialize>(status_code: u16, body: &T) -> Result<Self> {
        Ok(Self {
            status_code,
            body: serde_json::to_string(body)?,
        })
    }

    /// Error envelope for a failed request.
    pub fn from_error(err: &Error) -> Self {
        let body = serde_json::json!({ "error": err.to_string() });
        Self {
            status_code: err.status_code(),
            body: body.to_string(),
        }
    }
}

/// Body of a successful analysis.
#[derive(Debug, Serialize)]
pub struct AnalysisBody<'a> {
    pub user_query: &'a str,
    pub dynamodb_data: &'a TableData,
    pub bedrock_context: &'a str,
}
