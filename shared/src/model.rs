//! Bedrock text generation client.

use async_trait::async_trait;
use aws_sdk_bedrockruntime::error::DisplayErrorContext;
use aws_sdk_bedrockruntime::primitives::Blob;
use aws_sdk_bedrockruntime::Client as BedrockClient;
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::{Config, Error, Result};

/// Bedrock API version expected by Anthropic models.
pub const ANTHROPIC_VERSION: &str = "bedrock-2023-05-31";

/// Text used when a messages response has no text block.
pub const NO_TEXT: &str = "No response text found";

/// A model that turns a prompt into a textual answer.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// Anthropic messages request body.
#[derive(Debug, Serialize)]
pub struct MessagesRequest<'a> {
    pub anthropic_version: &'static str,
    pub max_tokens: u32,
    pub temperature: f32,
    pub messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
pub struct Message<'a> {
    pub role: &'static str,
    pub content: &'a str,
}

impl<'a> MessagesRequest<'a> {
    /// Single-turn user request.
    pub fn user(prompt: &'a str, max_tokens: u32, temperature: f32) -> Self {
        Self {
            anthropic_version: ANTHROPIC_VERSION,
            max_tokens,
            temperature,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
        }
    }
}

/// `ModelClient` backed by Bedrock `InvokeModel`.
pub struct BedrockModel {
    client: BedrockClient,
    model_id: String,
    max_tokens: u32,
    temperature: f32,
}

impl BedrockModel {
    pub fn new(client: BedrockClient, config: &Config) -> Self {
        Self {
            client,
            model_id: config.model_id.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        }
    }
}

#[async_trait]
impl ModelClient for BedrockModel {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let request = MessagesRequest::user(prompt, self.max_tokens, self.temperature);
        let payload = serde_json::to_vec(&request)?;

        info!(model_id = %self.model_id, prompt_len = prompt.len(), "Invoking Bedrock model");

        let response = self
            .client
            .invoke_model()
            .model_id(&self.model_id)
            .content_type("application/json")
            .accept("application/json")
            .body(Blob::new(payload))
            .send()
            .await
            .map_err(|e| Error::Aws(format!("Failed to invoke model: {}", DisplayErrorContext(e))))?;

        let body: Value = serde_json::from_slice(response.body().as_ref())?;

        Ok(extract_text(&body))
    }
}

/// Pull the answer text out of a model response body.
///
/// Messages responses yield the first content block's text. Older completion
/// responses yield `completion`. Anything else is returned as JSON text.
pub fn extract_text(body: &Value) -> String {
    let Some(object) = body.as_object() else {
        return body.to_string();
    };

    if let Some(content) = object.get("content").and_then(Value::as_array) {
        return content
            .first()
            .and_then(|block| block.get("text"))
            .and_then(Value::as_str)
            .unwrap_or(NO_TEXT)
            .to_string();
    }

    object
        .get("completion")
        .and_then(Value::as_str)
        .map(String::from)
        .unwrap_or_else(|| body.to_string())
}
