//! Context generation through the Anthropic Messages API.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

use ctxret_core::config::ContextSettings;
use ctxret_core::error::{Error, Result};
use ctxret_core::traits::ContextGenerator;
use ctxret_core::types::ChunkRecord;

use crate::build_prompt;

const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Clone)]
pub struct AnthropicConfig {
    pub api_url: String,
    pub api_key: String,
    pub model: String,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl AnthropicConfig {
    /// Take endpoint and model from `settings` and the key from the
    /// environment variable it names.
    pub fn from_settings(settings: &ContextSettings) -> Result<Self> {
        let api_key = std::env::var(&settings.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| Error::InvalidConfig(format!("{} is not set", settings.api_key_env)))?;
        Ok(Self {
            api_url: settings.api_url.clone(),
            api_key,
            model: settings.model.clone(),
            max_tokens: settings.max_tokens,
            timeout_secs: settings.timeout_secs,
        })
    }
}

#[derive(Debug)]
pub struct AnthropicContextGenerator {
    client: Client,
    config: AnthropicConfig,
}

#[derive(Debug, Serialize)]
pub(crate) struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(rename = "type")]
    error_type: String,
    message: String,
}

impl AnthropicContextGenerator {
    pub fn new(config: AnthropicConfig) -> Result<Self> {
        info!(endpoint = %config.api_url, model = %config.model, "initializing Anthropic context generator");
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert("anthropic-version", HeaderValue::from_static(ANTHROPIC_VERSION));
        headers.insert(
            "x-api-key",
            HeaderValue::from_str(&config.api_key)
                .map_err(|e| Error::InvalidConfig(format!("Invalid API key format: {}", e)))?,
        );
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| Error::InvalidConfig(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client, config })
    }

    pub fn from_settings(settings: &ContextSettings) -> Result<Self> {
        Self::new(AnthropicConfig::from_settings(settings)?)
    }

    pub(crate) fn request<'a>(&'a self, prompt: String) -> MessagesRequest<'a> {
        MessagesRequest {
            model: &self.config.model,
            max_tokens: self.config.max_tokens,
            messages: vec![Message { role: "user", content: prompt }],
        }
    }
}

/// First text block of a successful Messages API body, trimmed.
pub(crate) fn parse_response(body: &str) -> Result<String> {
    let response: MessagesResponse = serde_json::from_str(body)
        .map_err(|e| Error::ContextGeneration(format!("malformed response: {}", e)))?;
    let text = response
        .content
        .into_iter()
        .find_map(|block| match block {
            ContentBlock::Text { text } => Some(text),
            ContentBlock::Other => None,
        })
        .ok_or_else(|| Error::ContextGeneration("response has no text content".into()))?;
    let text = text.trim();
    if text.is_empty() {
        return Err(Error::ContextGeneration("response text is empty".into()));
    }
    Ok(text.to_string())
}

pub(crate) fn parse_error(status: reqwest::StatusCode, body: &str) -> Error {
    match serde_json::from_str::<ErrorResponse>(body) {
        Ok(err) => Error::ContextGeneration(format!("{} ({}): {}", status, err.error.error_type, err.error.message)),
        Err(_) => Error::ContextGeneration(format!("{}: {}", status, body)),
    }
}

#[async_trait]
impl ContextGenerator for AnthropicContextGenerator {
    async fn generate(&self, chunk: &ChunkRecord, document_text: &str) -> Result<String> {
        let request = self.request(build_prompt(document_text, &chunk.text));
        let response = self
            .client
            .post(&self.config.api_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::ContextGeneration(format!("request failed: {}", e)))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::ContextGeneration(format!("failed to read response: {}", e)))?;
        if !status.is_success() {
            return Err(parse_error(status, &body));
        }
        let context = parse_response(&body)?;
        debug!(chunk_id = chunk.chunk_id, chars = context.len(), "generated context");
        Ok(context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generator() -> AnthropicContextGenerator {
        AnthropicContextGenerator::new(AnthropicConfig {
            api_url: "http://127.0.0.1:9/v1/messages".into(),
            api_key: "test-key".into(),
            model: "claude-3-5-haiku-20241022".into(),
            max_tokens: 200,
            timeout_secs: 1,
        })
        .expect("generator")
    }

    #[test]
    fn request_body_matches_messages_api() {
        let g = generator();
        let body = serde_json::to_value(g.request("PROMPT".into())).expect("json");
        assert_eq!(
            body,
            serde_json::json!({
                "model": "claude-3-5-haiku-20241022",
                "max_tokens": 200,
                "messages": [{"role": "user", "content": "PROMPT"}]
            })
        );
    }

    #[test]
    fn parses_first_text_block() {
        let body = r#"{"id":"msg_1","type":"message","role":"assistant","content":[
            {"type":"thinking","thinking":"..."},
            {"type":"text","text":"  Chunk about Q2 revenue.\n"},
            {"type":"text","text":"ignored"}
        ],"stop_reason":"end_turn"}"#;
        assert_eq!(parse_response(body).expect("parse"), "Chunk about Q2 revenue.");
    }

    #[test]
    fn rejects_empty_or_malformed_bodies() {
        assert!(matches!(parse_response(r#"{"content":[]}"#), Err(Error::ContextGeneration(_))));
        assert!(matches!(parse_response(r#"{"content":[{"type":"text","text":"  "}]}"#), Err(Error::ContextGeneration(_))));
        assert!(matches!(parse_response("not json"), Err(Error::ContextGeneration(_))));
    }

    #[test]
    fn api_errors_carry_type_and_message() {
        let body = r#"{"type":"error","error":{"type":"overloaded_error","message":"Overloaded"}}"#;
        let err = parse_error(reqwest::StatusCode::from_u16(529).expect("status"), body);
        let msg = err.to_string();
        assert!(msg.contains("overloaded_error") && msg.contains("Overloaded"), "{msg}");
    }

    #[test]
    fn missing_api_key_is_a_config_error() {
        let settings = ContextSettings { api_key_env: "CTXRET_TEST_UNSET_KEY".into(), ..ContextSettings::default() };
        std::env::remove_var("CTXRET_TEST_UNSET_KEY");
        assert!(matches!(AnthropicConfig::from_settings(&settings), Err(Error::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn unreachable_endpoint_fails_generation() {
        let g = generator();
        let chunk = ChunkRecord::new(1, "text", 0, 1);
        let err = g.generate(&chunk, "document").await.expect_err("no server");
        assert!(matches!(err, Error::ContextGeneration(_)));
    }
}
