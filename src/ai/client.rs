//! Anthropic messages API client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Clone, Error)]
pub enum LlmError {
    #[error("missing api key: ANTHROPIC_API_KEY environment variable not set")]
    MissingApiKey,
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("upstream http {status}: {body}")]
    Upstream { status: u16, body: String },
    #[error("network error: {0}")]
    Transport(String),
    #[error("json error: {0}")]
    Serde(String),
    #[error("model returned no text")]
    EmptyResponse,
}

/// One completion call: a system prompt and a single user message.
#[derive(Debug, Clone)]
pub struct LlmRequest {
    pub system: String,
    pub prompt: String,
    pub max_tokens: u32,
    pub timeout: Duration,
}

impl LlmRequest {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
    pub const DEFAULT_MAX_TOKENS: u32 = 2000;

    pub fn new(system: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            prompt: prompt.into(),
            max_tokens: Self::DEFAULT_MAX_TOKENS,
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// First text block of a completion plus the token counts used for billing.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmCompletion {
    pub text: String,
    pub model: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmCompletion, LlmError>;

    /// Model identifier sent with every request
    fn model(&self) -> &str;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<Message>,
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
struct MessagesResponse {
    content: Vec<ContentBlock>,
    model: String,
    usage: Usage,
}

#[derive(Debug, Default, Deserialize)]
struct Usage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

impl MessagesResponse {
    fn first_text(&self) -> Option<&str> {
        self.content.iter().find_map(|block| match block {
            ContentBlock::Text { text } => Some(text.as_str()),
            ContentBlock::Other => None,
        })
    }
}

/// Client for the hosted messages endpoint
#[derive(Debug, Clone)]
pub struct AnthropicClient {
    http: Client,
    api_key: String,
    model: String,
    api_url: String,
}

impl AnthropicClient {
    const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

    pub fn new(api_key: String, model: String, api_url: String) -> Result<Self, LlmError> {
        if api_key.trim().is_empty() {
            return Err(LlmError::MissingApiKey);
        }
        let http = Client::builder()
            .connect_timeout(Self::CONNECT_TIMEOUT)
            .user_agent(concat!("copyworx-api/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| LlmError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            api_key,
            model,
            api_url,
        })
    }
}

#[async_trait]
impl LlmClient for AnthropicClient {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmCompletion, LlmError> {
        let body = MessagesRequest {
            model: &self.model,
            max_tokens: request.max_tokens,
            system: &request.system,
            messages: vec![Message {
                role: "user".to_string(),
                content: request.prompt.clone(),
            }],
        };

        let res = self
            .http
            .post(&self.api_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Transport(e.to_string()))?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(LlmError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let parsed = res
            .json::<MessagesResponse>()
            .await
            .map_err(|e| LlmError::Serde(e.to_string()))?;
        let text = parsed.first_text().ok_or(LlmError::EmptyResponse)?.to_string();
        Ok(LlmCompletion {
            text,
            model: parsed.model,
            input_tokens: parsed.usage.input_tokens,
            output_tokens: parsed.usage.output_tokens,
        })
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Extract JSON from a string that might contain markdown code blocks
pub fn extract_json(text: &str) -> &str {
    let text = text.trim();

    if let Some(start) = text.find("```json") {
        let content_start = start + 7;
        if let Some(end) = text[content_start..].find("```") {
            return text[content_start..content_start + end].trim();
        }
    }

    if let Some(start) = text.find("```") {
        let content_start = start + 3;
        // Skip past any language identifier on the same line
        let content_start = text[content_start..]
            .find('\n')
            .map(|i| content_start + i + 1)
            .unwrap_or(content_start);
        if let Some(end) = text[content_start..].find("```") {
            return text[content_start..content_start + end].trim();
        }
    }

    // Bare object somewhere inside prose
    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if end > start => &text[start..=end],
        _ => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_takes_first_text_block() {
        let parsed: MessagesResponse = serde_json::from_str(
            r#"{"id":"msg_1","model":"claude-sonnet-4-20250514","content":[{"type":"thinking"},{"type":"text","text":" <p>Hi</p> "}],"usage":{"input_tokens":12,"output_tokens":3}}"#,
        )
        .unwrap();
        assert_eq!(parsed.first_text(), Some(" <p>Hi</p> "));
        assert_eq!(parsed.usage.input_tokens, 12);
    }

    #[test]
    fn empty_key_is_rejected() {
        let result = AnthropicClient::new("  ".into(), "m".into(), "http://localhost".into());
        assert!(matches!(result, Err(LlmError::MissingApiKey)));
    }

    #[test]
    fn extract_json_variants() {
        assert_eq!(extract_json(r#"{"key": "value"}"#), r#"{"key": "value"}"#);
        assert_eq!(extract_json("Here's the JSON:\n```json\n{\"a\": 1}\n```"), r#"{"a": 1}"#);
        assert_eq!(extract_json("```\n{\"a\": 1}\n```"), r#"{"a": 1}"#);
        assert_eq!(extract_json("Sure! {\"score\": 80} hope it helps"), r#"{"score": 80}"#);
    }
}
