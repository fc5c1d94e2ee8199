use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use url::Url;
use uuid::Uuid;

use crate::database::models::{Document, Snippet};
use crate::usage::UsageSummary;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("{message} (HTTP {status})")]
    Http {
        status: u16,
        message: String,
        details: Option<String>,
    },

    #[error("network error: {0}")]
    Transport(String),

    #[error("unexpected response: {0}")]
    Decode(String),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("storage error: {0}")]
    Storage(String),
}

impl ClientError {
    /// Worth another attempt: network failures, timeouts, rate limits and provider outages.
    pub fn is_transient(&self) -> bool {
        match self {
            ClientError::Transport(_) => true,
            ClientError::Http { status, .. } => matches!(status, 408 | 429 | 500 | 502 | 503 | 504 | 529),
            _ => false,
        }
    }

    /// Text shown next to the retry button
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Http {
                message,
                details: Some(details),
                ..
            } => format!("{}: {}", message, details),
            other => other.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: String,
    details: Option<String>,
}

/// The AI writing tools, by route
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Tool {
    ToneShift,
    Shorten,
    Expand,
    RewriteChannel,
    GenerateTemplate,
    BrandAlignment,
    Headlines,
}

impl Tool {
    pub const ALL: [Tool; 7] = [
        Tool::ToneShift,
        Tool::Shorten,
        Tool::Expand,
        Tool::RewriteChannel,
        Tool::GenerateTemplate,
        Tool::BrandAlignment,
        Tool::Headlines,
    ];

    pub fn path(&self) -> &'static str {
        match self {
            Tool::ToneShift => "/api/tone-shift",
            Tool::Shorten => "/api/shorten",
            Tool::Expand => "/api/expand",
            Tool::RewriteChannel => "/api/rewrite-channel",
            Tool::GenerateTemplate => "/api/generate-template",
            Tool::BrandAlignment => "/api/brand-alignment",
            Tool::Headlines => "/api/headlines",
        }
    }

    /// Response field holding insertable HTML, for the tools that produce copy.
    pub fn copy_field(&self) -> Option<&'static str> {
        match self {
            Tool::ToneShift | Tool::RewriteChannel => Some("rewrittenText"),
            Tool::Shorten => Some("shortenedText"),
            Tool::Expand => Some("expandedText"),
            Tool::GenerateTemplate => Some("generatedCopy"),
            Tool::BrandAlignment | Tool::Headlines => None,
        }
    }
}

/// Server calls the client-side stores depend on
#[async_trait]
pub trait WorkspaceApi: Send + Sync {
    async fn call_tool(&self, tool: Tool, body: &Value) -> Result<Value, ClientError>;

    async fn fetch_usage(&self) -> Result<UsageSummary, ClientError>;

    async fn list_snippets(&self, project_id: Uuid) -> Result<Vec<Snippet>, ClientError>;

    async fn increment_snippet(&self, id: Uuid) -> Result<Snippet, ClientError>;

    async fn save_content(&self, document_id: Uuid, content: &str) -> Result<Document, ClientError>;
}

/// HTTP client for the CopyWorx API
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| ClientError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            base_url: Url::parse(base_url)?,
            token: None,
        })
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T, ClientError> {
        self.send(Method::GET, path, query, None).await
    }

    pub async fn post<T: DeserializeOwned>(&self, path: &str, body: &Value) -> Result<T, ClientError> {
        self.send(Method::POST, path, &[], Some(body)).await
    }

    pub async fn put<T: DeserializeOwned>(&self, path: &str, body: &Value) -> Result<T, ClientError> {
        self.send(Method::PUT, path, &[], Some(body)).await
    }

    pub async fn patch<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T, ClientError> {
        self.send(Method::PATCH, path, query, None).await
    }

    pub async fn delete(&self, path: &str, id: Uuid) -> Result<Value, ClientError> {
        self.send(Method::DELETE, path, &[("id", id.to_string())], None).await
    }

    async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> Result<T, ClientError> {
        let url = self.base_url.join(path)?;
        let mut request = self.http.request(method, url).query(query);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| ClientError::Transport(e.to_string()))?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(|e| ClientError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(error_from(status, &bytes));
        }
        serde_json::from_slice(&bytes).map_err(|e| ClientError::Decode(e.to_string()))
    }
}

fn error_from(status: StatusCode, body: &[u8]) -> ClientError {
    match serde_json::from_slice::<ErrorEnvelope>(body) {
        Ok(envelope) => ClientError::Http {
            status: status.as_u16(),
            message: envelope.error,
            details: envelope.details,
        },
        Err(_) => ClientError::Http {
            status: status.as_u16(),
            message: status.canonical_reason().unwrap_or("Request failed").to_string(),
            details: Some(String::from_utf8_lossy(body).into_owned()).filter(|s| !s.is_empty()),
        },
    }
}

#[async_trait]
impl WorkspaceApi for ApiClient {
    async fn call_tool(&self, tool: Tool, body: &Value) -> Result<Value, ClientError> {
        self.post(tool.path(), body).await
    }

    async fn fetch_usage(&self) -> Result<UsageSummary, ClientError> {
        self.get("/api/usage", &[]).await
    }

    async fn list_snippets(&self, project_id: Uuid) -> Result<Vec<Snippet>, ClientError> {
        self.get("/api/snippets", &[("project_id", project_id.to_string())]).await
    }

    async fn increment_snippet(&self, id: Uuid) -> Result<Snippet, ClientError> {
        self.patch("/api/snippets", &[("id", id.to_string())]).await
    }

    async fn save_content(&self, document_id: Uuid, content: &str) -> Result<Document, ClientError> {
        self.put("/api/documents", &json!({ "id": document_id, "content": content })).await
    }
}
