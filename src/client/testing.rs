use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};
use uuid::Uuid;

use super::api::{ClientError, Tool, WorkspaceApi};
use crate::database::models::{Document, Snippet};
use crate::usage::UsageSummary;

/// In-memory stand-in for the server, scripted per test
#[derive(Default)]
pub struct ScriptedApi {
    tool_outcomes: Mutex<VecDeque<Result<Value, ClientError>>>,
    tool_calls: AtomicUsize,
    usage_calls: AtomicUsize,
    usage_delay: Option<Duration>,
    usage_fails: bool,
    snippets: Mutex<Vec<Snippet>>,
}

impl ScriptedApi {
    pub fn push_tool(&self, outcome: Result<Value, ClientError>) {
        self.tool_outcomes.lock().unwrap().push_back(outcome);
    }

    pub fn tool_calls(&self) -> usize {
        self.tool_calls.load(Ordering::SeqCst)
    }

    pub fn with_usage_delay(mut self, delay: Duration) -> Self {
        self.usage_delay = Some(delay);
        self
    }

    pub fn failing_usage(mut self) -> Self {
        self.usage_fails = true;
        self
    }

    pub fn usage_calls(&self) -> usize {
        self.usage_calls.load(Ordering::SeqCst)
    }

    pub fn set_snippets(&self, snippets: Vec<Snippet>) {
        *self.snippets.lock().unwrap() = snippets;
    }

    pub fn snippet_usage(&self, id: Uuid) -> Option<i64> {
        self.snippets.lock().unwrap().iter().find(|s| s.id == id).map(|s| s.usage_count)
    }
}

pub fn snippet(project_id: Uuid, name: &str, content: &str) -> Snippet {
    Snippet {
        id: Uuid::new_v4(),
        project_id,
        user_id: Uuid::new_v4(),
        name: name.to_string(),
        content: content.to_string(),
        description: None,
        tags: Vec::new(),
        usage_count: 0,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn not_found(what: &str) -> ClientError {
    ClientError::Http {
        status: 404,
        message: format!("{} not found", what),
        details: None,
    }
}

#[async_trait]
impl WorkspaceApi for ScriptedApi {
    async fn call_tool(&self, _tool: Tool, _body: &Value) -> Result<Value, ClientError> {
        self.tool_calls.fetch_add(1, Ordering::SeqCst);
        let next = self.tool_outcomes.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(json!({})))
    }

    async fn fetch_usage(&self) -> Result<UsageSummary, ClientError> {
        self.usage_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.usage_delay {
            tokio::time::sleep(delay).await;
        }
        if self.usage_fails {
            return Err(ClientError::Transport("connection refused".into()));
        }
        Ok(UsageSummary::new(None, None))
    }

    async fn list_snippets(&self, project_id: Uuid) -> Result<Vec<Snippet>, ClientError> {
        let snippets = self.snippets.lock().unwrap();
        Ok(snippets.iter().filter(|s| s.project_id == project_id).cloned().collect())
    }

    async fn increment_snippet(&self, id: Uuid) -> Result<Snippet, ClientError> {
        let mut snippets = self.snippets.lock().unwrap();
        let snippet = snippets.iter_mut().find(|s| s.id == id).ok_or_else(|| not_found("Snippet"))?;
        snippet.usage_count += 1;
        Ok(snippet.clone())
    }

    async fn save_content(&self, _document_id: Uuid, _content: &str) -> Result<Document, ClientError> {
        Err(not_found("Document"))
    }
}
