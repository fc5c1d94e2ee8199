#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde_json::Value;
use uuid::Uuid;

use copyworx_api::ai::{LlmClient, LlmCompletion, LlmError, LlmRequest};
use copyworx_api::auth::{mint_token, Claims};
use copyworx_api::config::AppConfig;
use copyworx_api::database::{Database, MemoryBackend};
use copyworx_api::{app, AppState};

pub const JWT_SECRET: &str = "integration-test-secret";
pub const SONNET: &str = "claude-sonnet-4-20250514";

/// One canned completion
#[derive(Debug, Clone)]
pub struct Reply {
    pub text: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            input_tokens: 100,
            output_tokens: 50,
        }
    }

    pub fn tokens(mut self, input: u32, output: u32) -> Self {
        self.input_tokens = input;
        self.output_tokens = output;
        self
    }
}

/// LLM stand-in: replays queued replies, then repeats the fallback.
pub struct ScriptedLlm {
    replies: Mutex<VecDeque<Reply>>,
    fallback: Reply,
    delay: Duration,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedLlm {
    pub fn new(fallback: Reply) -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            fallback,
            delay: Duration::ZERO,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn queue(self, reply: Reply) -> Self {
        self.replies.lock().unwrap().push_back(reply);
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmCompletion, LlmError> {
        self.prompts.lock().unwrap().push(request.prompt.clone());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let reply = self.replies.lock().unwrap().pop_front().unwrap_or_else(|| self.fallback.clone());
        Ok(LlmCompletion {
            text: reply.text,
            model: SONNET.to_string(),
            input_tokens: reply.input_tokens,
            output_tokens: reply.output_tokens,
        })
    }

    fn model(&self) -> &str {
        SONNET
    }
}

pub struct TestServer {
    pub base_url: String,
    pub memory: Option<Arc<MemoryBackend>>,
    pub llm: Option<Arc<ScriptedLlm>>,
    client: reqwest::Client,
}

pub struct ServerBuilder {
    config: AppConfig,
    database: bool,
    llm: Option<ScriptedLlm>,
}

impl ServerBuilder {
    pub fn without_database(mut self) -> Self {
        self.database = false;
        self
    }

    pub fn without_llm(mut self) -> Self {
        self.llm = None;
        self
    }

    pub fn llm(mut self, llm: ScriptedLlm) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn llm_timeout_secs(mut self, secs: u64) -> Self {
        self.config.llm.timeout_secs = secs;
        self
    }

    pub async fn start(self) -> Result<TestServer> {
        let memory = self.database.then(|| Arc::new(MemoryBackend::new()));
        let database = memory.clone().map(|m| Database::from_backend(m));
        let llm = self.llm.map(Arc::new);
        let state = AppState::new(self.config, database, llm.clone().map(|l| l as Arc<dyn LlmClient>));

        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port)).await?;
        let router = app(state);
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                eprintln!("test server stopped: {}", e);
            }
        });

        Ok(TestServer {
            base_url: format!("http://127.0.0.1:{}", port),
            memory,
            llm,
            client: reqwest::Client::new(),
        })
    }
}

/// A signed-in caller
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub token: String,
}

impl TestServer {
    pub fn builder() -> ServerBuilder {
        let mut config = AppConfig::development();
        config.auth.jwt_secret = Some(JWT_SECRET.to_string());
        config.auth.admin_emails = vec!["admin@copyworx.io".to_string()];
        ServerBuilder {
            config,
            database: true,
            llm: Some(ScriptedLlm::new(Reply::text("<p>Scripted copy</p>"))),
        }
    }

    /// Memory database and a scripted LLM
    pub async fn start() -> Result<Self> {
        Self::builder().start().await
    }

    pub fn user(&self) -> User {
        self.user_with_email(None)
    }

    pub fn user_with_email(&self, email: Option<&str>) -> User {
        let id = Uuid::new_v4();
        let claims = Claims::new(id, email.map(str::to_string), chrono::Duration::hours(1));
        let token = mint_token(&claims, Some(JWT_SECRET)).expect("mint token");
        User { id, token }
    }

    pub async fn request(
        &self,
        method: Method,
        path: &str,
        user: Option<&User>,
        body: Option<Value>,
    ) -> Result<(StatusCode, Value)> {
        let mut req = self.client.request(method, format!("{}{}", self.base_url, path));
        if let Some(user) = user {
            req = req.bearer_auth(&user.token);
        }
        if let Some(body) = body {
            req = req.json(&body);
        }
        let res = req.send().await?;
        let status = res.status();
        let text = res.text().await?;
        let json = if text.is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).with_context(|| format!("non-JSON body: {}", text))?
        };
        Ok((status, json))
    }

    pub async fn get(&self, path: &str, user: &User) -> Result<(StatusCode, Value)> {
        self.request(Method::GET, path, Some(user), None).await
    }

    pub async fn post(&self, path: &str, user: &User, body: Value) -> Result<(StatusCode, Value)> {
        self.request(Method::POST, path, Some(user), Some(body)).await
    }

    pub async fn put(&self, path: &str, user: &User, body: Value) -> Result<(StatusCode, Value)> {
        self.request(Method::PUT, path, Some(user), Some(body)).await
    }

    pub async fn patch(&self, path: &str, user: &User) -> Result<(StatusCode, Value)> {
        self.request(Method::PATCH, path, Some(user), None).await
    }

    pub async fn delete(&self, path: &str, user: &User) -> Result<(StatusCode, Value)> {
        self.request(Method::DELETE, path, Some(user), None).await
    }

    /// POST a project and return its id.
    pub async fn create_project(&self, user: &User, name: &str) -> Result<String> {
        let (status, body) = self.post("/api/projects", user, serde_json::json!({ "name": name })).await?;
        anyhow::ensure!(status == StatusCode::CREATED, "create project: {} {}", status, body);
        Ok(id_of(&body))
    }

    /// Usage logs are written off the request path; wait until `calls` have landed.
    pub async fn wait_for_usage(&self, user: &User, calls: i64) -> Result<Value> {
        for _ in 0..50 {
            let (status, body) = self.get("/api/usage", user).await?;
            anyhow::ensure!(status == StatusCode::OK, "usage: {} {}", status, body);
            if body["totalCalls"].as_i64() == Some(calls) {
                return Ok(body);
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        anyhow::bail!("usage never reached {} calls", calls)
    }
}

pub fn id_of(body: &Value) -> String {
    body["id"].as_str().unwrap_or_default().to_string()
}
