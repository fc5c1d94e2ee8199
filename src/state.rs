use std::sync::Arc;

use tracing::{info, warn};

use crate::ai::{AnthropicClient, LlmClient, LlmError};
use crate::config::AppConfig;
use crate::database::{Database, DatabaseError};
use crate::error::ApiError;
use crate::usage::UsageRecorder;

/// Read-only state shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub database: Option<Database>,
    pub llm: Option<Arc<dyn LlmClient>>,
    pub usage: UsageRecorder,
}

impl AppState {
    /// Wires the configured backends. Must run inside a Tokio runtime (the usage writer is spawned).
    pub fn from_config(config: AppConfig) -> Result<Self, DatabaseError> {
        let database = match config.database.url {
            Some(_) => Some(Database::connect(&config.database)?),
            None => {
                warn!("DATABASE_URL not set; persistence routes will answer 503");
                None
            }
        };

        let llm: Option<Arc<dyn LlmClient>> = match config.llm.api_key.clone() {
            Some(key) => match AnthropicClient::new(key, config.llm.model.clone(), config.llm.api_url.clone()) {
                Ok(client) => {
                    info!(model = %config.llm.model, "LLM client ready");
                    Some(Arc::new(client))
                }
                Err(e) => {
                    warn!(error = %e, "LLM client unavailable");
                    None
                }
            },
            None => {
                warn!("ANTHROPIC_API_KEY not set; AI routes will answer 500");
                None
            }
        };

        let usage = UsageRecorder::spawn(database.clone(), config.usage.log_queue_capacity);
        Ok(Self {
            config: Arc::new(config),
            database,
            llm,
            usage,
        })
    }

    /// Explicit wiring, used by tests and the CLI.
    pub fn new(config: AppConfig, database: Option<Database>, llm: Option<Arc<dyn LlmClient>>) -> Self {
        let usage = UsageRecorder::spawn(database.clone(), config.usage.log_queue_capacity);
        Self {
            config: Arc::new(config),
            database,
            llm,
            usage,
        }
    }

    /// The persistence backend, or 503
    pub fn database(&self) -> Result<&Database, ApiError> {
        self.database.as_ref().ok_or_else(ApiError::database_not_configured)
    }

    /// The LLM client, or 500
    pub fn llm(&self) -> Result<&dyn LlmClient, ApiError> {
        self.llm
            .as_deref()
            .ok_or_else(|| ApiError::from(LlmError::MissingApiKey))
    }

    pub fn llm_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.config.llm.timeout_secs)
    }
}
