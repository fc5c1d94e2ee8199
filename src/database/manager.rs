use std::sync::Arc;
use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use super::backend::Backend;
use super::memory::MemoryBackend;
use super::postgres::PostgresBackend;
use super::repository::{Model, Repository};
use crate::config::DatabaseConfig;
use crate::filter::FilterError;

/// Errors from the persistence layer
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Invalid database URL")]
    InvalidDatabaseUrl,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error("Malformed {table} row: {message}")]
    Decode { table: &'static str, message: String },

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Process-wide handle to the configured backend. Cheap to clone.
#[derive(Clone)]
pub struct Database {
    backend: Arc<dyn Backend>,
}

impl Database {
    /// Builds the backend named by `config.url`. The Postgres pool connects lazily,
    /// so an unreachable database surfaces on first use rather than at startup.
    pub fn connect(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        let raw = config
            .url
            .as_deref()
            .ok_or(DatabaseError::ConfigMissing("DATABASE_URL"))?;
        let url = url::Url::parse(raw).map_err(|_| DatabaseError::InvalidDatabaseUrl)?;

        match url.scheme() {
            "memory" => {
                info!("Using in-memory database backend");
                Ok(Self::memory())
            }
            "postgres" | "postgresql" => {
                let pool = PgPoolOptions::new()
                    .max_connections(config.max_connections)
                    .acquire_timeout(Duration::from_secs(config.connection_timeout))
                    .connect_lazy(raw)?;
                info!(
                    host = url.host_str().unwrap_or("localhost"),
                    max_connections = config.max_connections,
                    "Created database pool"
                );
                Ok(Self::from_backend(Arc::new(PostgresBackend::new(
                    pool,
                    config.enable_query_logging,
                ))))
            }
            _ => Err(DatabaseError::InvalidDatabaseUrl),
        }
    }

    pub fn memory() -> Self {
        Self::from_backend(Arc::new(MemoryBackend::new()))
    }

    pub fn from_backend(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    /// Repository whose every statement is scoped to `user_id`.
    pub fn repo<T: Model>(&self, user_id: Uuid) -> Repository<T> {
        Repository::new(self.backend.clone(), user_id)
    }

    pub async fn health_check(&self) -> Result<(), DatabaseError> {
        self.backend.health_check().await
    }
}
