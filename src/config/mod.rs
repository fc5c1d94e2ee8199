use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

pub const DEFAULT_LLM_MODEL: &str = "claude-sonnet-4-20250514";
pub const DEFAULT_LLM_API_URL: &str = "https://api.anthropic.com/v1/messages";
pub const DEFAULT_ADMIN_EMAILS: &[&str] = &["admin@copyworx.io"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub llm: LlmConfig,
    pub auth: AuthConfig,
    pub usage: UsageConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub max_request_size_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// `postgres://...` or `memory://`. `None` leaves every persistence route answering 503.
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
    pub enable_query_logging: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// `None` leaves every AI route answering 500.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub model: String,
    pub api_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HS256 secret shared with the identity provider.
    #[serde(skip_serializing)]
    pub jwt_secret: Option<String>,
    pub admin_emails: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageConfig {
    pub log_queue_capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub cors_origins: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Server overrides
        if let Some(port) = env::var("COPYWORX_PORT")
            .ok()
            .or_else(|| env::var("PORT").ok())
            .and_then(|s| s.parse::<u16>().ok())
        {
            self.server.port = port;
        }
        if let Ok(v) = env::var("API_MAX_REQUEST_SIZE_BYTES") {
            self.server.max_request_size_bytes = v.parse().unwrap_or(self.server.max_request_size_bytes);
        }

        // Database overrides
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = non_empty(v);
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }
        if let Ok(v) = env::var("DATABASE_ENABLE_QUERY_LOGGING") {
            self.database.enable_query_logging = v.parse().unwrap_or(self.database.enable_query_logging);
        }

        // LLM overrides
        if let Ok(v) = env::var("ANTHROPIC_API_KEY") {
            self.llm.api_key = non_empty(v);
        }
        if let Ok(v) = env::var("LLM_MODEL") {
            self.llm.model = v;
        }
        if let Ok(v) = env::var("LLM_API_URL") {
            self.llm.api_url = v;
        }
        if let Ok(v) = env::var("LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = v.parse().unwrap_or(self.llm.timeout_secs);
        }

        // Auth overrides
        if let Ok(v) = env::var("AUTH_JWT_SECRET").or_else(|_| env::var("SUPABASE_JWT_SECRET")) {
            self.auth.jwt_secret = non_empty(v);
        }
        if let Ok(v) = env::var("ADMIN_EMAILS") {
            self.auth.admin_emails = split_list(&v);
        }

        // Usage overrides
        if let Ok(v) = env::var("USAGE_LOG_QUEUE_CAPACITY") {
            self.usage.log_queue_capacity = v.parse().unwrap_or(self.usage.log_queue_capacity);
        }

        // Security overrides
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = split_list(&v);
        }

        self
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                port: 3000,
                max_request_size_bytes: 10 * 1024 * 1024, // 10MB
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 10,
                connection_timeout: 30,
                enable_query_logging: true,
            },
            llm: LlmConfig::defaults(),
            auth: AuthConfig::defaults(),
            usage: UsageConfig { log_queue_capacity: 256 },
            security: SecurityConfig {
                cors_origins: vec!["http://localhost:3000".to_string(), "http://localhost:5173".to_string()],
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            server: ServerConfig {
                port: 3000,
                max_request_size_bytes: 5 * 1024 * 1024, // 5MB
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 20,
                connection_timeout: 10,
                enable_query_logging: true,
            },
            llm: LlmConfig::defaults(),
            auth: AuthConfig::defaults(),
            usage: UsageConfig { log_queue_capacity: 512 },
            security: SecurityConfig {
                cors_origins: vec!["https://staging.copyworx.io".to_string()],
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig {
                port: 3000,
                max_request_size_bytes: 2 * 1024 * 1024, // 2MB
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 50,
                connection_timeout: 5,
                enable_query_logging: false,
            },
            llm: LlmConfig::defaults(),
            auth: AuthConfig::defaults(),
            usage: UsageConfig { log_queue_capacity: 1024 },
            security: SecurityConfig {
                cors_origins: vec!["https://app.copyworx.io".to_string()],
            },
        }
    }

    pub fn is_admin(&self, email: Option<&str>) -> bool {
        match email {
            Some(email) => self
                .auth
                .admin_emails
                .iter()
                .any(|admin| admin.eq_ignore_ascii_case(email.trim())),
            None => false,
        }
    }
}

impl LlmConfig {
    fn defaults() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_LLM_MODEL.to_string(),
            api_url: DEFAULT_LLM_API_URL.to_string(),
            timeout_secs: 30,
        }
    }
}

impl AuthConfig {
    fn defaults() -> Self {
        Self {
            jwt_secret: None,
            admin_emails: DEFAULT_ADMIN_EMAILS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[macro_export]
macro_rules! is_production {
    () => {
        matches!($crate::config::CONFIG.environment, $crate::config::Environment::Production)
    };
}
