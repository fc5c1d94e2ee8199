// HTTP API Error Types
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::{json, Value};

use crate::ai::LlmError;
use crate::database::DatabaseError;
use crate::validation::ValidationError;

/// HTTP API error; every handler failure ends up as one of these.
///
/// Serialized as `{ "error": <message>, "details"?: <string> }`.
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest { message: String, details: Option<String> },

    // 401 Unauthorized
    Unauthorized(String),

    // 403 Forbidden
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 408 Request Timeout (LLM call exceeded its budget)
    Timeout(String),

    // Upstream LLM failure, status mirrored
    Upstream { status: u16, message: String, details: Option<String> },

    // 500 Internal Server Error
    InternalServerError { message: String, details: Option<String> },

    // 503 Service Unavailable
    ServiceUnavailable { message: String, details: Option<String> },
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::BadRequest { .. } => 400,
            ApiError::Unauthorized(_) => 401,
            ApiError::Forbidden(_) => 403,
            ApiError::NotFound(_) => 404,
            ApiError::Timeout(_) => 408,
            ApiError::Upstream { status, .. } => *status,
            ApiError::InternalServerError { .. } => 500,
            ApiError::ServiceUnavailable { .. } => 503,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest { message, .. } => message,
            ApiError::Unauthorized(msg) => msg,
            ApiError::Forbidden(msg) => msg,
            ApiError::NotFound(msg) => msg,
            ApiError::Timeout(msg) => msg,
            ApiError::Upstream { message, .. } => message,
            ApiError::InternalServerError { message, .. } => message,
            ApiError::ServiceUnavailable { message, .. } => message,
        }
    }

    pub fn details(&self) -> Option<&str> {
        match self {
            ApiError::BadRequest { details, .. }
            | ApiError::Upstream { details, .. }
            | ApiError::InternalServerError { details, .. }
            | ApiError::ServiceUnavailable { details, .. } => details.as_deref(),
            _ => None,
        }
    }

    /// Convert to JSON response body
    pub fn to_json(&self) -> Value {
        let mut body = json!({ "error": self.message() });
        if let Some(details) = self.details() {
            body["details"] = json!(details);
        }
        body
    }
}

// Static constructor methods
impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest { message: message.into(), details: None }
    }

    pub fn validation(details: impl Into<String>) -> Self {
        ApiError::BadRequest {
            message: "Validation failed".to_string(),
            details: Some(details.into()),
        }
    }

    pub fn unauthorized() -> Self {
        ApiError::Unauthorized("Unauthorized".to_string())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn internal(message: impl Into<String>, details: impl Into<String>) -> Self {
        ApiError::InternalServerError {
            message: message.into(),
            details: Some(details.into()),
        }
    }

    /// Persistence backend not configured
    pub fn database_not_configured() -> Self {
        ApiError::ServiceUnavailable {
            message: "Database not configured".to_string(),
            details: Some("DATABASE_URL is not set; persistence routes are unavailable".to_string()),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::validation(err.0)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest {
            message: "Invalid JSON body".to_string(),
            details: Some(rejection.body_text()),
        }
    }
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound(msg) => ApiError::not_found(msg),
            DatabaseError::ConfigMissing(_) | DatabaseError::InvalidDatabaseUrl => ApiError::database_not_configured(),
            DatabaseError::Constraint(msg) => {
                tracing::warn!("Constraint violation: {}", msg);
                ApiError::BadRequest {
                    message: "Request conflicts with existing data".to_string(),
                    details: Some(msg),
                }
            }
            DatabaseError::Filter(e) => ApiError::BadRequest {
                message: "Invalid filter".to_string(),
                details: Some(e.to_string()),
            },
            DatabaseError::Sqlx(sqlx::Error::Database(db_err)) if db_err.code().as_deref().is_some_and(|c| c.starts_with("23")) => {
                // integrity_constraint_violation class
                ApiError::BadRequest {
                    message: "Request conflicts with existing data".to_string(),
                    details: Some(db_err.message().to_string()),
                }
            }
            other => {
                tracing::error!("Database error: {}", other);
                ApiError::internal("Database error", other.to_string())
            }
        }
    }
}

impl From<LlmError> for ApiError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::Timeout(after) => ApiError::Timeout(format!(
                "The AI request timed out after {} seconds. Please try again.",
                after.as_secs()
            )),
            LlmError::MissingApiKey => ApiError::internal(
                "AI service not configured",
                "ANTHROPIC_API_KEY is not set",
            ),
            LlmError::Upstream { status, body } => {
                tracing::warn!(status, "LLM provider error: {}", body);
                let message = match status {
                    429 => "Rate limit exceeded. Please wait a moment and try again.",
                    401 | 403 => "AI service authentication failed. Please contact support.",
                    500 | 503 => "AI service is temporarily unavailable. Please try again later.",
                    _ => "AI service error",
                };
                let status = if (400..=599).contains(&status) { status } else { 502 };
                ApiError::Upstream {
                    status,
                    message: message.to_string(),
                    details: Some(body),
                }
            }
            other => {
                tracing::error!("LLM error: {}", other);
                ApiError::internal("AI generation failed", other.to_string())
            }
        }
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_json())).into_response()
    }
}
