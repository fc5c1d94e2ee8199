// handlers/public/health.rs - GET /health handler
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::state::AppState;

/// GET /health - Liveness plus database reachability; 503 when the database is down
pub async fn get(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();
    let usage = state.usage.stats();
    let llm = if state.llm.is_some() { "configured" } else { "not_configured" };

    let Some(db) = state.database.as_ref() else {
        return (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "timestamp": now,
                "database": "not_configured",
                "llm": llm,
                "usage_log": usage,
            })),
        );
    };

    match db.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "timestamp": now,
                "database": db.backend().backend_name(),
                "llm": llm,
                "usage_log": usage,
            })),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "degraded",
                "timestamp": now,
                "error": "database unavailable",
                "details": e.to_string(),
                "usage_log": usage,
            })),
        ),
    }
}
