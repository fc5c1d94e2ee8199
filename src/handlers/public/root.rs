// handlers/public/root.rs - GET / handler
use axum::Json;
use serde_json::{json, Value};

/// GET / - Service name, version and route map
pub async fn get() -> Json<Value> {
    Json(json!({
        "name": "CopyWorx API",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Copywriting workspace backend with AI-assisted writing tools",
        "endpoints": {
            "health": "/health (public)",
            "templates": "/api/templates (public)",
            "workspace": "/api/projects, /api/documents, /api/documents/versions, /api/folders (protected)",
            "library": "/api/personas, /api/brand-voices, /api/snippets (protected)",
            "account": "/api/user-settings, /api/usage, /api/sync, /api/migrate (protected)",
            "ai": "/api/tone-shift, /api/shorten, /api/expand, /api/rewrite-channel, /api/generate-template, /api/brand-alignment, /api/headlines (protected)",
            "admin": "/api/admin/usage (restricted to admin e-mails)",
        }
    }))
}
