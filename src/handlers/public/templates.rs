// handlers/public/templates.rs - GET /api/templates handler
use axum::Json;

use crate::ai::templates::TemplateCatalog;

/// GET /api/templates - Template catalog (fields and sections, without prompt bodies)
pub async fn get() -> Json<&'static TemplateCatalog> {
    Json(TemplateCatalog::builtin())
}
