// handlers/protected/migrate.rs - POST /api/migrate handler
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;

use super::caller;
use crate::middleware::{ApiResponse, ApiResult, Identity};
use crate::migration::{Importer, LegacyWorkspace, MigrationReport};
use crate::state::AppState;

/// POST /api/migrate - Import a legacy local workspace; 207 when some items failed
pub async fn post(
    State(state): State<AppState>,
    identity: Identity,
    body: Result<Json<LegacyWorkspace>, JsonRejection>,
) -> ApiResult<MigrationReport> {
    let (db, user) = caller(&state, &identity)?;
    let Json(workspace) = body?;

    let report = Importer::new(db, user.user_id).run(workspace).await;
    let partial = report.is_partial();
    Ok(ApiResponse::multi_status(report, partial))
}
