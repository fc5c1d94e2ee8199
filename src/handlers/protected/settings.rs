// handlers/protected/settings.rs - /api/user-settings handlers
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde_json::{Map, Value};

use super::documents::require_project;
use super::{caller, no_fields, parse_id, pick};
use crate::database::models::UserSettings;
use crate::filter::FilterData;
use crate::middleware::{ApiResponse, ApiResult, Identity};
use crate::state::AppState;
use crate::validation::ValidationError;

const UPDATABLE: &[&str] = &["active_project_id", "settings"];

/// GET /api/user-settings - The caller's settings, or empty defaults when none were saved
pub async fn get(State(state): State<AppState>, identity: Identity) -> ApiResult<UserSettings> {
    let (db, user) = caller(&state, &identity)?;
    let settings = db
        .repo::<UserSettings>(user.user_id)
        .select_one(FilterData::new())
        .await?
        .unwrap_or(UserSettings {
            user_id: user.user_id,
            active_project_id: None,
            settings: Map::new(),
            updated_at: None,
        });
    Ok(ApiResponse::success(settings))
}

/// PUT /api/user-settings - Upsert; columns left out of the body keep their stored value
pub async fn put(
    State(state): State<AppState>,
    identity: Identity,
    body: Result<Json<Map<String, Value>>, JsonRejection>,
) -> ApiResult<UserSettings> {
    let (db, user) = caller(&state, &identity)?;
    let Json(body) = body?;

    let changes = pick(&body, UPDATABLE);
    if changes.is_empty() {
        return Err(no_fields());
    }
    if let Some(settings) = changes.get("settings") {
        if !settings.is_object() {
            return Err(ValidationError::new("settings must be an object").into());
        }
    }
    if let Some(value) = changes.get("active_project_id").filter(|v| !v.is_null()) {
        let project_id = parse_id("active_project_id", value.as_str())?;
        require_project(db, user.user_id, project_id).await?;
    }

    let settings = db.repo::<UserSettings>(user.user_id).upsert(changes).await?;
    Ok(ApiResponse::success(settings))
}
