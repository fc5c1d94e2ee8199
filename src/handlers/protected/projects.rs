// handlers/protected/projects.rs - /api/projects handlers
use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::info;

use super::{body_id, caller, no_fields, parse_id, pick, revalidate_required, ResourceQuery};
use crate::database::models::Project;
use crate::filter::FilterData;
use crate::middleware::{ApiResponse, ApiResult, Deleted, Identity};
use crate::state::AppState;
use crate::validation::{required_text, MAX_NAME_LENGTH};

const UPDATABLE: &[&str] = &["name"];

#[derive(Debug, Deserialize)]
pub struct CreateProject {
    pub name: Option<String>,
}

/// GET /api/projects - One project by `?id`, else every project of the caller
pub async fn get(
    State(state): State<AppState>,
    identity: Identity,
    Query(query): Query<ResourceQuery>,
) -> ApiResult<Value> {
    let (db, user) = caller(&state, &identity)?;
    let repo = db.repo::<Project>(user.user_id);

    if query.id.is_some() {
        let id = parse_id("id", query.id.as_deref())?;
        let project = repo.get(id).await?;
        return Ok(ApiResponse::success(json!(project)));
    }

    let projects = repo.select_any(FilterData::new().order("created_at asc")).await?;
    Ok(ApiResponse::success(json!(projects)))
}

/// POST /api/projects - Create a project
pub async fn post(
    State(state): State<AppState>,
    identity: Identity,
    body: Result<Json<CreateProject>, JsonRejection>,
) -> ApiResult<Project> {
    let (db, user) = caller(&state, &identity)?;
    let Json(body) = body?;
    let name = required_text("name", body.name.as_deref(), MAX_NAME_LENGTH)?;

    let project = db.repo::<Project>(user.user_id).insert(json!({ "name": name })).await?;
    info!(user_id = %user.user_id, project_id = %project.id, "Project created");
    Ok(ApiResponse::created(project))
}

/// PUT /api/projects - Rename a project; `id` travels in the body
pub async fn put(
    State(state): State<AppState>,
    identity: Identity,
    body: Result<Json<Map<String, Value>>, JsonRejection>,
) -> ApiResult<Project> {
    let (db, user) = caller(&state, &identity)?;
    let Json(body) = body?;
    let id = body_id(&body)?;

    let mut changes = pick(&body, UPDATABLE);
    if changes.is_empty() {
        return Err(no_fields());
    }
    revalidate_required(&mut changes, "name", MAX_NAME_LENGTH)?;

    let project = db.repo::<Project>(user.user_id).update(id, changes).await?;
    Ok(ApiResponse::success(project))
}

/// DELETE /api/projects?id= - Delete a project and, through the schema, everything in it
pub async fn delete(
    State(state): State<AppState>,
    identity: Identity,
    Query(query): Query<ResourceQuery>,
) -> ApiResult<Deleted> {
    let (db, user) = caller(&state, &identity)?;
    let id = parse_id("id", query.id.as_deref())?;

    let removed = db.repo::<Project>(user.user_id).delete(id).await?;
    info!(user_id = %user.user_id, project_id = %id, removed, "Project deleted");
    Ok(ApiResponse::success(Deleted::new(id)))
}
