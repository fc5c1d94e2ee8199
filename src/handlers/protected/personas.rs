// handlers/protected/personas.rs - /api/personas handlers
use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::documents::require_project;
use super::{
    body_id, caller, no_fields, parse_id, parse_optional_id, pick, revalidate_optional, revalidate_required,
    ResourceQuery,
};
use crate::database::models::Persona;
use crate::filter::FilterData;
use crate::middleware::{ApiResponse, ApiResult, Deleted, Identity};
use crate::state::AppState;
use crate::validation::{optional_text, required_text, MAX_NAME_LENGTH, MAX_PROFILE_FIELD_LENGTH};

const PROFILE_FIELDS: &[&str] = &[
    "photo_url",
    "demographics",
    "psychographics",
    "pain_points",
    "language_patterns",
    "goals",
];

const UPDATABLE: &[&str] = &[
    "name",
    "photo_url",
    "demographics",
    "psychographics",
    "pain_points",
    "language_patterns",
    "goals",
    "project_id",
];

#[derive(Debug, Deserialize)]
pub struct CreatePersona {
    pub project_id: Option<String>,
    pub name: Option<String>,
    pub photo_url: Option<String>,
    pub demographics: Option<String>,
    pub psychographics: Option<String>,
    pub pain_points: Option<String>,
    pub language_patterns: Option<String>,
    pub goals: Option<String>,
}

impl CreatePersona {
    fn profile(&self) -> [(&'static str, Option<&str>); 6] {
        [
            ("photo_url", self.photo_url.as_deref()),
            ("demographics", self.demographics.as_deref()),
            ("psychographics", self.psychographics.as_deref()),
            ("pain_points", self.pain_points.as_deref()),
            ("language_patterns", self.language_patterns.as_deref()),
            ("goals", self.goals.as_deref()),
        ]
    }
}

/// GET /api/personas - By `?id`, by `?project_id`, or all of the caller's personas
pub async fn get(
    State(state): State<AppState>,
    identity: Identity,
    Query(query): Query<ResourceQuery>,
) -> ApiResult<Value> {
    let (db, user) = caller(&state, &identity)?;
    let repo = db.repo::<Persona>(user.user_id);

    if query.id.is_some() {
        let id = parse_id("id", query.id.as_deref())?;
        return Ok(ApiResponse::success(json!(repo.get(id).await?)));
    }
    let mut filter = FilterData::new().order("created_at asc");
    if let Some(project_id) = parse_optional_id("project_id", query.project_id.as_deref())? {
        filter = filter.eq("project_id", project_id);
    }
    Ok(ApiResponse::success(json!(repo.select_any(filter).await?)))
}

/// POST /api/personas - Create a persona
pub async fn post(
    State(state): State<AppState>,
    identity: Identity,
    body: Result<Json<CreatePersona>, JsonRejection>,
) -> ApiResult<Persona> {
    let (db, user) = caller(&state, &identity)?;
    let Json(body) = body?;

    let name = required_text("name", body.name.as_deref(), MAX_NAME_LENGTH)?;
    let mut row = Map::new();
    for (field, value) in body.profile() {
        optional_text(field, value, MAX_PROFILE_FIELD_LENGTH)?;
        row.insert(field.to_string(), json!(value));
    }
    let project_id = parse_optional_id("project_id", body.project_id.as_deref())?;
    if let Some(project_id) = project_id {
        require_project(db, user.user_id, project_id).await?;
    }
    row.insert("project_id".to_string(), json!(project_id));
    row.insert("name".to_string(), json!(name));

    let persona = db.repo::<Persona>(user.user_id).insert(row).await?;
    Ok(ApiResponse::created(persona))
}

/// PUT /api/personas - Partial update
pub async fn put(
    State(state): State<AppState>,
    identity: Identity,
    body: Result<Json<Map<String, Value>>, JsonRejection>,
) -> ApiResult<Persona> {
    let (db, user) = caller(&state, &identity)?;
    let Json(body) = body?;
    let id = body_id(&body)?;

    let mut changes = pick(&body, UPDATABLE);
    if changes.is_empty() {
        return Err(no_fields());
    }
    revalidate_required(&mut changes, "name", MAX_NAME_LENGTH)?;
    for field in PROFILE_FIELDS {
        revalidate_optional(&changes, field, MAX_PROFILE_FIELD_LENGTH)?;
    }
    if let Some(value) = changes.get("project_id").filter(|v| !v.is_null()) {
        let project_id = parse_id("project_id", value.as_str())?;
        require_project(db, user.user_id, project_id).await?;
    }

    let persona = db.repo::<Persona>(user.user_id).update(id, changes).await?;
    Ok(ApiResponse::success(persona))
}

/// DELETE /api/personas?id=
pub async fn delete(
    State(state): State<AppState>,
    identity: Identity,
    Query(query): Query<ResourceQuery>,
) -> ApiResult<Deleted> {
    let (db, user) = caller(&state, &identity)?;
    let id = parse_id("id", query.id.as_deref())?;
    db.repo::<Persona>(user.user_id).delete(id).await?;
    Ok(ApiResponse::success(Deleted::new(id)))
}
