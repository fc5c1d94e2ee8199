// handlers/protected/brand_voices.rs - /api/brand-voices handlers
use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::documents::require_project;
use super::{
    body_id, caller, no_fields, parse_id, parse_optional_id, pick, revalidate_optional, revalidate_required,
    revalidate_string_list, ResourceQuery,
};
use crate::database::models::BrandVoice;
use crate::filter::FilterData;
use crate::middleware::{ApiResponse, ApiResult, Deleted, Identity};
use crate::state::AppState;
use crate::validation::{optional_text, required_text, MAX_NAME_LENGTH, MAX_PROFILE_FIELD_LENGTH};

const LIST_FIELDS: &[&str] = &["approved_phrases", "forbidden_words", "brand_values"];

const UPDATABLE: &[&str] = &[
    "brand_name",
    "brand_tone",
    "approved_phrases",
    "forbidden_words",
    "brand_values",
    "mission_statement",
    "project_id",
];

#[derive(Debug, Deserialize)]
pub struct CreateBrandVoice {
    pub project_id: Option<String>,
    pub brand_name: Option<String>,
    pub brand_tone: Option<String>,
    #[serde(default)]
    pub approved_phrases: Vec<String>,
    #[serde(default)]
    pub forbidden_words: Vec<String>,
    #[serde(default)]
    pub brand_values: Vec<String>,
    pub mission_statement: Option<String>,
}

/// GET /api/brand-voices - By `?id`, by `?project_id`, or all of the caller's brand voices
pub async fn get(
    State(state): State<AppState>,
    identity: Identity,
    Query(query): Query<ResourceQuery>,
) -> ApiResult<Value> {
    let (db, user) = caller(&state, &identity)?;
    let repo = db.repo::<BrandVoice>(user.user_id);

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

/// POST /api/brand-voices - Create a brand voice
pub async fn post(
    State(state): State<AppState>,
    identity: Identity,
    body: Result<Json<CreateBrandVoice>, JsonRejection>,
) -> ApiResult<BrandVoice> {
    let (db, user) = caller(&state, &identity)?;
    let Json(body) = body?;

    let brand_name = required_text("brand_name", body.brand_name.as_deref(), MAX_NAME_LENGTH)?;
    optional_text("brand_tone", body.brand_tone.as_deref(), MAX_PROFILE_FIELD_LENGTH)?;
    optional_text("mission_statement", body.mission_statement.as_deref(), MAX_PROFILE_FIELD_LENGTH)?;
    let project_id = parse_optional_id("project_id", body.project_id.as_deref())?;
    if let Some(project_id) = project_id {
        require_project(db, user.user_id, project_id).await?;
    }

    let voice = db
        .repo::<BrandVoice>(user.user_id)
        .insert(json!({
            "project_id": project_id,
            "brand_name": brand_name,
            "brand_tone": body.brand_tone,
            "approved_phrases": body.approved_phrases,
            "forbidden_words": body.forbidden_words,
            "brand_values": body.brand_values,
            "mission_statement": body.mission_statement,
        }))
        .await?;
    Ok(ApiResponse::created(voice))
}

/// PUT /api/brand-voices - Partial update
pub async fn put(
    State(state): State<AppState>,
    identity: Identity,
    body: Result<Json<Map<String, Value>>, JsonRejection>,
) -> ApiResult<BrandVoice> {
    let (db, user) = caller(&state, &identity)?;
    let Json(body) = body?;
    let id = body_id(&body)?;

    let mut changes = pick(&body, UPDATABLE);
    if changes.is_empty() {
        return Err(no_fields());
    }
    revalidate_required(&mut changes, "brand_name", MAX_NAME_LENGTH)?;
    revalidate_optional(&changes, "brand_tone", MAX_PROFILE_FIELD_LENGTH)?;
    revalidate_optional(&changes, "mission_statement", MAX_PROFILE_FIELD_LENGTH)?;
    for field in LIST_FIELDS {
        revalidate_string_list(&changes, field)?;
    }
    if let Some(value) = changes.get("project_id").filter(|v| !v.is_null()) {
        let project_id = parse_id("project_id", value.as_str())?;
        require_project(db, user.user_id, project_id).await?;
    }

    let voice = db.repo::<BrandVoice>(user.user_id).update(id, changes).await?;
    Ok(ApiResponse::success(voice))
}

/// DELETE /api/brand-voices?id=
pub async fn delete(
    State(state): State<AppState>,
    identity: Identity,
    Query(query): Query<ResourceQuery>,
) -> ApiResult<Deleted> {
    let (db, user) = caller(&state, &identity)?;
    let id = parse_id("id", query.id.as_deref())?;
    db.repo::<BrandVoice>(user.user_id).delete(id).await?;
    Ok(ApiResponse::success(Deleted::new(id)))
}
