// handlers/protected/snippets.rs - /api/snippets handlers
use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::documents::require_project;
use super::{
    body_id, caller, no_fields, parse_id, parse_optional_id, pick, revalidate_optional, revalidate_required,
    revalidate_string_list,
};
use crate::database::models::Snippet;
use crate::error::ApiError;
use crate::filter::FilterData;
use crate::middleware::{ApiResponse, ApiResult, Deleted, Identity};
use crate::state::AppState;
use crate::validation::{
    optional_text, required_text, MAX_NAME_LENGTH, MAX_SNIPPET_CONTENT_LENGTH, MAX_SNIPPET_DESCRIPTION_LENGTH,
};

const UPDATABLE: &[&str] = &["name", "content", "description", "tags"];

#[derive(Debug, Default, Deserialize)]
pub struct SnippetQuery {
    pub id: Option<String>,
    pub project_id: Option<String>,
    pub search: Option<String>,
    pub tag: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateSnippet {
    pub project_id: Option<String>,
    pub name: Option<String>,
    pub content: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// GET /api/snippets - By `?id`, or a project's snippets filtered by `search` and `tag`
pub async fn get(
    State(state): State<AppState>,
    identity: Identity,
    Query(query): Query<SnippetQuery>,
) -> ApiResult<Value> {
    let (db, user) = caller(&state, &identity)?;
    let repo = db.repo::<Snippet>(user.user_id);

    if query.id.is_some() {
        let id = parse_id("id", query.id.as_deref())?;
        return Ok(ApiResponse::success(json!(repo.get(id).await?)));
    }
    let project_id = parse_optional_id("project_id", query.project_id.as_deref())?
        .ok_or_else(|| ApiError::bad_request("id or project_id is required"))?;

    let mut filter = FilterData::new().eq("project_id", project_id).order("name asc");
    if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        filter = filter.and(search_condition(search));
    }
    if let Some(tag) = query.tag.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        filter = filter.and(json!({ "tags": { "$any": [tag] } }));
    }
    Ok(ApiResponse::success(json!(repo.select_any(filter).await?)))
}

/// POST /api/snippets - Create a snippet
pub async fn post(
    State(state): State<AppState>,
    identity: Identity,
    body: Result<Json<CreateSnippet>, JsonRejection>,
) -> ApiResult<Snippet> {
    let (db, user) = caller(&state, &identity)?;
    let Json(body) = body?;

    let project_id = parse_id("project_id", body.project_id.as_deref())?;
    let name = required_text("name", body.name.as_deref(), MAX_NAME_LENGTH)?;
    let content = required_text("content", body.content.as_deref(), MAX_SNIPPET_CONTENT_LENGTH)?;
    optional_text("description", body.description.as_deref(), MAX_SNIPPET_DESCRIPTION_LENGTH)?;
    require_project(db, user.user_id, project_id).await?;

    let snippet = db
        .repo::<Snippet>(user.user_id)
        .insert(json!({
            "project_id": project_id,
            "name": name,
            "content": content,
            "description": body.description,
            "tags": body.tags,
        }))
        .await?;
    Ok(ApiResponse::created(snippet))
}

/// PUT /api/snippets - Partial update
pub async fn put(
    State(state): State<AppState>,
    identity: Identity,
    body: Result<Json<Map<String, Value>>, JsonRejection>,
) -> ApiResult<Snippet> {
    let (db, user) = caller(&state, &identity)?;
    let Json(body) = body?;
    let id = body_id(&body)?;

    let mut changes = pick(&body, UPDATABLE);
    if changes.is_empty() {
        return Err(no_fields());
    }
    revalidate_required(&mut changes, "name", MAX_NAME_LENGTH)?;
    revalidate_required(&mut changes, "content", MAX_SNIPPET_CONTENT_LENGTH)?;
    revalidate_optional(&changes, "description", MAX_SNIPPET_DESCRIPTION_LENGTH)?;
    revalidate_string_list(&changes, "tags")?;

    let snippet = db.repo::<Snippet>(user.user_id).update(id, changes).await?;
    Ok(ApiResponse::success(snippet))
}

/// PATCH /api/snippets?id= - Count one use of the snippet
pub async fn patch(
    State(state): State<AppState>,
    identity: Identity,
    Query(query): Query<SnippetQuery>,
) -> ApiResult<Snippet> {
    let (db, user) = caller(&state, &identity)?;
    let id = parse_id("id", query.id.as_deref())?;
    let snippet = db.repo::<Snippet>(user.user_id).increment(id, "usage_count").await?;
    Ok(ApiResponse::success(snippet))
}

/// DELETE /api/snippets?id=
pub async fn delete(
    State(state): State<AppState>,
    identity: Identity,
    Query(query): Query<SnippetQuery>,
) -> ApiResult<Deleted> {
    let (db, user) = caller(&state, &identity)?;
    let id = parse_id("id", query.id.as_deref())?;
    db.repo::<Snippet>(user.user_id).delete(id).await?;
    Ok(ApiResponse::success(Deleted::new(id)))
}

/// Case-insensitive substring match over name, content and description.
fn search_condition(search: &str) -> Value {
    let escaped: String = search
        .chars()
        .flat_map(|c| match c {
            '%' | '_' | '\\' => vec!['\\', c],
            other => vec![other],
        })
        .collect();
    let pattern = format!("%{}%", escaped);
    json!({ "$or": [
        { "name": { "$ilike": pattern } },
        { "content": { "$ilike": pattern } },
        { "description": { "$ilike": pattern } },
    ] })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_escapes_wildcards() {
        let condition = search_condition("50%_off");
        assert_eq!(condition["$or"][0]["name"]["$ilike"], json!("%50\\%\\_off%"));
        assert_eq!(condition["$or"].as_array().unwrap().len(), 3);
    }
}
