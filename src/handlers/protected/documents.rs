// handlers/protected/documents.rs - /api/documents handlers
use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::info;
use uuid::Uuid;

use super::{body_id, caller, no_fields, parse_id, parse_optional_id, pick, revalidate_required};
use crate::database::models::{Document, DocumentMetadata, Folder, Project, TemplateProgress};
use crate::database::{Database, DatabaseError};
use crate::error::ApiError;
use crate::filter::FilterData;
use crate::middleware::{ApiResponse, ApiResult, Deleted, Identity};
use crate::state::AppState;
use crate::validation::{required_text, ValidationError, MAX_BASE_TITLE_LENGTH};

const UPDATABLE: &[&str] = &["base_title", "title", "content", "folder_id", "metadata", "template_progress"];

/// Room for " v<version>" after the longest base title
const MAX_TITLE_LENGTH: usize = MAX_BASE_TITLE_LENGTH + 20;

#[derive(Debug, Default, Deserialize)]
pub struct DocumentQuery {
    pub id: Option<String>,
    pub project_id: Option<String>,
    pub base_title: Option<String>,
    pub folder_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateDocument {
    pub project_id: Option<String>,
    pub base_title: Option<String>,
    pub content: Option<String>,
    pub folder_id: Option<String>,
    pub parent_version_id: Option<String>,
    pub version: Option<i32>,
    pub metadata: Option<DocumentMetadata>,
    pub template_progress: Option<TemplateProgress>,
}

#[derive(Debug, Deserialize)]
pub struct NewVersion {
    pub id: Option<String>,
}

/// GET /api/documents - By `?id`, or by `?project_id` with optional `base_title` / `folder_id`
///
/// A `base_title` filter returns the version lineage, oldest first.
pub async fn get(
    State(state): State<AppState>,
    identity: Identity,
    Query(query): Query<DocumentQuery>,
) -> ApiResult<Value> {
    let (db, user) = caller(&state, &identity)?;
    let repo = db.repo::<Document>(user.user_id);

    if query.id.is_some() {
        let id = parse_id("id", query.id.as_deref())?;
        return Ok(ApiResponse::success(json!(repo.get(id).await?)));
    }

    let project_id = parse_optional_id("project_id", query.project_id.as_deref())?
        .ok_or_else(|| ApiError::bad_request("id or project_id is required"))?;
    let mut filter = FilterData::new().eq("project_id", project_id);
    if let Some(folder_id) = parse_optional_id("folder_id", query.folder_id.as_deref())? {
        filter = filter.eq("folder_id", folder_id);
    }
    filter = match query.base_title.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        Some(base_title) => filter.eq("base_title", base_title).order("version asc"),
        None => filter.order("modified_at desc"),
    };

    let documents = repo.select_any(filter).await?;
    Ok(ApiResponse::success(json!(documents)))
}

/// POST /api/documents - Create a document (version 1 unless a lineage is given)
pub async fn post(
    State(state): State<AppState>,
    identity: Identity,
    body: Result<Json<CreateDocument>, JsonRejection>,
) -> ApiResult<Document> {
    let (db, user) = caller(&state, &identity)?;
    let Json(body) = body?;

    let project_id = parse_id("project_id", body.project_id.as_deref())?;
    let base_title = required_text("base_title", body.base_title.as_deref(), MAX_BASE_TITLE_LENGTH)?;
    let folder_id = parse_optional_id("folder_id", body.folder_id.as_deref())?;
    let parent_version_id = parse_optional_id("parent_version_id", body.parent_version_id.as_deref())?;
    if let Some(progress) = &body.template_progress {
        progress.validate()?;
    }

    require_project(db, user.user_id, project_id).await?;
    if let Some(folder_id) = folder_id {
        require_folder_in_project(db, user.user_id, folder_id, project_id).await?;
    }

    // A lineage has one root; later versions must name a parent and land after the newest.
    let next = next_version(db, user.user_id, project_id, &base_title).await?;
    let version = match (parent_version_id, body.version) {
        (_, Some(v)) if v < 1 => return Err(ValidationError::new("version must be at least 1").into()),
        (None, _) if next > 1 => {
            return Err(ValidationError::new(format!(
                "'{}' already exists in this project; create a new version from it instead",
                base_title
            ))
            .into())
        }
        (None, v) => v.unwrap_or(1),
        (Some(parent_id), v) => {
            let parent = db.repo::<Document>(user.user_id).get(parent_id).await.map_err(parent_not_found)?;
            let version = v.unwrap_or(next);
            if version < next {
                return Err(ValidationError::new(format!("version must be at least {}", next)).into());
            }
            check_parent(&parent, project_id, &base_title, version)?;
            version
        }
    };

    let document = db
        .repo::<Document>(user.user_id)
        .insert(json!({
            "project_id": project_id,
            "title": Document::versioned_title(&base_title, version),
            "base_title": base_title,
            "version": version,
            "parent_version_id": parent_version_id,
            "folder_id": folder_id,
            "content": body.content.unwrap_or_default(),
            "metadata": body.metadata,
            "template_progress": body.template_progress,
        }))
        .await?;
    info!(user_id = %user.user_id, document_id = %document.id, version, "Document created");
    Ok(ApiResponse::created(document))
}

/// PUT /api/documents - Partial update; the title follows a renamed base title
pub async fn put(
    State(state): State<AppState>,
    identity: Identity,
    body: Result<Json<Map<String, Value>>, JsonRejection>,
) -> ApiResult<Document> {
    let (db, user) = caller(&state, &identity)?;
    let Json(body) = body?;
    let id = body_id(&body)?;

    let mut changes = pick(&body, UPDATABLE);
    if changes.is_empty() {
        return Err(no_fields());
    }
    revalidate_required(&mut changes, "base_title", MAX_BASE_TITLE_LENGTH)?;
    revalidate_required(&mut changes, "title", MAX_TITLE_LENGTH)?;
    if let Some(content) = changes.get("content") {
        if !content.is_string() {
            return Err(ValidationError::new("content must be a string").into());
        }
    }
    if let Some(metadata) = changes.get("metadata").filter(|m| !m.is_null()) {
        serde_json::from_value::<DocumentMetadata>(metadata.clone())
            .map_err(|e| ValidationError::new(format!("Invalid metadata: {}", e)))?;
    }
    if let Some(progress) = changes.get("template_progress").filter(|p| !p.is_null()) {
        serde_json::from_value::<TemplateProgress>(progress.clone())
            .map_err(|e| ValidationError::new(format!("Invalid template_progress: {}", e)))?
            .validate()?;
    }

    let repo = db.repo::<Document>(user.user_id);
    let existing = repo.get(id).await?;

    match changes.get("folder_id") {
        None | Some(Value::Null) => {}
        Some(value) => {
            let folder_id = parse_id("folder_id", value.as_str())?;
            require_folder_in_project(db, user.user_id, folder_id, existing.project_id).await?;
        }
    }

    let renamed = changes
        .get("base_title")
        .and_then(Value::as_str)
        .filter(|base_title| *base_title != existing.base_title)
        .map(str::to_string);
    if let Some(base_title) = renamed {
        rename_lineage(db, user.user_id, &existing, &base_title).await?;
        if !changes.contains_key("title") {
            let title = Document::versioned_title(&base_title, existing.version);
            changes.insert("title".to_string(), Value::String(title));
        }
    }

    let document = repo.update(id, changes).await?;
    Ok(ApiResponse::success(document))
}

/// DELETE /api/documents?id= - Delete one version; later versions keep their content
pub async fn delete(
    State(state): State<AppState>,
    identity: Identity,
    Query(query): Query<DocumentQuery>,
) -> ApiResult<Deleted> {
    let (db, user) = caller(&state, &identity)?;
    let id = parse_id("id", query.id.as_deref())?;
    db.repo::<Document>(user.user_id).delete(id).await?;
    Ok(ApiResponse::success(Deleted::new(id)))
}

/// POST /api/documents/versions - Save a document as the next version of its lineage
pub async fn post_version(
    State(state): State<AppState>,
    identity: Identity,
    body: Result<Json<NewVersion>, JsonRejection>,
) -> ApiResult<Document> {
    let (db, user) = caller(&state, &identity)?;
    let Json(body) = body?;
    let id = parse_id("id", body.id.as_deref())?;

    let repo = db.repo::<Document>(user.user_id);
    let source = repo.get(id).await?;
    let version = next_version(db, user.user_id, source.project_id, &source.base_title).await?;

    let document = repo
        .insert(json!({
            "project_id": source.project_id,
            "title": Document::versioned_title(&source.base_title, version),
            "base_title": source.base_title,
            "version": version,
            "parent_version_id": source.id,
            "folder_id": source.folder_id,
            "content": source.content,
            "metadata": source.metadata,
            "template_progress": source.template_progress,
        }))
        .await?;
    info!(user_id = %user.user_id, document_id = %document.id, parent = %id, version, "Document version created");
    Ok(ApiResponse::created(document))
}

/// Highest version in the lineage plus one.
async fn next_version(db: &Database, user_id: Uuid, project_id: Uuid, base_title: &str) -> Result<i32, DatabaseError> {
    let latest = db
        .repo::<Document>(user_id)
        .select_one(
            FilterData::new()
                .eq("project_id", project_id)
                .eq("base_title", base_title)
                .order("version desc"),
        )
        .await?;
    Ok(latest.map(|d| d.version + 1).unwrap_or(1))
}

/// Moves the other versions of `document`'s lineage to `base_title`, re-deriving their titles.
/// The target title must not already name a lineage in the project.
async fn rename_lineage(db: &Database, user_id: Uuid, document: &Document, base_title: &str) -> Result<(), ApiError> {
    let repo = db.repo::<Document>(user_id);
    let clash = repo
        .select_one(
            FilterData::new()
                .eq("project_id", document.project_id)
                .eq("base_title", base_title),
        )
        .await?;
    if clash.is_some() {
        return Err(ValidationError::new(format!("'{}' already exists in this project", base_title)).into());
    }

    let lineage = repo
        .select_any(
            FilterData::new()
                .eq("project_id", document.project_id)
                .eq("base_title", &document.base_title),
        )
        .await?;
    for sibling in lineage.iter().filter(|d| d.id != document.id) {
        let mut changes = Map::new();
        changes.insert("base_title".to_string(), json!(base_title));
        changes.insert("title".to_string(), json!(Document::versioned_title(base_title, sibling.version)));
        repo.update(sibling.id, changes).await?;
    }
    info!(user_id = %user_id, from = %document.base_title, to = %base_title, versions = lineage.len(), "Document lineage renamed");
    Ok(())
}

fn check_parent(parent: &Document, project_id: Uuid, base_title: &str, version: i32) -> Result<(), ValidationError> {
    if parent.project_id != project_id || parent.base_title != base_title {
        return Err(ValidationError::new("parent_version_id must reference a version of the same document"));
    }
    if parent.version >= version {
        return Err(ValidationError::new(format!(
            "version must be greater than the parent version ({})",
            parent.version
        )));
    }
    Ok(())
}

fn parent_not_found(err: DatabaseError) -> ApiError {
    match err {
        DatabaseError::NotFound(_) => ValidationError::new("parent_version_id does not reference one of your documents").into(),
        other => other.into(),
    }
}

pub(crate) async fn require_project(db: &Database, user_id: Uuid, project_id: Uuid) -> Result<Project, ApiError> {
    match db.repo::<Project>(user_id).get(project_id).await {
        Ok(project) => Ok(project),
        Err(DatabaseError::NotFound(_)) => Err(ApiError::not_found("Project not found")),
        Err(e) => Err(e.into()),
    }
}

async fn require_folder_in_project(db: &Database, user_id: Uuid, folder_id: Uuid, project_id: Uuid) -> Result<(), ApiError> {
    match db.repo::<Folder>(user_id).get(folder_id).await {
        Ok(folder) if folder.project_id == project_id => Ok(()),
        Ok(_) => Err(ValidationError::new("folder_id must belong to the same project").into()),
        Err(DatabaseError::NotFound(_)) => Err(ValidationError::new("folder_id does not reference one of your folders").into()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn document(base_title: &str, version: i32) -> Document {
        Document {
            id: Uuid::new_v4(),
            project_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            base_title: base_title.into(),
            title: Document::versioned_title(base_title, version),
            version,
            parent_version_id: None,
            folder_id: None,
            content: String::new(),
            metadata: None,
            template_progress: None,
            created_at: Utc::now(),
            modified_at: Utc::now(),
        }
    }

    #[test]
    fn parent_must_share_lineage_and_precede() {
        let parent = document("Hero", 2);
        let project_id = parent.project_id;
        assert!(check_parent(&parent, project_id, "Hero", 3).is_ok());
        assert!(check_parent(&parent, project_id, "Hero", 2).is_err());
        assert!(check_parent(&parent, project_id, "Footer", 3).is_err());
        assert!(check_parent(&parent, Uuid::new_v4(), "Hero", 3).is_err());
    }
}
