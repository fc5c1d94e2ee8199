// handlers/protected/folders.rs - /api/folders handlers
use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use uuid::Uuid;

use super::documents::require_project;
use super::{body_id, caller, no_fields, parse_id, parse_optional_id, pick, revalidate_required, ResourceQuery};
use crate::database::models::Folder;
use crate::database::{Database, DatabaseError};
use crate::error::ApiError;
use crate::filter::FilterData;
use crate::middleware::{ApiResponse, ApiResult, Deleted, Identity};
use crate::state::AppState;
use crate::validation::{required_text, ValidationError, MAX_NAME_LENGTH};

const UPDATABLE: &[&str] = &["name", "parent_folder_id"];

#[derive(Debug, Deserialize)]
pub struct CreateFolder {
    pub project_id: Option<String>,
    pub name: Option<String>,
    pub parent_folder_id: Option<String>,
}

/// GET /api/folders - By `?id` or every folder of `?project_id`
pub async fn get(
    State(state): State<AppState>,
    identity: Identity,
    Query(query): Query<ResourceQuery>,
) -> ApiResult<Value> {
    let (db, user) = caller(&state, &identity)?;
    let repo = db.repo::<Folder>(user.user_id);

    if query.id.is_some() {
        let id = parse_id("id", query.id.as_deref())?;
        return Ok(ApiResponse::success(json!(repo.get(id).await?)));
    }
    let project_id = parse_optional_id("project_id", query.project_id.as_deref())?
        .ok_or_else(|| ApiError::bad_request("id or project_id is required"))?;
    let folders = repo
        .select_any(FilterData::new().eq("project_id", project_id).order("name asc"))
        .await?;
    Ok(ApiResponse::success(json!(folders)))
}

/// POST /api/folders - Create a folder, optionally nested
pub async fn post(
    State(state): State<AppState>,
    identity: Identity,
    body: Result<Json<CreateFolder>, JsonRejection>,
) -> ApiResult<Folder> {
    let (db, user) = caller(&state, &identity)?;
    let Json(body) = body?;

    let project_id = parse_id("project_id", body.project_id.as_deref())?;
    let name = required_text("name", body.name.as_deref(), MAX_NAME_LENGTH)?;
    let parent_folder_id = parse_optional_id("parent_folder_id", body.parent_folder_id.as_deref())?;

    require_project(db, user.user_id, project_id).await?;
    if let Some(parent_id) = parent_folder_id {
        let parent = load_parent(db, user.user_id, parent_id).await?;
        if parent.project_id != project_id {
            return Err(ValidationError::new("parent_folder_id must belong to the same project").into());
        }
    }

    let folder = db
        .repo::<Folder>(user.user_id)
        .insert(json!({ "project_id": project_id, "name": name, "parent_folder_id": parent_folder_id }))
        .await?;
    Ok(ApiResponse::created(folder))
}

/// PUT /api/folders - Rename or move a folder
pub async fn put(
    State(state): State<AppState>,
    identity: Identity,
    body: Result<Json<Map<String, Value>>, JsonRejection>,
) -> ApiResult<Folder> {
    let (db, user) = caller(&state, &identity)?;
    let Json(body) = body?;
    let id = body_id(&body)?;

    let mut changes = pick(&body, UPDATABLE);
    if changes.is_empty() {
        return Err(no_fields());
    }
    revalidate_required(&mut changes, "name", MAX_NAME_LENGTH)?;

    let repo = db.repo::<Folder>(user.user_id);
    let folder = repo.get(id).await?;

    match changes.get("parent_folder_id") {
        None | Some(Value::Null) => {}
        Some(value) => {
            let parent_id = parse_id("parent_folder_id", value.as_str())?;
            check_move(db, user.user_id, &folder, parent_id).await?;
        }
    }

    let folder = repo.update(id, changes).await?;
    Ok(ApiResponse::success(folder))
}

/// DELETE /api/folders?id= - Delete a folder; nested folders go with it, documents move to the root
pub async fn delete(
    State(state): State<AppState>,
    identity: Identity,
    Query(query): Query<ResourceQuery>,
) -> ApiResult<Deleted> {
    let (db, user) = caller(&state, &identity)?;
    let id = parse_id("id", query.id.as_deref())?;
    db.repo::<Folder>(user.user_id).delete(id).await?;
    Ok(ApiResponse::success(Deleted::new(id)))
}

async fn load_parent(db: &Database, user_id: Uuid, parent_id: Uuid) -> Result<Folder, ApiError> {
    match db.repo::<Folder>(user_id).get(parent_id).await {
        Ok(parent) => Ok(parent),
        Err(DatabaseError::NotFound(_)) => {
            Err(ValidationError::new("parent_folder_id does not reference one of your folders").into())
        }
        Err(e) => Err(e.into()),
    }
}

/// Same project, and `folder` must not end up inside its own subtree.
async fn check_move(db: &Database, user_id: Uuid, folder: &Folder, parent_id: Uuid) -> Result<(), ApiError> {
    if parent_id == folder.id {
        return Err(ValidationError::new("A folder cannot be its own parent").into());
    }
    let parent = load_parent(db, user_id, parent_id).await?;
    if parent.project_id != folder.project_id {
        return Err(ValidationError::new("parent_folder_id must belong to the same project").into());
    }

    let folders = db
        .repo::<Folder>(user_id)
        .select_any(FilterData::new().eq("project_id", folder.project_id))
        .await?;
    if creates_cycle(&folders, folder.id, parent_id) {
        return Err(ValidationError::new("A folder cannot be moved into one of its subfolders").into());
    }
    Ok(())
}

/// Walks up from `new_parent`; reaching `folder_id` means the move would close a loop.
fn creates_cycle(folders: &[Folder], folder_id: Uuid, new_parent: Uuid) -> bool {
    let mut cursor = Some(new_parent);
    let mut steps = 0;
    while let Some(current) = cursor {
        if current == folder_id {
            return true;
        }
        steps += 1;
        if steps > folders.len() {
            // already cyclic data; refuse rather than loop
            return true;
        }
        cursor = folders.iter().find(|f| f.id == current).and_then(|f| f.parent_folder_id);
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn folder(id: Uuid, parent: Option<Uuid>) -> Folder {
        Folder {
            id,
            project_id: Uuid::nil(),
            user_id: Uuid::nil(),
            name: "f".into(),
            parent_folder_id: parent,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn detects_moves_into_descendants() {
        let (a, b, c, d) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        // a > b > c, d at the root
        let folders = vec![folder(a, None), folder(b, Some(a)), folder(c, Some(b)), folder(d, None)];
        assert!(creates_cycle(&folders, a, c));
        assert!(creates_cycle(&folders, b, c));
        assert!(!creates_cycle(&folders, c, a));
        assert!(!creates_cycle(&folders, a, d));
    }
}
