// handlers/protected/sync.rs - GET /api/sync handler
use axum::extract::State;
use futures::try_join;
use serde::Serialize;
use uuid::Uuid;

use super::caller;
use crate::database::models::{BrandVoice, Document, Folder, Persona, Project, Snippet, UserSettings};
use crate::filter::FilterData;
use crate::middleware::{ApiResponse, ApiResult, Identity};
use crate::state::AppState;

/// A project with everything that hangs off it
#[derive(Debug, Serialize)]
pub struct SyncProject {
    #[serde(flatten)]
    pub project: Project,
    /// First brand voice attached to the project, if any
    pub brand_voice: Option<BrandVoice>,
    pub personas: Vec<Persona>,
    pub folders: Vec<Folder>,
    pub documents: Vec<Document>,
    pub snippets: Vec<Snippet>,
}

#[derive(Debug, Serialize)]
pub struct SyncResponse {
    pub projects: Vec<SyncProject>,
    pub settings: Option<UserSettings>,
    /// Rows not attached to any project
    pub unassigned_personas: Vec<Persona>,
    pub unassigned_brand_voices: Vec<BrandVoice>,
}

/// GET /api/sync - Hydrate the whole workspace in one round trip
pub async fn get(State(state): State<AppState>, identity: Identity) -> ApiResult<SyncResponse> {
    let (db, user) = caller(&state, &identity)?;
    let by_created = || FilterData::new().order("created_at asc");
    let projects = db.repo::<Project>(user.user_id);
    let brand_voices = db.repo::<BrandVoice>(user.user_id);
    let personas = db.repo::<Persona>(user.user_id);
    let folders = db.repo::<Folder>(user.user_id);
    let documents = db.repo::<Document>(user.user_id);
    let snippets = db.repo::<Snippet>(user.user_id);
    let settings = db.repo::<UserSettings>(user.user_id);

    let (projects, brand_voices, personas, folders, documents, snippets, settings) = try_join!(
        projects.select_any(by_created()),
        brand_voices.select_any(by_created()),
        personas.select_any(by_created()),
        folders.select_any(FilterData::new().order("name asc")),
        documents.select_any(FilterData::new().order("base_title asc, version asc")),
        snippets.select_any(FilterData::new().order("name asc")),
        settings.select_one(FilterData::new())
    )?;

    Ok(ApiResponse::success(assemble(
        projects,
        brand_voices,
        personas,
        folders,
        documents,
        snippets,
        settings,
    )))
}

fn assemble(
    projects: Vec<Project>,
    brand_voices: Vec<BrandVoice>,
    personas: Vec<Persona>,
    folders: Vec<Folder>,
    documents: Vec<Document>,
    snippets: Vec<Snippet>,
    settings: Option<UserSettings>,
) -> SyncResponse {
    let (assigned_voices, unassigned_brand_voices): (Vec<_>, Vec<_>) =
        brand_voices.into_iter().partition(|v| v.project_id.is_some());
    let (assigned_personas, unassigned_personas): (Vec<_>, Vec<_>) =
        personas.into_iter().partition(|p| p.project_id.is_some());

    let projects = projects
        .into_iter()
        .map(|project| {
            let id = project.id;
            let owned = |owner: Option<Uuid>| owner == Some(id);
            SyncProject {
                brand_voice: assigned_voices.iter().find(|v| owned(v.project_id)).cloned(),
                personas: assigned_personas.iter().filter(|p| owned(p.project_id)).cloned().collect(),
                folders: folders.iter().filter(|f| f.project_id == id).cloned().collect(),
                documents: documents.iter().filter(|d| d.project_id == id).cloned().collect(),
                snippets: snippets.iter().filter(|s| s.project_id == id).cloned().collect(),
                project,
            }
        })
        .collect();

    SyncResponse {
        projects,
        settings,
        unassigned_personas,
        unassigned_brand_voices,
    }
}
