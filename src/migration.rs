//! Import of a legacy browser-local workspace into the hosted tables.
//!
//! The legacy client kept whole projects in one JSON tree with its own ids. Rows are
//! re-created under fresh ids in dependency order; references between rows of the same
//! table (folder parents, document parent versions) are written in a second pass once
//! every row of that table has its new id. Failures are collected per item and never
//! stop the import.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{info, warn};
use uuid::Uuid;

use crate::database::models::{BrandVoice, Document, DocumentMetadata, Folder, Persona, Project, Snippet, TemplateProgress, UserSettings};
use crate::database::{Database, DatabaseError};
use crate::validation::{
    required_text, ValidationError, MAX_BASE_TITLE_LENGTH, MAX_NAME_LENGTH, MAX_SNIPPET_CONTENT_LENGTH,
};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyWorkspace {
    #[serde(default)]
    pub projects: Vec<LegacyProject>,
    pub active_project_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyProject {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub brand_voice: Option<LegacyBrandVoice>,
    #[serde(default)]
    pub personas: Vec<LegacyPersona>,
    #[serde(default)]
    pub folders: Vec<LegacyFolder>,
    #[serde(default)]
    pub documents: Vec<LegacyDocument>,
    #[serde(default)]
    pub snippets: Vec<LegacySnippet>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyBrandVoice {
    #[serde(default)]
    pub brand_name: String,
    pub brand_tone: Option<String>,
    #[serde(default)]
    pub approved_phrases: Vec<String>,
    #[serde(default)]
    pub forbidden_words: Vec<String>,
    #[serde(default)]
    pub brand_values: Vec<String>,
    pub mission_statement: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyPersona {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub photo_url: Option<String>,
    pub demographics: Option<String>,
    pub psychographics: Option<String>,
    pub pain_points: Option<String>,
    pub language_patterns: Option<String>,
    pub goals: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyFolder {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub parent_folder_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyDocument {
    pub id: String,
    pub base_title: Option<String>,
    pub title: Option<String>,
    pub version: Option<i32>,
    pub parent_version_id: Option<String>,
    pub folder_id: Option<String>,
    #[serde(default)]
    pub content: String,
    pub metadata: Option<Value>,
    pub template_progress: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacySnippet {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub content: String,
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub usage_count: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportCounts {
    pub projects: usize,
    pub brand_voices: usize,
    pub personas: usize,
    pub folders: usize,
    pub documents: usize,
    pub snippets: usize,
}

/// Body of `POST /api/migrate`
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationReport {
    pub success: bool,
    pub imported: ImportCounts,
    /// Legacy id to new row id, across every table. Informational only; lookups during
    /// the import are scoped per project and table.
    pub id_mapping: BTreeMap<String, Uuid>,
    pub errors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_project_id: Option<Uuid>,
}

impl MigrationReport {
    pub fn is_partial(&self) -> bool {
        !self.errors.is_empty()
    }
}

#[derive(Debug, thiserror::Error)]
enum ItemError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

pub struct Importer<'a> {
    db: &'a Database,
    user_id: Uuid,
    projects: HashMap<String, Uuid>,
    report: MigrationReport,
}

/// New ids of one project's rows, keyed by legacy id
#[derive(Default)]
struct ProjectIds {
    folders: HashMap<String, Uuid>,
    documents: HashMap<String, Document>,
}

impl<'a> Importer<'a> {
    pub fn new(db: &'a Database, user_id: Uuid) -> Self {
        Self {
            db,
            user_id,
            projects: HashMap::new(),
            report: MigrationReport::default(),
        }
    }

    pub async fn run(mut self, workspace: LegacyWorkspace) -> MigrationReport {
        for project in &workspace.projects {
            self.import_project(project).await;
        }
        if let Some(legacy_id) = workspace.active_project_id.as_deref() {
            self.restore_active_project(legacy_id).await;
        }

        self.report.success = self.report.errors.is_empty();
        info!(
            user_id = %self.user_id,
            projects = self.report.imported.projects,
            documents = self.report.imported.documents,
            errors = self.report.errors.len(),
            "Legacy workspace imported"
        );
        self.report
    }

    fn fail(&mut self, message: String) {
        warn!(user_id = %self.user_id, "{}", message);
        self.report.errors.push(message);
    }

    fn record(&mut self, legacy_id: &str, id: Uuid) {
        self.report.id_mapping.insert(legacy_id.to_string(), id);
    }

    async fn import_project(&mut self, legacy: &LegacyProject) {
        let project_id = match self.insert_project(legacy).await {
            Ok(project) => {
                self.projects.insert(legacy.id.clone(), project.id);
                self.record(&legacy.id, project.id);
                self.report.imported.projects += 1;
                project.id
            }
            Err(e) => {
                self.fail(format!("Project '{}': {}", legacy.name, e));
                self.skip_children(legacy);
                return;
            }
        };

        if let Some(voice) = &legacy.brand_voice {
            match self.insert_brand_voice(project_id, voice).await {
                Ok(_) => self.report.imported.brand_voices += 1,
                Err(e) => self.fail(format!("Brand voice '{}': {}", voice.brand_name, e)),
            }
        }

        let mut ids = ProjectIds::default();

        // folders, pass 1: every row without its parent
        for folder in &legacy.folders {
            match self.insert_folder(project_id, folder).await {
                Ok(row) => {
                    ids.folders.insert(folder.id.clone(), row.id);
                    self.record(&folder.id, row.id);
                    self.report.imported.folders += 1;
                }
                Err(e) => self.fail(format!("Folder '{}': {}", folder.name, e)),
            }
        }
        // folders, pass 2: parents through the id map, refusing any link that closes a loop
        let mut linked: HashMap<Uuid, Uuid> = HashMap::new();
        for folder in legacy.folders.iter().filter(|f| f.parent_folder_id.is_some()) {
            let Some(&new_id) = ids.folders.get(&folder.id) else { continue };
            let Some(&parent_id) = folder.parent_folder_id.as_deref().and_then(|p| ids.folders.get(p)) else {
                self.fail(format!("Folder '{}': parent folder was not imported", folder.name));
                continue;
            };
            if closes_loop(&linked, new_id, parent_id) {
                self.fail(format!("Folder '{}': a folder cannot be its own ancestor", folder.name));
                continue;
            }
            match self.link::<Folder>(new_id, "parent_folder_id", parent_id).await {
                Ok(()) => {
                    linked.insert(new_id, parent_id);
                }
                Err(e) => self.fail(format!("Folder '{}': {}", folder.name, e)),
            }
        }

        for persona in &legacy.personas {
            match self.insert_persona(project_id, persona).await {
                Ok(row) => {
                    self.record(&persona.id, row.id);
                    self.report.imported.personas += 1;
                }
                Err(e) => self.fail(format!("Persona '{}': {}", persona.name, e)),
            }
        }

        // documents, pass 1: folder remapped, no parent version
        for document in &legacy.documents {
            let (base_title, version) = lineage_key(document);
            let taken = ids
                .documents
                .values()
                .any(|d| d.base_title == base_title && d.version == version);
            if taken {
                self.fail(format!(
                    "Document '{}': version {} of '{}' was already imported",
                    document_label(document),
                    version,
                    base_title
                ));
                continue;
            }
            match self.insert_document(project_id, document, &ids.folders).await {
                Ok(row) => {
                    self.record(&document.id, row.id);
                    ids.documents.insert(document.id.clone(), row);
                    self.report.imported.documents += 1;
                }
                Err(e) => self.fail(format!("Document '{}': {}", document_label(document), e)),
            }
        }
        // documents, pass 2: parent versions through the id map, within one lineage only
        for document in legacy.documents.iter().filter(|d| d.parent_version_id.is_some()) {
            let Some(child) = ids.documents.get(&document.id) else { continue };
            let Some(parent) = document.parent_version_id.as_deref().and_then(|p| ids.documents.get(p)) else {
                self.fail(format!("Document '{}': parent version was not imported", document_label(document)));
                continue;
            };
            if parent.base_title != child.base_title || parent.version >= child.version {
                self.fail(format!(
                    "Document '{}': parent must be an earlier version of the same document",
                    document_label(document)
                ));
                continue;
            }
            let (child_id, parent_id) = (child.id, parent.id);
            if let Err(e) = self.link::<Document>(child_id, "parent_version_id", parent_id).await {
                self.fail(format!("Document '{}': {}", document_label(document), e));
            }
        }

        for snippet in &legacy.snippets {
            match self.insert_snippet(project_id, snippet).await {
                Ok(row) => {
                    self.record(&snippet.id, row.id);
                    self.report.imported.snippets += 1;
                }
                Err(e) => self.fail(format!("Snippet '{}': {}", snippet.name, e)),
            }
        }
    }

    fn skip_children(&mut self, legacy: &LegacyProject) {
        let reason = format!("skipped because project '{}' was not imported", legacy.name);
        if let Some(voice) = &legacy.brand_voice {
            self.fail(format!("Brand voice '{}': {}", voice.brand_name, reason));
        }
        for folder in &legacy.folders {
            self.fail(format!("Folder '{}': {}", folder.name, reason));
        }
        for persona in &legacy.personas {
            self.fail(format!("Persona '{}': {}", persona.name, reason));
        }
        for document in &legacy.documents {
            self.fail(format!("Document '{}': {}", document_label(document), reason));
        }
        for snippet in &legacy.snippets {
            self.fail(format!("Snippet '{}': {}", snippet.name, reason));
        }
    }

    async fn restore_active_project(&mut self, legacy_id: &str) {
        let Some(&project_id) = self.projects.get(legacy_id) else {
            self.fail(format!("Active project '{}' was not imported", legacy_id));
            return;
        };
        let settings = self
            .db
            .repo::<UserSettings>(self.user_id)
            .upsert(json!({ "active_project_id": project_id }))
            .await;
        match settings {
            Ok(_) => self.report.active_project_id = Some(project_id),
            Err(e) => self.fail(format!("Active project: {}", e)),
        }
    }

    async fn link<T: crate::database::Model>(&self, id: Uuid, column: &str, target: Uuid) -> Result<(), DatabaseError> {
        let mut changes = Map::new();
        changes.insert(column.to_string(), json!(target));
        self.db.repo::<T>(self.user_id).update(id, changes).await?;
        Ok(())
    }

    async fn insert_project(&self, legacy: &LegacyProject) -> Result<Project, ItemError> {
        let name = required_text("name", Some(&legacy.name), MAX_NAME_LENGTH)?;
        Ok(self.db.repo::<Project>(self.user_id).insert(json!({ "name": name })).await?)
    }

    async fn insert_brand_voice(&self, project_id: Uuid, voice: &LegacyBrandVoice) -> Result<BrandVoice, ItemError> {
        let brand_name = required_text("brand_name", Some(&voice.brand_name), MAX_NAME_LENGTH)?;
        let row = json!({
            "project_id": project_id,
            "brand_name": brand_name,
            "brand_tone": voice.brand_tone,
            "approved_phrases": voice.approved_phrases,
            "forbidden_words": voice.forbidden_words,
            "brand_values": voice.brand_values,
            "mission_statement": voice.mission_statement,
        });
        Ok(self.db.repo::<BrandVoice>(self.user_id).insert(row).await?)
    }

    async fn insert_folder(&self, project_id: Uuid, folder: &LegacyFolder) -> Result<Folder, ItemError> {
        let name = required_text("name", Some(&folder.name), MAX_NAME_LENGTH)?;
        let row = json!({ "project_id": project_id, "name": name });
        Ok(self.db.repo::<Folder>(self.user_id).insert(row).await?)
    }

    async fn insert_persona(&self, project_id: Uuid, persona: &LegacyPersona) -> Result<Persona, ItemError> {
        let name = required_text("name", Some(&persona.name), MAX_NAME_LENGTH)?;
        let row = json!({
            "project_id": project_id,
            "name": name,
            "photo_url": persona.photo_url,
            "demographics": persona.demographics,
            "psychographics": persona.psychographics,
            "pain_points": persona.pain_points,
            "language_patterns": persona.language_patterns,
            "goals": persona.goals,
        });
        Ok(self.db.repo::<Persona>(self.user_id).insert(row).await?)
    }

    async fn insert_document(
        &self,
        project_id: Uuid,
        document: &LegacyDocument,
        folders: &HashMap<String, Uuid>,
    ) -> Result<Document, ItemError> {
        let (base_title, version) = lineage_key(document);
        let base_title = required_text("base_title", Some(&base_title), MAX_BASE_TITLE_LENGTH)?;
        let metadata = match &document.metadata {
            Some(value) if !value.is_null() => Some(
                serde_json::from_value::<DocumentMetadata>(value.clone())
                    .map_err(|e| ValidationError::new(format!("invalid metadata: {}", e)))?,
            ),
            _ => None,
        };
        let template_progress = match &document.template_progress {
            Some(value) if !value.is_null() => {
                let progress = serde_json::from_value::<TemplateProgress>(value.clone())
                    .map_err(|e| ValidationError::new(format!("invalid templateProgress: {}", e)))?;
                progress.validate()?;
                Some(progress)
            }
            _ => None,
        };

        let row = json!({
            "project_id": project_id,
            "title": Document::versioned_title(&base_title, version),
            "base_title": base_title,
            "version": version,
            "folder_id": document.folder_id.as_deref().and_then(|f| folders.get(f)),
            "content": document.content,
            "metadata": metadata,
            "template_progress": template_progress,
        });
        Ok(self.db.repo::<Document>(self.user_id).insert(row).await?)
    }

    async fn insert_snippet(&self, project_id: Uuid, snippet: &LegacySnippet) -> Result<Snippet, ItemError> {
        let name = required_text("name", Some(&snippet.name), MAX_NAME_LENGTH)?;
        let content = required_text("content", Some(&snippet.content), MAX_SNIPPET_CONTENT_LENGTH)?;
        let row = json!({
            "project_id": project_id,
            "name": name,
            "content": content,
            "description": snippet.description,
            "tags": snippet.tags,
            "usage_count": snippet.usage_count.max(0),
        });
        Ok(self.db.repo::<Snippet>(self.user_id).insert(row).await?)
    }
}

/// Old documents may only carry a display title such as "Launch email v3".
fn legacy_base_title(document: &LegacyDocument) -> String {
    if let Some(base) = document.base_title.as_deref().filter(|b| !b.trim().is_empty()) {
        return base.to_string();
    }
    let title = document.title.as_deref().unwrap_or_default();
    match title.rsplit_once(" v") {
        Some((base, version)) if !version.is_empty() && version.chars().all(|c| c.is_ascii_digit()) => base.to_string(),
        _ => title.to_string(),
    }
}

/// Trimmed base title and version a legacy document will be stored under
fn lineage_key(document: &LegacyDocument) -> (String, i32) {
    (legacy_base_title(document).trim().to_string(), document.version.unwrap_or(1).max(1))
}

/// Walks up the links made so far from `parent`; reaching `folder` means a loop.
fn closes_loop(linked: &HashMap<Uuid, Uuid>, folder: Uuid, parent: Uuid) -> bool {
    let mut cursor = Some(parent);
    while let Some(current) = cursor {
        if current == folder {
            return true;
        }
        cursor = linked.get(&current).copied();
    }
    false
}

fn document_label(document: &LegacyDocument) -> String {
    document
        .title
        .clone()
        .or_else(|| document.base_title.clone())
        .unwrap_or_else(|| document.id.clone())
}
