use std::collections::BTreeMap;
use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::api::{ClientError, Tool, WorkspaceApi};
use super::storage::{LocalStorage, WORKSPACE_KEY};
use crate::database::models::Document;

/// Anything that can receive generated copy
pub trait Editor {
    fn set_content(&mut self, html: &str);

    fn insert_at_cursor(&mut self, html: &str);
}

/// Plain buffer; the cursor is always at the end.
impl Editor for String {
    fn set_content(&mut self, html: &str) {
        self.clear();
        self.push_str(html);
    }

    fn insert_at_cursor(&mut self, html: &str) {
        self.push_str(html);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveDocument {
    pub id: Uuid,
    pub project_id: Uuid,
    pub title: String,
}

impl From<&Document> for ActiveDocument {
    fn from(doc: &Document) -> Self {
        Self {
            id: doc.id,
            project_id: doc.project_id,
            title: doc.title.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PanelFlags {
    pub left_sidebar_open: bool,
    pub right_sidebar_open: bool,
    pub snippets_open: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolState {
    pub result: Option<Value>,
    pub loading: bool,
    pub error: Option<String>,
}

impl ToolState {
    pub fn is_idle(&self) -> bool {
        !self.loading && self.result.is_none() && self.error.is_none()
    }
}

/// What survives a restart
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct PersistedWorkspace {
    active_document: Option<ActiveDocument>,
    active_project_id: Option<Uuid>,
    panels: PanelFlags,
}

/// Handed out when a tool run starts. A run whose context changed before it
/// finished is discarded instead of landing in the new context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolRun {
    tool: Tool,
    generation: u64,
}

/// Editor-side state: active document and project, panels, and the AI tools.
#[derive(Debug, Default)]
pub struct WorkspaceStore {
    active_document: Option<ActiveDocument>,
    active_project_id: Option<Uuid>,
    panels: PanelFlags,
    active_tool: Option<Tool>,
    tools: BTreeMap<Tool, ToolState>,
    generation: u64,
    storage: Option<LocalStorage>,
}

impl WorkspaceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore the persisted subset; later changes are written back to `storage`.
    pub fn load(storage: LocalStorage) -> Self {
        let saved: PersistedWorkspace = storage.get(WORKSPACE_KEY).unwrap_or_default();
        Self {
            active_document: saved.active_document,
            active_project_id: saved.active_project_id,
            panels: saved.panels,
            storage: Some(storage),
            ..Self::default()
        }
    }

    pub fn active_document(&self) -> Option<&ActiveDocument> {
        self.active_document.as_ref()
    }

    pub fn active_project_id(&self) -> Option<Uuid> {
        self.active_project_id
    }

    pub fn panels(&self) -> &PanelFlags {
        &self.panels
    }

    pub fn active_tool(&self) -> Option<Tool> {
        self.active_tool
    }

    pub fn tool(&self, tool: Tool) -> ToolState {
        self.tools.get(&tool).cloned().unwrap_or_default()
    }

    pub fn set_active_document(&mut self, document: Option<ActiveDocument>) -> Result<(), ClientError> {
        if let Some(doc) = &document {
            if self.active_project_id != Some(doc.project_id) {
                self.switch_project(Some(doc.project_id));
            }
        }
        self.active_document = document;
        self.persist()
    }

    /// Switching project drops every tool result and the active document.
    pub fn set_active_project(&mut self, project_id: Option<Uuid>) -> Result<(), ClientError> {
        if self.active_project_id == project_id {
            return Ok(());
        }
        self.switch_project(project_id);
        self.active_document = None;
        self.persist()
    }

    fn switch_project(&mut self, project_id: Option<Uuid>) {
        self.active_project_id = project_id;
        self.active_tool = None;
        self.tools.clear();
        self.generation += 1;
    }

    pub fn set_panels(&mut self, panels: PanelFlags) -> Result<(), ClientError> {
        self.panels = panels;
        self.persist()
    }

    /// Selecting a tool clears what the other tools were showing.
    pub fn set_active_tool(&mut self, tool: Option<Tool>) {
        if self.active_tool == tool {
            return;
        }
        self.tools.retain(|t, _| Some(*t) == tool);
        self.active_tool = tool;
        self.generation += 1;
    }

    pub fn begin_tool(&mut self, tool: Tool) -> ToolRun {
        self.set_active_tool(Some(tool));
        self.generation += 1;
        self.tools.insert(
            tool,
            ToolState {
                result: None,
                loading: true,
                error: None,
            },
        );
        ToolRun {
            tool,
            generation: self.generation,
        }
    }

    /// Returns false when the run went stale and its outcome was dropped.
    pub fn finish_tool(&mut self, run: ToolRun, outcome: Result<Value, ClientError>) -> bool {
        if run.generation != self.generation {
            tracing::debug!(tool = ?run.tool, "Discarding stale tool result");
            return false;
        }
        let state = match outcome {
            Ok(result) => ToolState {
                result: Some(result),
                loading: false,
                error: None,
            },
            Err(e) => ToolState {
                result: None,
                loading: false,
                error: Some(e.user_message()),
            },
        };
        self.tools.insert(run.tool, state);
        true
    }

    /// Run an AI tool: idle, then loading, then success or error. Transient
    /// failures are retried twice with exponential backoff.
    pub async fn run_tool(&mut self, api: &dyn WorkspaceApi, tool: Tool, body: Value) -> ToolState {
        let run = self.begin_tool(tool);
        let outcome = call_with_retry(api, tool, &body).await;
        self.finish_tool(run, outcome);
        self.tool(tool)
    }

    /// Put a tool's generated copy into the editor and clear the result.
    pub fn insert_result(&mut self, tool: Tool, editor: &mut dyn Editor) -> bool {
        let Some(field) = tool.copy_field() else {
            return false;
        };
        let text = self
            .tools
            .get(&tool)
            .and_then(|state| state.result.as_ref())
            .and_then(|result| result.get(field))
            .and_then(Value::as_str)
            .map(str::to_string);

        match text {
            Some(html) => {
                editor.set_content(&html);
                self.tools.remove(&tool);
                true
            }
            None => false,
        }
    }

    pub fn clear_tool(&mut self, tool: Tool) {
        self.tools.remove(&tool);
    }

    fn persist(&mut self) -> Result<(), ClientError> {
        let snapshot = PersistedWorkspace {
            active_document: self.active_document.clone(),
            active_project_id: self.active_project_id,
            panels: self.panels.clone(),
        };
        match self.storage.as_mut() {
            Some(storage) => storage.set(WORKSPACE_KEY, &snapshot),
            None => Ok(()),
        }
    }
}

pub(crate) async fn call_with_retry(api: &dyn WorkspaceApi, tool: Tool, body: &Value) -> Result<Value, ClientError> {
    (|| async { api.call_tool(tool, body).await })
        .retry(
            &ExponentialBuilder::default()
                .with_min_delay(Duration::from_millis(500))
                .with_max_delay(Duration::from_secs(5))
                .with_max_times(2)
                .with_jitter(),
        )
        .when(ClientError::is_transient)
        .notify(|e, dur| {
            tracing::warn!("{} failed, retrying after {:.2}s: {}", tool.path(), dur.as_secs_f64(), e);
        })
        .await
}
