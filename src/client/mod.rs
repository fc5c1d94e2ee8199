//! Typed client for the CopyWorx API plus the editor-side state containers
//! built on it: workspace and tool state, auto-save, snippets and the usage
//! meter.

pub mod api;
pub mod autosave;
pub mod snippets;
pub mod storage;
pub mod usage;
pub mod workspace;

#[cfg(test)]
pub(crate) mod testing;

pub use api::{ApiClient, ClientError, Tool, WorkspaceApi};
pub use autosave::AutoSaver;
pub use snippets::SnippetStore;
pub use storage::LocalStorage;
pub use usage::UsageTracker;
pub use workspace::{ActiveDocument, Editor, PanelFlags, ToolState, WorkspaceStore};
