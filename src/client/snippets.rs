use uuid::Uuid;

use super::api::{ClientError, WorkspaceApi};
use super::workspace::Editor;
use crate::database::models::Snippet;

/// The active project's snippet library
#[derive(Debug, Default)]
pub struct SnippetStore {
    project_id: Option<Uuid>,
    snippets: Vec<Snippet>,
}

impl SnippetStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn load(&mut self, api: &dyn WorkspaceApi, project_id: Uuid) -> Result<(), ClientError> {
        let snippets = api.list_snippets(project_id).await?;
        tracing::debug!(%project_id, count = snippets.len(), "Loaded snippets");
        self.project_id = Some(project_id);
        self.snippets = snippets;
        Ok(())
    }

    pub fn project_id(&self) -> Option<Uuid> {
        self.project_id
    }

    pub fn all(&self) -> &[Snippet] {
        &self.snippets
    }

    /// Case-insensitive match on name, content, description or any tag.
    pub fn search(&self, query: &str) -> Vec<&Snippet> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return self.snippets.iter().collect();
        }
        self.snippets
            .iter()
            .filter(|s| {
                s.name.to_lowercase().contains(&needle)
                    || s.content.to_lowercase().contains(&needle)
                    || s.description.as_deref().is_some_and(|d| d.to_lowercase().contains(&needle))
                    || s.tags.iter().any(|t| t.to_lowercase().contains(&needle))
            })
            .collect()
    }

    /// Insert a snippet into the editor and count the use. The server count
    /// wins when it answers; otherwise the local count is bumped by one.
    pub async fn insert(&mut self, api: &dyn WorkspaceApi, id: Uuid, editor: &mut dyn Editor) -> Result<(), ClientError> {
        let index = self
            .snippets
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| ClientError::Storage(format!("snippet {} is not loaded", id)))?;

        editor.insert_at_cursor(&self.snippets[index].content);

        match api.increment_snippet(id).await {
            Ok(updated) => self.snippets[index] = updated,
            Err(e) => {
                tracing::warn!(%id, error = %e, "Failed to record snippet use");
                self.snippets[index].usage_count += 1;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::testing::{snippet, ScriptedApi};

    #[tokio::test]
    async fn search_matches_fields_and_tags() {
        let project_id = Uuid::new_v4();
        let api = ScriptedApi::default();
        let mut cta = snippet(project_id, "Footer CTA", "<p>Book a demo today</p>");
        cta.tags = vec!["Conversion".into()];
        let mut legal = snippet(project_id, "Legal", "<p>Terms apply</p>");
        legal.description = Some("Disclaimer for promos".into());
        api.set_snippets(vec![cta, legal]);

        let mut store = SnippetStore::new();
        store.load(&api, project_id).await.unwrap();

        assert_eq!(store.search("demo").len(), 1);
        assert_eq!(store.search("CONVERSION")[0].name, "Footer CTA");
        assert_eq!(store.search("promos")[0].name, "Legal");
        assert_eq!(store.search("  ").len(), 2);
        assert!(store.search("pricing").is_empty());
    }

    #[tokio::test]
    async fn insert_counts_usage_on_both_sides() {
        let project_id = Uuid::new_v4();
        let api = ScriptedApi::default();
        let cta = snippet(project_id, "CTA", "<p>Start free</p>");
        let id = cta.id;
        api.set_snippets(vec![cta]);

        let mut store = SnippetStore::new();
        store.load(&api, project_id).await.unwrap();

        let mut editor = String::new();
        store.insert(&api, id, &mut editor).await.unwrap();
        store.insert(&api, id, &mut editor).await.unwrap();

        assert_eq!(editor, "<p>Start free</p><p>Start free</p>");
        assert_eq!(store.all()[0].usage_count, 2);
        assert_eq!(api.snippet_usage(id), Some(2));
    }

    #[tokio::test]
    async fn unknown_snippet_is_an_error() {
        let api = ScriptedApi::default();
        let mut store = SnippetStore::new();
        let mut editor = String::from("unchanged");
        assert!(store.insert(&api, Uuid::new_v4(), &mut editor).await.is_err());
        assert_eq!(editor, "unchanged");
    }
}
