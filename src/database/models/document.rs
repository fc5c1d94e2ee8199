use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::database::repository::Model;
use crate::database::schema::Table;
use crate::validation::ValidationError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub project_id: Uuid,
    pub user_id: Uuid,
    pub base_title: String,
    pub title: String,
    pub version: i32,
    pub parent_version_id: Option<Uuid>,
    pub folder_id: Option<Uuid>,
    #[serde(default)]
    pub content: String,
    pub metadata: Option<DocumentMetadata>,
    pub template_progress: Option<TemplateProgress>,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl Model for Document {
    const TABLE: Table = Table::Documents;
}

impl Document {
    pub fn versioned_title(base_title: &str, version: i32) -> String {
        format!("{} v{}", base_title, version)
    }
}

/// Counts and tags the editor keeps alongside the content
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub word_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub char_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Where the user is in a multi-section template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateProgress {
    pub template_id: String,
    #[serde(default)]
    pub current_section: u32,
    pub total_sections: u32,
    #[serde(default)]
    pub completed_sections: Vec<String>,
    #[serde(default)]
    pub section_data: BTreeMap<String, SectionData>,
    #[serde(default)]
    pub is_complete: bool,
    pub started_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionData {
    #[serde(default)]
    pub form_data: Map<String, Value>,
    #[serde(default)]
    pub generated_content: String,
    #[serde(default)]
    pub is_modified: bool,
}

impl TemplateProgress {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let completed = self.completed_sections.len();
        let total = self.total_sections as usize;
        if completed > total {
            return Err(ValidationError::new(format!(
                "template_progress has {} completed sections but only {} in total",
                completed, total
            )));
        }
        if self.current_section >= self.total_sections.max(1) {
            return Err(ValidationError::new("template_progress currentSection is out of range"));
        }
        if self.is_complete && completed < total {
            return Err(ValidationError::new(
                "template_progress cannot be complete before every section is completed",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn progress(value: Value) -> TemplateProgress {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn title_tracks_version() {
        assert_eq!(Document::versioned_title("Hero", 2), "Hero v2");
    }

    #[test]
    fn metadata_keeps_unknown_keys() {
        let meta: DocumentMetadata =
            serde_json::from_value(json!({ "wordCount": 12, "templateId": "sales-email", "lastTool": "shorten" })).unwrap();
        assert_eq!(meta.word_count, Some(12));
        assert_eq!(meta.extra["lastTool"], json!("shorten"));
        let back = serde_json::to_value(&meta).unwrap();
        assert_eq!(back["lastTool"], json!("shorten"));
    }

    #[test]
    fn progress_invariants() {
        let ok = progress(json!({
            "templateId": "landing-page", "currentSection": 1, "totalSections": 3,
            "completedSections": ["hero"], "isComplete": false,
            "sectionData": { "hero": { "formData": { "product": "CRM" }, "generatedContent": "<p>x</p>", "isModified": false } }
        }));
        assert!(ok.validate().is_ok());

        let overfull = progress(json!({
            "templateId": "t", "totalSections": 1, "completedSections": ["a", "b"]
        }));
        assert!(overfull.validate().is_err());

        let premature = progress(json!({
            "templateId": "t", "totalSections": 2, "completedSections": ["a"], "isComplete": true
        }));
        assert!(premature.validate().is_err());

        let out_of_range = progress(json!({ "templateId": "t", "totalSections": 2, "currentSection": 2 }));
        assert!(out_of_range.validate().is_err());

        let done = progress(json!({
            "templateId": "t", "totalSections": 2, "currentSection": 1, "completedSections": ["a", "b"], "isComplete": true
        }));
        assert!(done.validate().is_ok());
    }
}
