use serde_json::{json, Map, Value};

/// Tables owned by the application. Names never come from user input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Projects,
    Documents,
    Folders,
    Personas,
    BrandVoices,
    Snippets,
    UserSettings,
    ApiUsageLogs,
}

/// Read-only aggregation views over `api_usage_logs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum View {
    UsageByUser,
    UsageByUserCurrentMonth,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnDelete {
    Cascade,
    SetNull,
}

/// Foreign key edge, mirrored from `migrations/0001_initial.sql`.
#[derive(Debug, Clone, Copy)]
pub struct ForeignKey {
    pub child: Table,
    pub column: &'static str,
    pub parent: Table,
    pub on_delete: OnDelete,
}

pub const FOREIGN_KEYS: &[ForeignKey] = &[
    ForeignKey { child: Table::BrandVoices, column: "project_id", parent: Table::Projects, on_delete: OnDelete::Cascade },
    ForeignKey { child: Table::Personas, column: "project_id", parent: Table::Projects, on_delete: OnDelete::Cascade },
    ForeignKey { child: Table::Folders, column: "project_id", parent: Table::Projects, on_delete: OnDelete::Cascade },
    ForeignKey { child: Table::Folders, column: "parent_folder_id", parent: Table::Folders, on_delete: OnDelete::Cascade },
    ForeignKey { child: Table::Documents, column: "project_id", parent: Table::Projects, on_delete: OnDelete::Cascade },
    ForeignKey { child: Table::Documents, column: "folder_id", parent: Table::Folders, on_delete: OnDelete::SetNull },
    ForeignKey { child: Table::Documents, column: "parent_version_id", parent: Table::Documents, on_delete: OnDelete::SetNull },
    ForeignKey { child: Table::Snippets, column: "project_id", parent: Table::Projects, on_delete: OnDelete::Cascade },
    ForeignKey { child: Table::UserSettings, column: "active_project_id", parent: Table::Projects, on_delete: OnDelete::SetNull },
];

impl Table {
    pub const ALL: [Table; 8] = [
        Table::Projects,
        Table::Documents,
        Table::Folders,
        Table::Personas,
        Table::BrandVoices,
        Table::Snippets,
        Table::UserSettings,
        Table::ApiUsageLogs,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Table::Projects => "projects",
            Table::Documents => "documents",
            Table::Folders => "folders",
            Table::Personas => "personas",
            Table::BrandVoices => "brand_voices",
            Table::Snippets => "snippets",
            Table::UserSettings => "user_settings",
            Table::ApiUsageLogs => "api_usage_logs",
        }
    }

    pub fn primary_key(&self) -> &'static str {
        match self {
            Table::UserSettings => "user_id",
            _ => "id",
        }
    }

    /// Column refreshed on every update.
    pub fn touch_column(&self) -> Option<&'static str> {
        match self {
            Table::Documents => Some("modified_at"),
            Table::ApiUsageLogs => None,
            _ => Some("updated_at"),
        }
    }

    /// Column stamped on insert.
    pub fn created_column(&self) -> Option<&'static str> {
        match self {
            Table::UserSettings => None,
            Table::ApiUsageLogs => Some("timestamp"),
            _ => Some("created_at"),
        }
    }

    /// Column defaults the schema applies when an insert omits them.
    pub fn column_defaults(&self) -> Map<String, Value> {
        let defaults = match self {
            Table::Documents => json!({ "version": 1, "content": "" }),
            Table::Snippets => json!({ "usage_count": 0, "tags": [] }),
            Table::BrandVoices => json!({ "approved_phrases": [], "forbidden_words": [], "brand_values": [] }),
            Table::UserSettings => json!({ "settings": {} }),
            Table::ApiUsageLogs => json!({ "input_tokens": 0, "output_tokens": 0, "cost_usd": 0 }),
            _ => json!({}),
        };
        match defaults {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }
}

impl View {
    pub fn name(&self) -> &'static str {
        match self {
            View::UsageByUser => "usage_by_user",
            View::UsageByUserCurrentMonth => "usage_by_user_current_month",
        }
    }
}

/// Foreign keys pointing at `parent`.
pub fn referencing(parent: Table) -> impl Iterator<Item = &'static ForeignKey> {
    FOREIGN_KEYS.iter().filter(move |fk| fk.parent == parent)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_project_child_cascades() {
        let children: Vec<Table> = referencing(Table::Projects)
            .filter(|fk| fk.on_delete == OnDelete::Cascade)
            .map(|fk| fk.child)
            .collect();
        for table in [Table::BrandVoices, Table::Personas, Table::Folders, Table::Documents, Table::Snippets] {
            assert!(children.contains(&table), "{} should cascade from projects", table.name());
        }
    }

    #[test]
    fn settings_keyed_by_user() {
        assert_eq!(Table::UserSettings.primary_key(), "user_id");
        assert_eq!(Table::Documents.touch_column(), Some("modified_at"));
    }
}
