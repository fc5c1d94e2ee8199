use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::database::repository::Model;
use crate::database::schema::Table;

/// One row per user, keyed by `user_id`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSettings {
    pub user_id: Uuid,
    pub active_project_id: Option<Uuid>,
    #[serde(default)]
    pub settings: Map<String, Value>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Model for UserSettings {
    const TABLE: Table = Table::UserSettings;
}
