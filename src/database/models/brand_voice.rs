use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::database::repository::Model;
use crate::database::schema::Table;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrandVoice {
    pub id: Uuid,
    pub project_id: Option<Uuid>,
    pub user_id: Uuid,
    pub brand_name: String,
    pub brand_tone: Option<String>,
    #[serde(default)]
    pub approved_phrases: Vec<String>,
    #[serde(default)]
    pub forbidden_words: Vec<String>,
    #[serde(default)]
    pub brand_values: Vec<String>,
    pub mission_statement: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model for BrandVoice {
    const TABLE: Table = Table::BrandVoices;
}
