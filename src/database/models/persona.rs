use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::database::repository::Model;
use crate::database::schema::Table;

/// Target-audience profile used to steer generation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Persona {
    pub id: Uuid,
    pub project_id: Option<Uuid>,
    pub user_id: Uuid,
    pub name: String,
    pub photo_url: Option<String>,
    pub demographics: Option<String>,
    pub psychographics: Option<String>,
    pub pain_points: Option<String>,
    pub language_patterns: Option<String>,
    pub goals: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model for Persona {
    const TABLE: Table = Table::Personas;
}
