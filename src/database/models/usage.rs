use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::database::repository::Model;
use crate::database::schema::Table;
use crate::types::money;

/// Append-only record of one LLM call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageLog {
    pub id: Uuid,
    pub user_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub model: String,
    pub input_tokens: i64,
    pub output_tokens: i64,
    pub feature: String,
    #[serde(with = "money")]
    pub cost_usd: Decimal,
}

impl Model for UsageLog {
    const TABLE: Table = Table::ApiUsageLogs;
}

/// Row of the `usage_by_user` / `usage_by_user_current_month` views
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageTotals {
    pub user_id: Uuid,
    pub total_calls: i64,
    pub total_input_tokens: i64,
    pub total_output_tokens: i64,
    pub total_tokens: i64,
    #[serde(with = "money")]
    pub total_cost: Decimal,
    pub last_call_at: Option<DateTime<Utc>>,
}
