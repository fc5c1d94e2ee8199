// handlers/elevated/admin_usage.rs - GET /api/admin/usage handler
use axum::extract::State;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, warn};

use crate::database::View;
use crate::database::models::UsageTotals;
use crate::error::ApiError;
use crate::filter::FilterData;
use crate::middleware::{ApiResponse, ApiResult, Identity};
use crate::state::AppState;
use crate::types::money;
use crate::usage::{admin_rows, UserUsageRow};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminUsage {
    pub users: Vec<UserUsageRow>,
    pub total_users: usize,
    pub total_calls: i64,
    #[serde(with = "money")]
    pub total_cost: Decimal,
    pub users_over_limit: usize,
}

/// GET /api/admin/usage - Every user's usage, most expensive first
pub async fn get(State(state): State<AppState>, identity: Identity) -> ApiResult<AdminUsage> {
    let db = state.database()?;
    let user = identity.require()?;
    if !state.config.is_admin(user.email.as_deref()) {
        warn!(user_id = %user.user_id, "Non-admin requested the usage dashboard");
        return Err(ApiError::forbidden("Admin access required"));
    }

    let rows = db.backend().select_view(View::UsageByUser, &FilterData::new()).await?;
    let totals = rows
        .into_iter()
        .map(|row| serde_json::from_value::<UsageTotals>(serde_json::Value::Object(row)))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| ApiError::internal("Failed to read usage totals", e.to_string()))?;

    let users = admin_rows(totals);
    let summary = AdminUsage {
        total_users: users.len(),
        total_calls: users.iter().map(|u| u.usage.total_calls).sum(),
        total_cost: users.iter().map(|u| u.usage.total_cost).sum(),
        users_over_limit: users.iter().filter(|u| u.limit.is_over_limit).count(),
        users,
    };
    info!(admin = %user.user_id, users = summary.total_users, "Admin usage dashboard served");
    Ok(ApiResponse::success(summary))
}
