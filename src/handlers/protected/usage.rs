// handlers/protected/usage.rs - GET /api/usage handler
use axum::extract::State;
use futures::try_join;

use super::caller;
use crate::database::models::{UsageLog, UsageTotals};
use crate::database::View;
use crate::middleware::{ApiResponse, ApiResult, Identity};
use crate::state::AppState;
use crate::usage::UsageSummary;

/// GET /api/usage - All-time and current-month totals plus the beta limit fields
pub async fn get(State(state): State<AppState>, identity: Identity) -> ApiResult<UsageSummary> {
    let (db, user) = caller(&state, &identity)?;
    let repo = db.repo::<UsageLog>(user.user_id);

    let (all_time, current_month) = try_join!(
        repo.view::<UsageTotals>(View::UsageByUser),
        repo.view::<UsageTotals>(View::UsageByUserCurrentMonth)
    )?;
    Ok(ApiResponse::success(UsageSummary::new(
        all_time.into_iter().next(),
        current_month.into_iter().next(),
    )))
}
