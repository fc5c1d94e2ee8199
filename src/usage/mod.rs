//! Per-user usage aggregation and the advisory beta limit.

pub mod recorder;

pub use recorder::{RecorderStats, UsageEvent, UsageRecorder};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::database::models::UsageTotals;
use crate::types::{money, BETA_LIMIT_USD};

/// Limit fields derived from a total cost. Advisory only; nothing blocks on them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LimitStatus {
    #[serde(with = "money")]
    pub limit: Decimal,
    pub is_over_limit: bool,
    #[serde(with = "money")]
    pub remaining_budget: Decimal,
    /// Not capped at 100; display code clamps.
    #[serde(with = "money")]
    pub percent_used: Decimal,
}

impl LimitStatus {
    pub fn for_cost(total_cost: Decimal) -> Self {
        Self {
            limit: BETA_LIMIT_USD,
            is_over_limit: total_cost >= BETA_LIMIT_USD,
            remaining_budget: (BETA_LIMIT_USD - total_cost).max(Decimal::ZERO),
            percent_used: (total_cost / BETA_LIMIT_USD * Decimal::ONE_HUNDRED).normalize(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsagePeriod {
    pub total_calls: i64,
    pub total_input_tokens: i64,
    pub total_output_tokens: i64,
    pub total_tokens: i64,
    #[serde(with = "money")]
    pub total_cost: Decimal,
    pub last_call_at: Option<DateTime<Utc>>,
}

impl From<UsageTotals> for UsagePeriod {
    fn from(t: UsageTotals) -> Self {
        Self {
            total_calls: t.total_calls,
            total_input_tokens: t.total_input_tokens,
            total_output_tokens: t.total_output_tokens,
            total_tokens: t.total_tokens,
            total_cost: t.total_cost,
            last_call_at: t.last_call_at,
        }
    }
}

/// Body of `GET /api/usage`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageSummary {
    #[serde(flatten)]
    pub all_time: UsagePeriod,
    #[serde(flatten)]
    pub limit: LimitStatus,
    pub current_month: UsagePeriod,
}

impl UsageSummary {
    pub fn new(all_time: Option<UsageTotals>, current_month: Option<UsageTotals>) -> Self {
        let all_time: UsagePeriod = all_time.map(Into::into).unwrap_or_default();
        Self {
            limit: LimitStatus::for_cost(all_time.total_cost),
            all_time,
            current_month: current_month.map(Into::into).unwrap_or_default(),
        }
    }
}

/// One row of the admin dashboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserUsageRow {
    pub user_id: uuid::Uuid,
    #[serde(flatten)]
    pub usage: UsagePeriod,
    #[serde(flatten)]
    pub limit: LimitStatus,
}

/// All users' totals, most expensive first.
pub fn admin_rows(totals: Vec<UsageTotals>) -> Vec<UserUsageRow> {
    let mut rows: Vec<UserUsageRow> = totals
        .into_iter()
        .map(|t| UserUsageRow {
            user_id: t.user_id,
            limit: LimitStatus::for_cost(t.total_cost),
            usage: t.into(),
        })
        .collect();
    rows.sort_by(|a, b| b.usage.total_cost.cmp(&a.usage.total_cost));
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn totals(cost: Decimal) -> UsageTotals {
        UsageTotals {
            user_id: uuid::Uuid::new_v4(),
            total_calls: 2,
            total_input_tokens: 300,
            total_output_tokens: 200,
            total_tokens: 500,
            total_cost: cost,
            last_call_at: None,
        }
    }

    #[test]
    fn percent_used_for_two_calls() {
        let status = LimitStatus::for_cost(Decimal::new(39, 4));
        assert_eq!(status.percent_used, Decimal::new(78, 3));
        assert!(!status.is_over_limit);
        assert_eq!(status.remaining_budget, Decimal::new(49961, 4));
    }

    #[test]
    fn limit_edges() {
        let at_limit = LimitStatus::for_cost(Decimal::new(5, 0));
        assert!(at_limit.is_over_limit);
        assert_eq!(at_limit.remaining_budget, Decimal::ZERO);

        let over = LimitStatus::for_cost(Decimal::new(75, 1));
        assert_eq!(over.remaining_budget, Decimal::ZERO);
        assert_eq!(over.percent_used, Decimal::new(150, 0));
    }

    #[test]
    fn summary_serializes_flat() {
        let summary = UsageSummary::new(Some(totals(Decimal::new(39, 4))), None);
        let body = serde_json::to_value(&summary).unwrap();
        assert_eq!(body["totalCost"], json!(0.0039));
        assert_eq!(body["percentUsed"], json!(0.078));
        assert_eq!(body["isOverLimit"], json!(false));
        assert_eq!(body["limit"], json!(5.0));
        assert_eq!(body["currentMonth"]["totalCalls"], json!(0));
    }

    #[test]
    fn admin_rows_sorted_by_cost() {
        let rows = admin_rows(vec![totals(Decimal::new(1, 0)), totals(Decimal::new(6, 0)), totals(Decimal::new(3, 0))]);
        let costs: Vec<Decimal> = rows.iter().map(|r| r.usage.total_cost).collect();
        assert_eq!(costs, vec![Decimal::new(6, 0), Decimal::new(3, 0), Decimal::new(1, 0)]);
        assert!(rows[0].limit.is_over_limit);
    }
}
