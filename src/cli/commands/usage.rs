use clap::Args;
use uuid::Uuid;

use crate::cli::utils::{connect_database, output_fields};
use crate::cli::OutputFormat;
use crate::database::models::{UsageLog, UsageTotals};
use crate::database::View;
use crate::filter::FilterData;
use crate::usage::{admin_rows, UsageSummary};

#[derive(Args)]
pub struct UsageArgs {
    #[arg(long, help = "One user's summary; every user when omitted")]
    pub user: Option<Uuid>,
}

pub async fn handle(args: UsageArgs, output_format: OutputFormat) -> anyhow::Result<()> {
    let db = connect_database()?;

    let Some(user_id) = args.user else {
        let rows = db.backend().select_view(View::UsageByUser, &FilterData::new()).await?;
        let totals = rows
            .into_iter()
            .map(|row| serde_json::from_value::<UsageTotals>(serde_json::Value::Object(row)))
            .collect::<Result<Vec<_>, _>>()?;
        let users = admin_rows(totals);
        match output_format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&users)?),
            OutputFormat::Text => {
                if users.is_empty() {
                    println!("No usage recorded");
                }
                for row in users {
                    let flag = if row.limit.is_over_limit { "  OVER LIMIT" } else { "" };
                    println!(
                        "{}  {:>6} calls  ${:>10}  {:>6}%{}",
                        row.user_id, row.usage.total_calls, row.usage.total_cost, row.limit.percent_used.round_dp(1), flag
                    );
                }
            }
        }
        return Ok(());
    };

    let repo = db.repo::<UsageLog>(user_id);
    let all_time: Vec<UsageTotals> = repo.view(View::UsageByUser).await?;
    let month: Vec<UsageTotals> = repo.view(View::UsageByUserCurrentMonth).await?;
    let summary = UsageSummary::new(all_time.into_iter().next(), month.into_iter().next());

    match output_format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
        OutputFormat::Text => output_fields(
            output_format,
            &format!("Usage for {}", user_id),
            &[
                ("calls", summary.all_time.total_calls.to_string()),
                ("tokens", summary.all_time.total_tokens.to_string()),
                ("cost (USD)", summary.all_time.total_cost.to_string()),
                ("this month (USD)", summary.current_month.total_cost.to_string()),
                ("limit (USD)", summary.limit.limit.to_string()),
                ("remaining (USD)", summary.limit.remaining_budget.to_string()),
                ("percent used", summary.limit.percent_used.round_dp(2).to_string()),
                ("over limit", summary.limit.is_over_limit.to_string()),
            ],
        )?,
    }
    Ok(())
}
