use chrono::Duration;
use clap::Args;
use serde_json::json;
use uuid::Uuid;

use crate::auth::{mint_token, Claims};
use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::config::config;

#[derive(Args)]
pub struct TokenArgs {
    #[arg(long, help = "User id to put in the token subject (random when omitted)")]
    pub user: Option<Uuid>,

    #[arg(long, help = "E-mail claim; admin e-mails unlock /api/admin/usage")]
    pub email: Option<String>,

    #[arg(long, default_value_t = 24, help = "Lifetime in hours")]
    pub ttl_hours: i64,
}

pub fn handle(args: TokenArgs, output_format: OutputFormat) -> anyhow::Result<()> {
    let (claims, token) = issue(args, config().auth.jwt_secret.as_deref())?;

    match output_format {
        OutputFormat::Json => output_success(
            output_format,
            "Token minted",
            Some(json!({ "token": token, "user_id": claims.sub, "expires_at": claims.exp })),
        ),
        OutputFormat::Text => {
            // bare token so it can be captured with $(copyworx token)
            println!("{}", token);
            Ok(())
        }
    }
}

fn issue(args: TokenArgs, secret: Option<&str>) -> anyhow::Result<(Claims, String)> {
    if args.ttl_hours <= 0 {
        anyhow::bail!("--ttl-hours must be positive");
    }
    let user_id = args.user.unwrap_or_else(Uuid::new_v4);
    let claims = Claims::new(user_id, args.email, Duration::hours(args.ttl_hours));
    let token = mint_token(&claims, secret)?;
    Ok((claims, token))
}
