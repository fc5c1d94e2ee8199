use crate::cli::utils::output_fields;
use crate::cli::OutputFormat;
use crate::config::config;
use crate::database::Database;

pub async fn handle(output_format: OutputFormat) -> anyhow::Result<()> {
    let config = config();

    let database = match &config.database.url {
        None => "not configured (persistence routes answer 503)".to_string(),
        Some(_) => match Database::connect(&config.database) {
            Err(e) => format!("invalid: {}", e),
            Ok(db) => match db.health_check().await {
                Ok(()) => format!("ok ({})", db.backend().backend_name()),
                Err(e) => format!("unreachable: {}", e),
            },
        },
    };
    let llm = match &config.llm.api_key {
        Some(_) => format!("configured ({})", config.llm.model),
        None => "not configured (AI routes answer 500)".to_string(),
    };
    let auth = match &config.auth.jwt_secret {
        Some(_) => "configured".to_string(),
        None => "not configured (protected routes answer 401)".to_string(),
    };

    output_fields(
        output_format,
        "CopyWorx configuration",
        &[
            ("environment", format!("{:?}", config.environment)),
            ("port", config.server.port.to_string()),
            ("database", database),
            ("llm", llm),
            ("auth", auth),
            ("admin e-mails", config.auth.admin_emails.join(", ")),
        ],
    )
}
