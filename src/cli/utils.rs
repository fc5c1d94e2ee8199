use serde_json::{json, Value};

use crate::cli::OutputFormat;
use crate::config::config;
use crate::database::Database;

/// Output a success message in the appropriate format
pub fn output_success(output_format: OutputFormat, message: &str, data: Option<Value>) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": true,
                "message": message
            });
            if let (Some(target), Some(Value::Object(extra))) = (response.as_object_mut(), data) {
                target.extend(extra);
            }
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            println!("✓ {}", message);
        }
    }
    Ok(())
}

/// Print a labelled list of `(label, value)` rows in the appropriate format
pub fn output_fields(output_format: OutputFormat, title: &str, fields: &[(&str, String)]) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let object: serde_json::Map<String, Value> = fields
                .iter()
                .map(|(label, value)| (label.to_string(), json!(value)))
                .collect();
            println!("{}", serde_json::to_string_pretty(&json!({ title: object }))?);
        }
        OutputFormat::Text => {
            println!("{}", title);
            let width = fields.iter().map(|(label, _)| label.len()).max().unwrap_or(0);
            for (label, value) in fields {
                println!("  {:width$}  {}", label, value, width = width);
            }
        }
    }
    Ok(())
}

/// Database from the environment, or a clear error when DATABASE_URL is missing
pub fn connect_database() -> anyhow::Result<Database> {
    let settings = &config().database;
    if settings.url.is_none() {
        anyhow::bail!("DATABASE_URL is not set");
    }
    Ok(Database::connect(settings)?)
}
