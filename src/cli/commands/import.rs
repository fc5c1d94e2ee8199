use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;
use uuid::Uuid;

use crate::cli::utils::{connect_database, output_fields};
use crate::cli::OutputFormat;
use crate::migration::{Importer, LegacyWorkspace, MigrationReport};

#[derive(Args)]
pub struct ImportArgs {
    #[arg(help = "Legacy workspace export (JSON)")]
    pub file: PathBuf,

    #[arg(long, help = "Owner of the imported rows")]
    pub user: Uuid,
}

pub async fn handle(args: ImportArgs, output_format: OutputFormat) -> anyhow::Result<()> {
    let workspace = read_export(&args.file)?;
    let db = connect_database()?;
    let report = Importer::new(&db, args.user).run(workspace).await;

    if let OutputFormat::Json = output_format {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        output_fields(output_format, "Import finished", &summary(&report))?;
        for error in &report.errors {
            eprintln!("  ! {}", error);
        }
    }

    if report.is_partial() {
        anyhow::bail!("{} item(s) failed to import", report.errors.len());
    }
    Ok(())
}

fn read_export(path: &Path) -> anyhow::Result<LegacyWorkspace> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

fn summary(report: &MigrationReport) -> Vec<(&'static str, String)> {
    let counts = &report.imported;
    vec![
        ("projects", counts.projects.to_string()),
        ("brand voices", counts.brand_voices.to_string()),
        ("personas", counts.personas.to_string()),
        ("folders", counts.folders.to_string()),
        ("documents", counts.documents.to_string()),
        ("snippets", counts.snippets.to_string()),
        ("errors", report.errors.len().to_string()),
    ]
}
