pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[command(name = "copyworx")]
#[command(about = "CopyWorx CLI - operator tooling for the CopyWorx API")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Mint a bearer token for local development")]
    Token(commands::token::TokenArgs),

    #[command(about = "Import a legacy workspace export for one user")]
    Import(commands::import::ImportArgs),

    #[command(about = "Show API usage and beta limit status")]
    Usage(commands::usage::UsageArgs),

    #[command(about = "Check configuration and backend connectivity")]
    Check,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);

    match cli.command {
        Commands::Token(args) => commands::token::handle(args, output_format),
        Commands::Import(args) => commands::import::handle(args, output_format).await,
        Commands::Usage(args) => commands::usage::handle(args, output_format).await,
        Commands::Check => commands::check::handle(output_format).await,
    }
}
