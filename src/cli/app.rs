//! Main CLI application structure

use anyhow::Result;
use clap::{Parser, Subcommand};

use super::output::{Output, OutputFormat};
use super::{effective, generate};

#[derive(Parser)]
#[command(name = "spdx-sbom")]
#[command(author, version, about = "Generate SPDX SBOMs from resolved dependency graphs")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Enable debug logging (RUST_LOG overrides)
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write one SPDX document per target
    Generate(generate::GenerateArgs),

    /// Show the effective form of a POM and the metadata extracted from it
    EffectivePom(effective::EffectivePomArgs),
}

/// Main entry point for the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    crate::telemetry::init(cli.verbose);
    let output = Output::new(cli.format);

    match cli.command {
        Commands::Generate(args) => generate::run(args, &output)?,
        Commands::EffectivePom(args) => effective::run(args, &output)?,
    }

    tracing::debug!("Command completed successfully");
    Ok(())
}
