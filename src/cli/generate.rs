//! `generate` command

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use super::output::Output;
use crate::domain::ambient_properties;
use crate::maven::CachingSource;
use crate::pipeline::{self, creation_info};
use crate::storage::{spdx, Config, LocalRepository, ResolutionFile};

#[derive(Debug, Args)]
pub struct GenerateArgs {
    /// Resolution graph JSON written by the build
    #[arg(long, short = 'g')]
    pub graph: PathBuf,

    /// Configuration file (defaults to the nearest sbom.toml)
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// Directory for `<target>.spdx.json` files
    #[arg(long, short = 'o', default_value = "build/spdx")]
    pub output_dir: PathBuf,

    /// Targets to generate (defaults to every configured target)
    #[arg(long = "target", short = 't')]
    pub targets: Vec<String>,

    /// Maven-layout repository holding descriptors
    #[arg(long)]
    pub local_repository: Option<PathBuf>,

    /// Fixed creation time, seconds since the epoch
    #[arg(long, env = "SOURCE_DATE_EPOCH", hide = true)]
    pub source_date_epoch: Option<String>,
}

#[derive(Debug, Serialize)]
struct GeneratedDocument {
    target: String,
    path: PathBuf,
    packages: usize,
    relationships: usize,
}

pub fn run(args: GenerateArgs, output: &Output) -> Result<()> {
    let config = Config::load(args.config.as_deref())?;
    match &config.path {
        Some(path) => tracing::debug!(config = %path.display(), "Loaded configuration"),
        None => tracing::debug!("No sbom.toml found, using defaults"),
    }

    let graphs = ResolutionFile::read(&args.graph)?;

    let repository = args
        .local_repository
        .or_else(|| config.sbom.resolver.local_repository())
        .context("Could not determine the local repository; set resolver.local_repository")?;
    tracing::debug!(repository = %repository.display(), "Using local repository");
    let source = CachingSource::new(LocalRepository::new(repository));

    let ambient = ambient_properties(std::env::vars(), &config.sbom.properties);
    let creation = creation_info(args.source_date_epoch.as_deref());

    let targets = if args.targets.is_empty() {
        config.sbom.target_names()
    } else {
        args.targets
    };

    let mut written = Vec::new();
    for target in targets {
        let document = pipeline::generate(
            &config.sbom,
            &graphs,
            &target,
            &source,
            &ambient,
            creation.clone(),
        )
        .with_context(|| format!("Failed to generate SBOM for target '{}'", target))?;

        let path = args.output_dir.join(spdx::file_name(&target));
        spdx::write_document(&document, &path)?;

        written.push(GeneratedDocument {
            packages: document.packages.len(),
            relationships: document.relationships.len(),
            target,
            path,
        });
    }
    tracing::debug!(descriptors = source.len(), "Descriptor cache size");

    if output.is_json() {
        output.data(&written);
    } else {
        for doc in &written {
            output.success(&format!(
                "Wrote {} ({} packages, {} relationships)",
                doc.path.display(),
                doc.packages,
                doc.relationships
            ));
        }
    }

    Ok(())
}
