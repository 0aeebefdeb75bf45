//! `effective-pom` command

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use super::output::Output;
use crate::domain::{ambient_properties, extract, EffectiveDescriptor, PackageMetadata};
use crate::maven::{resolve_effective, DescriptorFile};
use crate::storage::{Config, LocalRepository};

#[derive(Debug, Args)]
pub struct EffectivePomArgs {
    /// POM file to resolve
    pub pom: PathBuf,

    /// Maven-layout repository holding parent descriptors
    #[arg(long)]
    pub local_repository: Option<PathBuf>,

    /// Configuration file (defaults to the nearest sbom.toml)
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,
}

pub fn run(args: EffectivePomArgs, output: &Output) -> Result<()> {
    let config = Config::load(args.config.as_deref())?;
    let repository = args
        .local_repository
        .or_else(|| config.sbom.resolver.local_repository())
        .context("Could not determine the local repository; pass --local-repository")?;
    let source = LocalRepository::new(repository);
    tracing::debug!(repository = %source.root().display(), "Using local repository");
    let ambient = ambient_properties(std::env::vars(), &config.sbom.properties);

    let file = DescriptorFile::read(&args.pom)?;
    let effective = resolve_effective(&file, &source, &ambient)
        .with_context(|| format!("Failed to resolve {}", args.pom.display()))?;
    let component = effective
        .component_id()
        .with_context(|| format!("{} has no complete coordinates", args.pom.display()))?;
    let metadata = extract(&component, &effective);

    if output.is_json() {
        output.data(&serde_json::json!({
            "component": component,
            "descriptor": effective,
            "metadata": metadata,
        }));
    } else {
        output.field("Component", &component.to_string());
        print_text(output, &effective, &metadata);
    }
    Ok(())
}

fn print_text(output: &Output, effective: &EffectiveDescriptor, metadata: &PackageMetadata) {
    let model = effective.model();
    let or_none = |v: Option<&str>| v.unwrap_or("(none)").to_string();

    output.field("Name", &or_none(metadata.name.as_deref()));
    output.field("Description", &or_none(metadata.description.as_deref()));
    output.field("Homepage", &or_none(Some(metadata.homepage_str()).filter(|s| !s.is_empty())));
    output.field("Organization", &or_none(metadata.organization.as_deref()));
    if let Some(parent) = model.parent.as_ref().and_then(|p| p.component_id()) {
        output.field("Parent", &parent.to_string());
    }

    output.field("Licenses", &metadata.licenses.len().to_string());
    for license in &metadata.licenses {
        output.item(&format!("{} ({})", license.name, license.url));
    }

    output.field("Developers", &metadata.developers.len().to_string());
    for developer in &metadata.developers {
        let name = developer.name.as_deref().unwrap_or("(unnamed)");
        match &developer.email {
            Some(email) => output.item(&format!("{} <{}>", name, email)),
            None => output.item(name),
        }
    }

    output.field("Managed deps", &model.dependency_management.len().to_string());
    output.field("Dependencies", &model.dependencies.len().to_string());
}
