//! Configuration handling
//!
//! Configuration is stored in `sbom.toml`, found by walking up from the
//! current directory or given explicitly with `--config`. Every section is
//! optional.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{DocumentInfo, ProjectInfo, Properties, RepositoryInfo, ScmInfo};

pub const CONFIG_FILE: &str = "sbom.toml";
pub const DEFAULT_TARGET: &str = "main";
pub const DEFAULT_CONFIGURATION: &str = "runtimeClasspath";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to parse configuration: {0}")]
    Parse(String),

    #[error("Unknown target '{0}'")]
    UnknownTarget(String),
}

/// What to do when a library's descriptor cannot be resolved
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum OnDescriptorError {
    /// Fail the whole run
    #[default]
    Abort,
    /// Warn and emit the package with empty metadata
    EmptyMetadata,
}

impl OnDescriptorError {
    pub fn as_str(&self) -> &str {
        match self {
            OnDescriptorError::Abort => "abort",
            OnDescriptorError::EmptyMetadata => "empty-metadata",
        }
    }
}

/// One output document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TargetConfig {
    /// Resolution configurations to include (e.g., `runtimeClasspath`)
    pub configurations: Vec<String>,

    pub document: DocumentInfo,

    pub scm: ScmInfo,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            configurations: vec![DEFAULT_CONFIGURATION.to_string()],
            document: DocumentInfo::default(),
            scm: ScmInfo::default(),
        }
    }
}

/// Descriptor resolution settings
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct ResolverConfig {
    /// Maven-layout repository to fetch descriptors from (default `~/.m2/repository`)
    pub local_repository: Option<PathBuf>,

    /// Worker threads, 0 for available parallelism
    pub jobs: usize,

    pub on_descriptor_error: OnDescriptorError,
}

impl ResolverConfig {
    /// The configured local repository, falling back to `~/.m2/repository`
    pub fn local_repository(&self) -> Option<PathBuf> {
        self.local_repository
            .clone()
            .or_else(Self::default_local_repository)
    }

    pub fn default_local_repository() -> Option<PathBuf> {
        BaseDirs::new().map(|dirs| dirs.home_dir().join(".m2").join("repository"))
    }

    /// Effective worker count
    pub fn jobs(&self) -> usize {
        if self.jobs > 0 {
            return self.jobs;
        }
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    }
}

/// Contents of `sbom.toml`
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct SbomConfig {
    pub projects: Vec<ProjectInfo>,

    pub targets: BTreeMap<String, TargetConfig>,

    pub repositories: RepositoryInfo,

    pub resolver: ResolverConfig,

    /// Extra ambient properties, layered over the process environment
    pub properties: Properties,
}

impl SbomConfig {
    /// Looks up a target; `main` always exists when no target is configured
    pub fn target(&self, name: &str) -> Result<TargetConfig, ConfigError> {
        if self.targets.is_empty() && name == DEFAULT_TARGET {
            return Ok(TargetConfig::default());
        }
        self.targets
            .get(name)
            .cloned()
            .ok_or_else(|| ConfigError::UnknownTarget(name.to_string()))
    }

    /// Configured target names in order, or just `main`
    pub fn target_names(&self) -> Vec<String> {
        if self.targets.is_empty() {
            return vec![DEFAULT_TARGET.to_string()];
        }
        self.targets.keys().cloned().collect()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let mut paths = std::collections::HashSet::new();
        for project in &self.projects {
            if project.path.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "project '{}' has no path",
                    project.name
                )));
            }
            if !paths.insert(project.path.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "project path '{}' is configured twice",
                    project.path
                )));
            }
        }
        for (name, target) in &self.targets {
            if target.configurations.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "target '{}' selects no configurations",
                    name
                )));
            }
        }
        Ok(())
    }
}

/// Loaded configuration and where it came from
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub sbom: SbomConfig,
    pub path: Option<PathBuf>,
}

impl Config {
    /// Loads `explicit` if given, else the nearest `sbom.toml`, else defaults
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => match Self::find_config() {
                Some(path) => Self::from_file(&path),
                None => Ok(Self::default()),
            },
        }
    }

    /// Loads configuration from a specific file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;

        let mut sbom: SbomConfig = toml::from_str(&content)
            .map_err(|e| ConfigError::Parse(e.to_string()))
            .with_context(|| format!("Failed to parse config: {}", path.display()))?;
        sbom.validate()
            .with_context(|| format!("Invalid config: {}", path.display()))?;

        // Relative repository paths are relative to the config file
        if let (Some(repo), Some(dir)) = (sbom.resolver.local_repository.as_mut(), path.parent()) {
            if repo.is_relative() {
                *repo = dir.join(&*repo);
            }
        }

        Ok(Self {
            sbom,
            path: Some(path.to_path_buf()),
        })
    }

    /// Finds `sbom.toml` in the current directory or one of its ancestors
    pub fn find_config() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;
        Self::find_config_from(&current)
    }

    pub fn find_config_from(start: &Path) -> Option<PathBuf> {
        let mut current = start.to_path_buf();

        loop {
            let candidate = current.join(CONFIG_FILE);
            if candidate.is_file() {
                return Some(candidate);
            }

            if !current.pop() {
                return None;
            }
        }
    }
}
