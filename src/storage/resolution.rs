//! Resolution graph input
//!
//! The host build tool writes its resolved graphs as one JSON file:
//!
//! ```json
//! {"resolutions": [{"configuration": "runtimeClasspath", "root": 0,
//!   "nodes": [{"id": "com.example:app:1.0", "project": ":", "children": [1]},
//!             {"id": "org.slf4j:slf4j-api:2.0.9", "artifact": "libs/slf4j-api-2.0.9.jar",
//!              "repository": "MavenRepo", "children": []}]}]}
//! ```
//!
//! Relative file paths are relative to the JSON file.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::domain::Resolution;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionFile {
    #[serde(default)]
    pub resolutions: Vec<Resolution>,
}

impl ResolutionFile {
    /// Reads a graph file and makes its file paths absolute
    pub fn read(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read resolution graph: {}", path.display()))?;
        let mut file = Self::from_json(&content)
            .with_context(|| format!("Failed to parse resolution graph: {}", path.display()))?;

        if let Some(dir) = path.parent() {
            file.rebase(dir);
        }
        Ok(file)
    }

    pub fn from_json(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }

    /// Resolves relative artifact and descriptor paths against `base`
    pub fn rebase(&mut self, base: &Path) {
        let rebase = |path: &mut Option<PathBuf>| {
            if let Some(p) = path {
                if p.is_relative() {
                    *p = base.join(&*p);
                }
            }
        };

        for node in self.resolutions.iter_mut().flat_map(|r| r.nodes.iter_mut()) {
            rebase(&mut node.origin.artifact);
            rebase(&mut node.origin.descriptor);
        }
    }

    /// Resolutions for the given configurations, in file order
    pub fn select(&self, configurations: &[String]) -> Vec<&Resolution> {
        for configuration in configurations {
            if !self.resolutions.iter().any(|r| &r.configuration == configuration) {
                tracing::warn!(%configuration, "Configuration not present in resolution graph");
            }
        }

        self.resolutions
            .iter()
            .filter(|r| configurations.contains(&r.configuration))
            .collect()
    }
}
