//! Project, document, SCM and repository information
//!
//! Plain values supplied once per output document. Every field that can be
//! left unset has a documented default, so none of these ever fail.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use url::Url;

use super::id::ComponentId;

pub const DEFAULT_NAMESPACE: &str = "https://example.com/UUID";
pub const DEFAULT_SCM_TOOL: &str = "git";
pub const NO_SCM_REVISION: &str = "<no-scm-revision>";
pub const NO_SCM_URI: &str = "<no-scm-uri>";

/// Optional per-project package overrides
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackageOverrides {
    pub supplier: Option<String>,
    pub originator: Option<String>,
    pub homepage: Option<Url>,
    pub license_declared: Option<String>,
    pub comment: Option<String>,
}

/// A build project that can appear as a component in the resolution graph
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectInfo {
    /// Build path of the project (e.g., `:` or `:core`)
    pub path: String,
    pub name: String,
    pub group: String,
    pub version: String,
    pub description: Option<String>,
    pub package: Option<PackageOverrides>,
}

/// Document-level identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentInfo {
    /// Defaults to the documented project's name
    pub name: Option<String>,
    pub namespace: String,
    /// Extra creator entry (e.g., `Organization: Example Corp`)
    pub creator: Option<String>,
}

impl Default for DocumentInfo {
    fn default() -> Self {
        Self {
            name: None,
            namespace: DEFAULT_NAMESPACE.to_string(),
            creator: None,
        }
    }
}

impl DocumentInfo {
    /// The document name, falling back to `project_name`
    pub fn name_or<'a>(&'a self, project_name: &'a str) -> &'a str {
        self.name.as_deref().unwrap_or(project_name)
    }
}

/// Source-control information for the documented project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScmInfo {
    pub tool: String,
    pub revision: String,
    pub uri: String,
}

impl Default for ScmInfo {
    fn default() -> Self {
        Self {
            tool: DEFAULT_SCM_TOOL.to_string(),
            revision: NO_SCM_REVISION.to_string(),
            uri: NO_SCM_URI.to_string(),
        }
    }
}

impl ScmInfo {
    /// Download location in SPDX VCS form: `{tool}+{uri}@{revision}`
    pub fn source_repo(&self) -> String {
        format!("{}+{}@{}", self.tool, self.uri, self.revision)
    }
}

/// Repository name → base URI
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RepositoryInfo(BTreeMap<String, Url>);

impl RepositoryInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, base: Url) {
        self.0.insert(name.into(), base);
    }

    pub fn get(&self, name: &str) -> Option<&Url> {
        self.0.get(name)
    }

    /// Iterates repositories in name order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Url)> {
        self.0.iter()
    }

    /// Where `file_name` of `id` lives in repository `name`, if known
    pub fn download_location(&self, name: &str, id: &ComponentId, file_name: &str) -> Option<String> {
        let base = self.get(name)?;
        Some(format!(
            "{}/{}/{}",
            base.as_str().trim_end_matches('/'),
            id.repository_path(),
            file_name
        ))
    }
}
