//! Component and document identifiers
//!
//! ID Format:
//! - Component identity: `{group}:{artifact}:{version}` (e.g., `org.slf4j:slf4j-api:2.0.9`)
//! - Package SPDX ID: `SPDXRef-{group}-{artifact}-{10-char-hash}`
//! - License reference: `LicenseRef-{10-char-hash}`
//!
//! Hashes are derived from the identity text only, so the same component
//! always maps to the same SPDX ID, independent of traversal order or run.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum IdError {
    #[error("Invalid component identity: expected '{{group}}:{{artifact}}:{{version}}', got '{0}'")]
    InvalidComponentId(String),

    #[error("Invalid SPDX ID: '{0}'")]
    InvalidSpdxId(String),
}

const HASH_LEN: usize = 10;

/// Generates a short hex digest of the given text
fn generate_hash(input: &str) -> String {
    let hash = blake3::hash(input.as_bytes());
    let hex = hash.to_hex();
    hex[..HASH_LEN].to_string()
}

/// Replaces every character outside `[A-Za-z0-9.-]` with `-`
fn sanitize(part: &str) -> String {
    part.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' {
                c
            } else {
                '-'
            }
        })
        .collect()
}

/// The (group, artifact, version) key used to deduplicate components
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ComponentId {
    group: String,
    artifact: String,
    version: String,
}

impl ComponentId {
    pub fn new(
        group: impl Into<String>,
        artifact: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            group: group.into(),
            artifact: artifact.into(),
            version: version.into(),
        }
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn artifact(&self) -> &str {
        &self.artifact
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Returns the repository-relative directory for this component
    /// (e.g., `org/slf4j/slf4j-api/2.0.9`)
    pub fn repository_path(&self) -> String {
        format!(
            "{}/{}/{}",
            self.group.replace('.', "/"),
            self.artifact,
            self.version
        )
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group, self.artifact, self.version)
    }
}

impl FromStr for ComponentId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let parts: Vec<&str> = s.split(':').collect();
        match parts.as_slice() {
            [group, artifact, version]
                if !group.is_empty() && !artifact.is_empty() && !version.is_empty() =>
            {
                Ok(Self::new(*group, *artifact, *version))
            }
            _ => Err(IdError::InvalidComponentId(s.to_string())),
        }
    }
}

impl TryFrom<String> for ComponentId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ComponentId> for String {
    fn from(id: ComponentId) -> Self {
        id.to_string()
    }
}

/// A document-unique SPDX element identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SpdxId(String);

impl SpdxId {
    /// The identifier of the document element itself
    pub fn document() -> Self {
        Self("SPDXRef-DOCUMENT".to_string())
    }

    /// Derives the package identifier for a component
    pub fn for_component(id: &ComponentId) -> Self {
        Self(format!(
            "SPDXRef-{}-{}-{}",
            sanitize(id.group()),
            sanitize(id.artifact()),
            generate_hash(&id.to_string())
        ))
    }

    /// Derives the extracted-license reference for a (name, url) pair
    pub fn license_ref(name: &str, url: &str) -> Self {
        Self(format!("LicenseRef-{}", generate_hash(&format!("{}\n{}", name, url))))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SpdxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for SpdxId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let body = s
            .strip_prefix("SPDXRef-")
            .or_else(|| s.strip_prefix("LicenseRef-"))
            .ok_or_else(|| IdError::InvalidSpdxId(s.to_string()))?;

        if body.is_empty() || sanitize(body) != body {
            return Err(IdError::InvalidSpdxId(s.to_string()));
        }

        Ok(Self(s.to_string()))
    }
}

impl TryFrom<String> for SpdxId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SpdxId> for String {
    fn from(id: SpdxId) -> Self {
        id.0
    }
}
