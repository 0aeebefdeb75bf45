//! Normalized package metadata
//!
//! Maps an effective descriptor to the fields an SBOM package carries.
//! Missing or invalid values become documented fallbacks; nothing here fails.

use iri_string::types::UriReferenceStr;
use serde::Serialize;

use super::descriptor::EffectiveDescriptor;
use super::id::ComponentId;

/// Sentinel for absent license data
pub const NOASSERTION: &str = "NOASSERTION";

/// A declared license, always fully populated
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct LicenseInfo {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeveloperInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Metadata extracted from one component's effective descriptor
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PackageMetadata {
    pub licenses: Vec<LicenseInfo>,
    /// Descriptor text when it is a valid URI reference; `None` is the empty URI
    pub homepage: Option<String>,
    pub organization: Option<String>,
    pub developers: Vec<DeveloperInfo>,
    pub name: Option<String>,
    pub description: Option<String>,
}

impl PackageMetadata {
    /// Metadata for a component whose descriptor could not be used
    pub fn empty() -> Self {
        Self::default()
    }

    /// The homepage as text, empty when absent
    pub fn homepage_str(&self) -> &str {
        self.homepage.as_deref().unwrap_or("")
    }
}

/// Extracts normalized metadata for `component`
pub fn extract(component: &ComponentId, descriptor: &EffectiveDescriptor) -> PackageMetadata {
    let model = descriptor.model();

    let licenses = model
        .licenses
        .iter()
        .map(|l| LicenseInfo {
            name: l.name.clone().unwrap_or_else(|| NOASSERTION.to_string()),
            url: l.url.clone().unwrap_or_else(|| NOASSERTION.to_string()),
        })
        .collect();

    let developers = model
        .developers
        .iter()
        .map(|d| DeveloperInfo {
            name: d.name.clone(),
            email: d.email.clone(),
        })
        .collect();

    PackageMetadata {
        licenses,
        homepage: extract_homepage(component, model.url.as_deref()),
        organization: model.organization.as_ref().and_then(|o| o.name.clone()),
        developers,
        name: model.name.clone(),
        description: model.description.clone(),
    }
}

/// Keeps the url verbatim if it is an RFC 3986 URI reference.
///
/// Relative references (`www.example.com`, `//host/path`) are kept.
fn extract_homepage(component: &ComponentId, url: Option<&str>) -> Option<String> {
    let url = url?.trim();
    if url.is_empty() {
        return None;
    }

    if UriReferenceStr::new(url).is_err() {
        tracing::warn!(
            component = %component,
            url,
            "Ignoring invalid url detected in project '{}': {}",
            component,
            url
        );
        return None;
    }
    Some(url.to_string())
}
