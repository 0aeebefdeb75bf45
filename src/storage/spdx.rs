//! SPDX 2.3 JSON output
//!
//! Maps a [`DocumentGraph`] onto the SPDX 2.3 JSON schema. Packages,
//! relationships and extracted licenses come out in identifier order, so
//! equal documents serialize to equal bytes.

use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::{DocumentGraph, ExtractedLicense, Package, Relationship, NOASSERTION};

pub const SPDX_VERSION: &str = "SPDX-2.3";
pub const DATA_LICENSE: &str = "CC0-1.0";
pub const FILE_EXTENSION: &str = "spdx.json";

fn timestamp(at: &DateTime<Utc>) -> String {
    at.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SpdxDocument<'a> {
    spdx_version: &'static str,
    data_license: &'static str,
    #[serde(rename = "SPDXID")]
    spdx_id: &'a str,
    name: &'a str,
    document_namespace: &'a str,
    creation_info: SpdxCreationInfo<'a>,
    packages: Vec<SpdxPackage<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    has_extracted_licensing_infos: Vec<SpdxExtractedLicense<'a>>,
    relationships: Vec<SpdxRelationship<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    annotations: Vec<SpdxAnnotation<'a>>,
}

#[derive(Serialize)]
struct SpdxCreationInfo<'a> {
    creators: &'a [String],
    created: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SpdxPackage<'a> {
    #[serde(rename = "SPDXID")]
    spdx_id: &'a str,
    name: &'a str,
    version_info: &'a str,
    supplier: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    originator: Option<&'a str>,
    download_location: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    homepage: Option<&'a str>,
    license_concluded: &'static str,
    license_declared: &'a str,
    copyright_text: &'static str,
    files_analyzed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    comment: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    package_file_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    checksums: Vec<SpdxChecksum<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    external_refs: Vec<SpdxExternalRef<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SpdxChecksum<'a> {
    algorithm: &'a str,
    checksum_value: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SpdxExternalRef<'a> {
    reference_category: &'static str,
    reference_type: &'static str,
    reference_locator: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SpdxExtractedLicense<'a> {
    license_id: &'a str,
    extracted_text: String,
    name: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    see_alsos: Vec<&'a str>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SpdxRelationship<'a> {
    spdx_element_id: &'a str,
    relationship_type: &'static str,
    related_spdx_element: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SpdxAnnotation<'a> {
    annotator: &'a str,
    annotation_date: String,
    annotation_type: &'static str,
    comment: &'a str,
}

impl<'a> From<&'a Package> for SpdxPackage<'a> {
    fn from(package: &'a Package) -> Self {
        Self {
            spdx_id: package.spdx_id.as_str(),
            name: &package.name,
            version_info: &package.version,
            supplier: &package.supplier,
            originator: package.originator.as_deref(),
            download_location: &package.download_location,
            homepage: package.homepage.as_deref(),
            license_concluded: NOASSERTION,
            license_declared: &package.license_declared,
            copyright_text: NOASSERTION,
            files_analyzed: false,
            description: package.description.as_deref(),
            comment: package.comment.as_deref(),
            package_file_name: package.file_name.as_deref(),
            checksums: package
                .checksums
                .iter()
                .map(|c| SpdxChecksum {
                    algorithm: &c.algorithm,
                    checksum_value: &c.value,
                })
                .collect(),
            external_refs: package
                .purl
                .as_deref()
                .map(|purl| SpdxExternalRef {
                    reference_category: "PACKAGE-MANAGER",
                    reference_type: "purl",
                    reference_locator: purl,
                })
                .into_iter()
                .collect(),
        }
    }
}

impl<'a> From<&'a ExtractedLicense> for SpdxExtractedLicense<'a> {
    fn from(license: &'a ExtractedLicense) -> Self {
        let url = (license.url != NOASSERTION).then_some(license.url.as_str());
        Self {
            license_id: license.license_id.as_str(),
            extracted_text: match url {
                Some(url) => format!("{} ({})", license.name, url),
                None => license.name.clone(),
            },
            name: &license.name,
            see_alsos: url.into_iter().collect(),
        }
    }
}

impl<'a> From<&'a Relationship> for SpdxRelationship<'a> {
    fn from(relationship: &'a Relationship) -> Self {
        Self {
            spdx_element_id: relationship.from.as_str(),
            relationship_type: relationship.kind.as_str(),
            related_spdx_element: relationship.to.as_str(),
        }
    }
}

fn to_spdx(doc: &DocumentGraph) -> SpdxDocument<'_> {
    SpdxDocument {
        spdx_version: SPDX_VERSION,
        data_license: DATA_LICENSE,
        spdx_id: doc.spdx_id.as_str(),
        name: &doc.name,
        document_namespace: &doc.namespace,
        creation_info: SpdxCreationInfo {
            creators: &doc.creators,
            created: timestamp(&doc.created),
        },
        packages: doc.packages.values().map(SpdxPackage::from).collect(),
        has_extracted_licensing_infos: doc
            .extracted_licenses
            .values()
            .map(SpdxExtractedLicense::from)
            .collect(),
        relationships: doc.relationships.iter().map(SpdxRelationship::from).collect(),
        annotations: doc
            .annotations
            .iter()
            .map(|a| SpdxAnnotation {
                annotator: &a.annotator,
                annotation_date: timestamp(&a.date),
                annotation_type: "OTHER",
                comment: &a.comment,
            })
            .collect(),
    }
}

/// Renders the document as pretty-printed SPDX JSON
pub fn render(doc: &DocumentGraph) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&to_spdx(doc))
}

/// Output file name for a target (e.g., `main.spdx.json`)
pub fn file_name(target: &str) -> String {
    format!("{}.{}", target, FILE_EXTENSION)
}

/// Writes the document to `path` atomically (temp file + rename)
pub fn write_document(doc: &DocumentGraph, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let json = render(doc).context("Failed to serialize SPDX document")?;
    let temp_path = path.with_extension("json.tmp");

    {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)
            .with_context(|| format!("Failed to create temp file: {}", temp_path.display()))?;

        let mut writer = BufWriter::new(&file);
        writeln!(writer, "{}", json)
            .with_context(|| format!("Failed to write {}", temp_path.display()))?;
        writer.flush().context("Failed to flush SPDX document")?;
    }

    fs::rename(&temp_path, path).with_context(|| {
        format!(
            "Failed to rename {} to {}",
            temp_path.display(),
            path.display()
        )
    })?;

    Ok(())
}
