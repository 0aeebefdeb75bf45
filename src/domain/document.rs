//! Document assembly
//!
//! Combines the flattened graph, per-component metadata and artifact
//! locations, and the project/document/SCM/repository values into one
//! [`DocumentGraph`]. Assembly is a pure function: same inputs, same
//! document, whatever order the inputs were produced in.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

use super::graph::DependencyGraph;
use super::id::{ComponentId, SpdxId};
use super::metadata::{LicenseInfo, PackageMetadata, NOASSERTION};
use super::project::{DocumentInfo, ProjectInfo, RepositoryInfo, ScmInfo};

#[derive(Debug, Error, PartialEq)]
pub enum AssembleError {
    #[error("No metadata was resolved for component {0}")]
    MissingMetadata(ComponentId),

    #[error("Components {0} and {1} map to the same SPDX ID {2}")]
    IdCollision(ComponentId, ComponentId, SpdxId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationshipType {
    Describes,
    DependsOn,
}

impl RelationshipType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationshipType::Describes => "DESCRIBES",
            RelationshipType::DependsOn => "DEPENDS_ON",
        }
    }
}

/// A directed relationship between two document elements
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Relationship {
    pub from: SpdxId,
    pub kind: RelationshipType,
    pub to: SpdxId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Checksum {
    pub algorithm: String,
    pub value: String,
}

impl Checksum {
    pub fn blake3(value: impl Into<String>) -> Self {
        Self {
            algorithm: "BLAKE3".to_string(),
            value: value.into(),
        }
    }
}

/// The resolved artifact file of a component
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactLocation {
    pub file_name: String,
    pub checksum: Option<Checksum>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Package {
    pub spdx_id: SpdxId,
    pub component: ComponentId,
    pub name: String,
    pub version: String,
    pub supplier: String,
    pub originator: Option<String>,
    pub download_location: String,
    pub homepage: Option<String>,
    pub license_declared: String,
    pub description: Option<String>,
    pub comment: Option<String>,
    pub file_name: Option<String>,
    pub checksums: Vec<Checksum>,
    pub purl: Option<String>,
}

/// A license that is not expressed with a listed identifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractedLicense {
    pub license_id: SpdxId,
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Annotation {
    pub annotator: String,
    pub date: DateTime<Utc>,
    pub comment: String,
}

/// Who made the document and when
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreationInfo {
    /// Tool creator entry (e.g., `Tool: spdx-sbom-0.1.0`)
    pub tool: String,
    pub created: DateTime<Utc>,
}

/// The assembled document, ready for serialization
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentGraph {
    pub spdx_id: SpdxId,
    pub name: String,
    pub namespace: String,
    pub creators: Vec<String>,
    pub created: DateTime<Utc>,
    pub packages: BTreeMap<SpdxId, Package>,
    pub relationships: BTreeSet<Relationship>,
    pub extracted_licenses: BTreeMap<SpdxId, ExtractedLicense>,
    pub annotations: Vec<Annotation>,
}

impl DocumentGraph {
    pub fn package_for(&self, id: &ComponentId) -> Option<&Package> {
        self.packages.get(&SpdxId::for_component(id))
    }

    /// Relationships of one kind
    pub fn relationships_of(&self, kind: RelationshipType) -> impl Iterator<Item = &Relationship> {
        self.relationships.iter().filter(move |r| r.kind == kind)
    }
}

/// Everything the assembler needs
pub struct AssemblyInput<'a> {
    pub projects: &'a [ProjectInfo],
    pub document: &'a DocumentInfo,
    pub scm: &'a ScmInfo,
    pub creation: CreationInfo,
    pub graph: &'a DependencyGraph,
    pub metadata: &'a BTreeMap<ComponentId, PackageMetadata>,
    pub artifacts: &'a BTreeMap<ComponentId, ArtifactLocation>,
    pub repositories: &'a RepositoryInfo,
}

impl AssemblyInput<'_> {
    fn project_for(&self, id: &ComponentId) -> Option<&ProjectInfo> {
        let path = self.graph.origin(id)?.project.as_deref()?;
        self.projects.iter().find(|p| p.path == path)
    }
}

/// Builds the document graph
pub fn assemble(input: AssemblyInput<'_>) -> Result<DocumentGraph, AssembleError> {
    let mut packages: BTreeMap<SpdxId, Package> = BTreeMap::new();
    let mut extracted_licenses = BTreeMap::new();

    for id in input.graph.components() {
        let package = match input.project_for(id) {
            Some(project) => project_package(&input, id, project),
            None if input.graph.origin(id).is_some_and(|o| o.is_project()) => {
                unknown_project_package(&input, id)
            }
            None => {
                let metadata = input
                    .metadata
                    .get(id)
                    .ok_or_else(|| AssembleError::MissingMetadata(id.clone()))?;
                for license in &metadata.licenses {
                    let extracted = extracted_license(license);
                    extracted_licenses.insert(extracted.license_id.clone(), extracted);
                }
                library_package(&input, id, metadata)
            }
        };

        if let Some(existing) = packages.get(&package.spdx_id) {
            return Err(AssembleError::IdCollision(
                existing.component.clone(),
                id.clone(),
                package.spdx_id.clone(),
            ));
        }
        packages.insert(package.spdx_id.clone(), package);
    }

    let document_id = SpdxId::document();
    let mut relationships = BTreeSet::new();
    for root in input.graph.roots() {
        relationships.insert(Relationship {
            from: document_id.clone(),
            kind: RelationshipType::Describes,
            to: SpdxId::for_component(root),
        });
    }
    for (parent, child) in input.graph.edges() {
        relationships.insert(Relationship {
            from: SpdxId::for_component(&parent),
            kind: RelationshipType::DependsOn,
            to: SpdxId::for_component(&child),
        });
    }

    let root_name = input
        .graph
        .roots()
        .first()
        .map(|root| match input.project_for(root) {
            Some(project) => project.name.clone(),
            None => root.artifact().to_string(),
        })
        .unwrap_or_else(|| "sbom".to_string());

    let mut creators = vec![input.creation.tool.clone()];
    creators.extend(input.document.creator.iter().cloned());

    let annotations = input
        .repositories
        .iter()
        .map(|(name, base)| Annotation {
            annotator: input.creation.tool.clone(),
            date: input.creation.created,
            comment: format!("Resolved from repository '{}': {}", name, base),
        })
        .collect();

    Ok(DocumentGraph {
        spdx_id: document_id,
        name: input.document.name_or(&root_name).to_string(),
        namespace: input.document.namespace.clone(),
        creators,
        created: input.creation.created,
        packages,
        relationships,
        extracted_licenses,
        annotations,
    })
}

fn project_package(input: &AssemblyInput<'_>, id: &ComponentId, project: &ProjectInfo) -> Package {
    let overrides = project.package.clone().unwrap_or_default();
    Package {
        spdx_id: SpdxId::for_component(id),
        component: id.clone(),
        name: project.name.clone(),
        version: project.version.clone(),
        supplier: overrides.supplier.unwrap_or_else(|| NOASSERTION.to_string()),
        originator: overrides.originator,
        download_location: input.scm.source_repo(),
        homepage: overrides.homepage.map(String::from),
        license_declared: overrides
            .license_declared
            .unwrap_or_else(|| NOASSERTION.to_string()),
        description: project.description.clone(),
        comment: overrides.comment,
        file_name: None,
        checksums: Vec::new(),
        purl: None,
    }
}

/// A build project with no configured [`ProjectInfo`]
fn unknown_project_package(input: &AssemblyInput<'_>, id: &ComponentId) -> Package {
    Package {
        spdx_id: SpdxId::for_component(id),
        component: id.clone(),
        name: id.artifact().to_string(),
        version: id.version().to_string(),
        supplier: NOASSERTION.to_string(),
        originator: None,
        download_location: input.scm.source_repo(),
        homepage: None,
        license_declared: NOASSERTION.to_string(),
        description: None,
        comment: None,
        file_name: None,
        checksums: Vec::new(),
        purl: None,
    }
}

fn library_package(
    input: &AssemblyInput<'_>,
    id: &ComponentId,
    metadata: &PackageMetadata,
) -> Package {
    let artifact = input.artifacts.get(id);
    let repository = input.graph.origin(id).and_then(|o| o.repository.as_deref());

    let download_location = match (repository, artifact) {
        (Some(repo), Some(artifact)) => input
            .repositories
            .download_location(repo, id, &artifact.file_name),
        _ => None,
    }
    .unwrap_or_else(|| NOASSERTION.to_string());

    Package {
        spdx_id: SpdxId::for_component(id),
        component: id.clone(),
        name: format!("{}:{}", id.group(), id.artifact()),
        version: id.version().to_string(),
        supplier: supplier(metadata),
        originator: None,
        download_location,
        homepage: metadata.homepage.clone(),
        license_declared: license_expression(&metadata.licenses),
        description: metadata.description.clone(),
        comment: None,
        file_name: artifact.map(|a| a.file_name.clone()),
        checksums: artifact.and_then(|a| a.checksum.clone()).into_iter().collect(),
        purl: Some(format!(
            "pkg:maven/{}/{}@{}",
            id.group(),
            id.artifact(),
            id.version()
        )),
    }
}

/// `Organization: …` if known, else the first named developer, else NOASSERTION
fn supplier(metadata: &PackageMetadata) -> String {
    if let Some(org) = &metadata.organization {
        return format!("Organization: {}", org);
    }
    metadata
        .developers
        .iter()
        .find_map(|d| {
            let name = d.name.as_deref()?;
            Some(match &d.email {
                Some(email) => format!("Person: {} ({})", name, email),
                None => format!("Person: {}", name),
            })
        })
        .unwrap_or_else(|| NOASSERTION.to_string())
}

fn extracted_license(license: &LicenseInfo) -> ExtractedLicense {
    ExtractedLicense {
        license_id: SpdxId::license_ref(&license.name, &license.url),
        name: license.name.clone(),
        url: license.url.clone(),
    }
}

fn license_expression(licenses: &[LicenseInfo]) -> String {
    if licenses.is_empty() {
        return NOASSERTION.to_string();
    }
    let refs: BTreeSet<String> = licenses
        .iter()
        .map(|l| SpdxId::license_ref(&l.name, &l.url).to_string())
        .collect();
    refs.into_iter().collect::<Vec<_>>().join(" AND ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::graph::{Resolution, ResolvedNode};
    use crate::domain::metadata::DeveloperInfo;
    use chrono::TimeZone;
    use url::Url;

    fn cid(name: &str) -> ComponentId {
        ComponentId::new("org.example", name, "1.0")
    }

    fn creation() -> CreationInfo {
        CreationInfo {
            tool: "Tool: spdx-sbom-test".into(),
            created: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    fn project_node(name: &str, children: &[usize]) -> ResolvedNode {
        let mut n = ResolvedNode::new(cid(name));
        n.origin.project = Some(":".into());
        n.children = children.to_vec();
        n
    }

    fn lib_node(name: &str, children: &[usize]) -> ResolvedNode {
        let mut n = ResolvedNode::new(cid(name));
        n.origin.repository = Some("MavenRepo".into());
        n.children = children.to_vec();
        n
    }

    fn app_project() -> ProjectInfo {
        ProjectInfo {
            path: ":".into(),
            name: "app".into(),
            group: "org.example".into(),
            version: "1.0".into(),
            description: Some("The app".into()),
            package: None,
        }
    }

    struct Fixture {
        graph: DependencyGraph,
        metadata: BTreeMap<ComponentId, PackageMetadata>,
        artifacts: BTreeMap<ComponentId, ArtifactLocation>,
        repositories: RepositoryInfo,
        projects: Vec<ProjectInfo>,
        document: DocumentInfo,
        scm: ScmInfo,
    }

    impl Fixture {
        fn new(resolutions: &[Resolution]) -> Self {
            let graph = DependencyGraph::flatten(resolutions).unwrap();
            let metadata = graph
                .components()
                .into_iter()
                .filter(|id| !graph.origin(id).is_some_and(|o| o.is_project()))
                .map(|id| (id.clone(), PackageMetadata::empty()))
                .collect();
            let mut repositories = RepositoryInfo::new();
            repositories.insert(
                "MavenRepo",
                Url::parse("https://repo.maven.apache.org/maven2/").unwrap(),
            );
            Self {
                graph,
                metadata,
                artifacts: BTreeMap::new(),
                repositories,
                projects: vec![app_project()],
                document: DocumentInfo::default(),
                scm: ScmInfo::default(),
            }
        }

        fn assemble(&self) -> Result<DocumentGraph, AssembleError> {
            assemble(AssemblyInput {
                projects: &self.projects,
                document: &self.document,
                scm: &self.scm,
                creation: creation(),
                graph: &self.graph,
                metadata: &self.metadata,
                artifacts: &self.artifacts,
                repositories: &self.repositories,
            })
        }
    }

    fn diamond() -> Resolution {
        Resolution {
            configuration: "runtimeClasspath".into(),
            root: 0,
            nodes: vec![
                project_node("app", &[1, 2]),
                lib_node("a", &[3]),
                lib_node("b", &[3]),
                lib_node("c", &[]),
            ],
        }
    }

    #[test]
    fn packages_and_relationships() {
        let doc = Fixture::new(&[diamond()]).assemble().unwrap();

        assert_eq!(doc.packages.len(), 4);
        assert_eq!(doc.relationships_of(RelationshipType::Describes).count(), 1);
        assert_eq!(doc.relationships_of(RelationshipType::DependsOn).count(), 4);
        assert_eq!(doc.name, "app");
        assert_eq!(doc.namespace, "https://example.com/UUID");
        assert_eq!(doc.creators, vec!["Tool: spdx-sbom-test".to_string()]);
    }

    #[test]
    fn no_dangling_relationships() {
        let doc = Fixture::new(&[diamond()]).assemble().unwrap();
        for rel in &doc.relationships {
            assert!(rel.from == doc.spdx_id || doc.packages.contains_key(&rel.from));
            assert!(doc.packages.contains_key(&rel.to));
        }
    }

    #[test]
    fn two_roots_two_describes() {
        let r1 = Resolution {
            configuration: "one".into(),
            root: 0,
            nodes: vec![lib_node("r1", &[1]), lib_node("x", &[])],
        };
        let r2 = Resolution {
            configuration: "two".into(),
            root: 0,
            nodes: vec![lib_node("r2", &[1]), lib_node("y", &[])],
        };
        let doc = Fixture::new(&[r1, r2]).assemble().unwrap();

        let describes: Vec<_> = doc.relationships_of(RelationshipType::Describes).collect();
        assert_eq!(describes.len(), 2);
        assert!(doc
            .relationships
            .iter()
            .filter(|r| r.from == doc.spdx_id)
            .all(|r| r.kind == RelationshipType::Describes));
    }

    #[test]
    fn project_package_uses_project_info_and_scm() {
        let mut fixture = Fixture::new(&[diamond()]);
        fixture.scm = ScmInfo {
            tool: "git".into(),
            revision: "abc123".into(),
            uri: "https://github.com/example/app".into(),
        };
        let doc = fixture.assemble().unwrap();

        let app = doc.package_for(&cid("app")).unwrap();
        assert_eq!(app.name, "app");
        assert_eq!(app.description.as_deref(), Some("The app"));
        assert_eq!(
            app.download_location,
            "git+https://github.com/example/app@abc123"
        );
        assert_eq!(app.purl, None);
    }

    #[test]
    fn library_package_fields() {
        let mut fixture = Fixture::new(&[diamond()]);
        fixture.artifacts.insert(
            cid("a"),
            ArtifactLocation {
                file_name: "a-1.0.jar".into(),
                checksum: Some(Checksum::blake3("ff")),
            },
        );
        fixture.metadata.insert(
            cid("a"),
            PackageMetadata {
                licenses: vec![LicenseInfo {
                    name: "Apache-2.0".into(),
                    url: NOASSERTION.into(),
                }],
                organization: Some("Example Corp".into()),
                ..Default::default()
            },
        );
        let doc = fixture.assemble().unwrap();

        let a = doc.package_for(&cid("a")).unwrap();
        assert_eq!(a.name, "org.example:a");
        assert_eq!(a.supplier, "Organization: Example Corp");
        assert_eq!(
            a.download_location,
            "https://repo.maven.apache.org/maven2/org/example/a/1.0/a-1.0.jar"
        );
        assert_eq!(a.checksums, vec![Checksum::blake3("ff")]);
        assert_eq!(a.purl.as_deref(), Some("pkg:maven/org.example/a@1.0"));
        assert!(a.license_declared.starts_with("LicenseRef-"));
        assert_eq!(doc.extracted_licenses.len(), 1);

        let c = doc.package_for(&cid("c")).unwrap();
        assert_eq!(c.download_location, NOASSERTION);
        assert_eq!(c.license_declared, NOASSERTION);
        assert_eq!(c.supplier, NOASSERTION);
    }

    #[test]
    fn supplier_falls_back_to_developer() {
        let meta = PackageMetadata {
            developers: vec![
                DeveloperInfo {
                    name: None,
                    email: Some("anon@example.org".into()),
                },
                DeveloperInfo {
                    name: Some("Ada".into()),
                    email: Some("ada@example.org".into()),
                },
            ],
            ..Default::default()
        };
        assert_eq!(supplier(&meta), "Person: Ada (ada@example.org)");
    }

    #[test]
    fn missing_metadata_is_an_error() {
        let mut fixture = Fixture::new(&[diamond()]);
        fixture.metadata.remove(&cid("b"));
        assert_eq!(
            fixture.assemble().unwrap_err(),
            AssembleError::MissingMetadata(cid("b"))
        );
    }

    #[test]
    fn repositories_become_annotations() {
        let doc = Fixture::new(&[diamond()]).assemble().unwrap();
        assert_eq!(doc.annotations.len(), 1);
        assert!(doc.annotations[0].comment.contains("MavenRepo"));
        assert!(doc.annotations[0]
            .comment
            .contains("https://repo.maven.apache.org/maven2/"));
    }

    #[test]
    fn assembly_is_deterministic() {
        let a = Fixture::new(&[diamond()]).assemble().unwrap();
        let b = Fixture::new(&[diamond()]).assemble().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn document_name_override() {
        let mut fixture = Fixture::new(&[diamond()]);
        fixture.document.name = Some("release".into());
        fixture.document.creator = Some("Organization: Example Corp".into());
        let doc = fixture.assemble().unwrap();
        assert_eq!(doc.name, "release");
        assert_eq!(doc.creators.len(), 2);
    }

    #[test]
    fn license_expression_is_sorted_and_deduplicated() {
        let mit = LicenseInfo {
            name: "MIT".into(),
            url: NOASSERTION.into(),
        };
        let apache = LicenseInfo {
            name: "Apache-2.0".into(),
            url: NOASSERTION.into(),
        };
        let a = license_expression(&[mit.clone(), apache.clone(), mit.clone()]);
        let b = license_expression(&[apache, mit]);
        assert_eq!(a, b);
        assert_eq!(a.matches(" AND ").count(), 1);
    }
}
