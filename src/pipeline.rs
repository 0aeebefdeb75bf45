//! SBOM generation pipeline
//!
//! Flatten the selected resolutions, resolve every library's metadata and
//! artifact checksum on a worker pool, then assemble. Workers only read
//! shared inputs and return their own result; results are merged into
//! ordered maps after the pool is done.

use std::collections::BTreeMap;
use std::fs::File;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use thiserror::Error;

use crate::domain::{
    assemble, extract, ArtifactLocation, AssembleError, AssemblyInput, Checksum, ComponentId,
    ComponentOrigin, CreationInfo, DependencyGraph, DocumentGraph, GraphError, PackageMetadata,
    Properties,
};
use crate::maven::{
    resolve_component, resolve_effective, DescriptorFile, DescriptorSource, ResolveError,
    GRAPH_REFERRER,
};
use crate::storage::{ConfigError, OnDescriptorError, ResolutionFile, SbomConfig};

pub const TOOL_NAME: &str = env!("CARGO_PKG_NAME");
pub const TOOL_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Failed to resolve the descriptor of {component}")]
    Resolve {
        component: ComponentId,
        #[source]
        source: ResolveError,
    },

    #[error("Failed to read artifact {} of {component}", .path.display())]
    Artifact {
        component: ComponentId,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Target '{target}' selects no resolution in the graph (wanted {configurations:?})")]
    NoResolutions {
        target: String,
        configurations: Vec<String>,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Assemble(#[from] AssembleError),

    #[error("Failed to start worker pool")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

/// Per-run settings for resolving library metadata
#[derive(Debug, Clone, Copy)]
pub struct ResolveSettings<'a> {
    pub ambient: &'a Properties,
    pub jobs: usize,
    pub on_descriptor_error: OnDescriptorError,
}

/// Creation info stamped `created`, or now.
///
/// `source_date_epoch` is the raw `SOURCE_DATE_EPOCH` value; an unparsable
/// value is ignored with a warning.
pub fn creation_info(source_date_epoch: Option<&str>) -> CreationInfo {
    let created = source_date_epoch
        .and_then(|raw| {
            let parsed = raw
                .trim()
                .parse::<i64>()
                .ok()
                .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0));
            if parsed.is_none() {
                tracing::warn!(value = %raw, "Ignoring invalid SOURCE_DATE_EPOCH");
            }
            parsed
        })
        .unwrap_or_else(Utc::now);

    CreationInfo {
        tool: format!("Tool: {}-{}", TOOL_NAME, TOOL_VERSION),
        created,
    }
}

/// Generates the document for one configured target
pub fn generate<S>(
    config: &SbomConfig,
    graphs: &ResolutionFile,
    target_name: &str,
    source: &S,
    ambient: &Properties,
    creation: CreationInfo,
) -> Result<DocumentGraph, PipelineError>
where
    S: DescriptorSource + ?Sized,
{
    let target = config.target(target_name)?;
    let resolutions = graphs.select(&target.configurations);
    if resolutions.is_empty() {
        return Err(PipelineError::NoResolutions {
            target: target_name.to_string(),
            configurations: target.configurations.clone(),
        });
    }

    let graph = DependencyGraph::flatten(resolutions)?;
    if graph.is_cyclic() {
        tracing::warn!(target_name = %target_name, "Resolution graph is cyclic; relationships may be incomplete");
    }
    tracing::info!(
        target_name = %target_name,
        components = graph.len(),
        edges = graph.edge_count(),
        "Flattened resolution graph"
    );

    let settings = ResolveSettings {
        ambient,
        jobs: config.resolver.jobs(),
        on_descriptor_error: config.resolver.on_descriptor_error,
    };
    let (metadata, artifacts) = resolve_libraries(&graph, source, settings)?;

    let document = assemble(AssemblyInput {
        projects: &config.projects,
        document: &target.document,
        scm: &target.scm,
        creation,
        graph: &graph,
        metadata: &metadata,
        artifacts: &artifacts,
        repositories: &config.repositories,
    })?;
    Ok(document)
}

type LibraryResults = (
    BTreeMap<ComponentId, PackageMetadata>,
    BTreeMap<ComponentId, ArtifactLocation>,
);

/// Resolves metadata and artifact locations of every non-project component
pub fn resolve_libraries<S>(
    graph: &DependencyGraph,
    source: &S,
    settings: ResolveSettings<'_>,
) -> Result<LibraryResults, PipelineError>
where
    S: DescriptorSource + ?Sized,
{
    let libraries: Vec<(&ComponentId, &ComponentOrigin)> = graph
        .origins()
        .into_iter()
        .filter(|(_, origin)| !origin.is_project())
        .collect();

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(settings.jobs)
        .build()?;

    let results: Vec<_> = pool.install(|| {
        libraries
            .par_iter()
            .map(|(id, origin)| {
                let metadata = library_metadata(id, origin, source, settings)?;
                let artifact = artifact_location(id, origin)?;
                Ok::<_, PipelineError>(((*id).clone(), metadata, artifact))
            })
            .collect::<Result<Vec<_>, _>>()
    })?;

    let mut metadata = BTreeMap::new();
    let mut artifacts = BTreeMap::new();
    for (id, meta, artifact) in results {
        if let Some(artifact) = artifact {
            artifacts.insert(id.clone(), artifact);
        }
        metadata.insert(id, meta);
    }
    Ok((metadata, artifacts))
}

fn library_metadata<S>(
    id: &ComponentId,
    origin: &ComponentOrigin,
    source: &S,
    settings: ResolveSettings<'_>,
) -> Result<PackageMetadata, PipelineError>
where
    S: DescriptorSource + ?Sized,
{
    // A descriptor already fetched by the host wins over the source
    let resolved = match &origin.descriptor {
        Some(path) => DescriptorFile::read(path)
            .map_err(|e| ResolveError::Fetch {
                id: id.clone(),
                referrer: GRAPH_REFERRER.to_string(),
                source: e,
            })
            .and_then(|file| resolve_effective(&file, source, settings.ambient)),
        None => resolve_component(id, source, settings.ambient),
    };

    match resolved {
        Ok(effective) => Ok(extract(id, &effective)),
        Err(err) if settings.on_descriptor_error == OnDescriptorError::EmptyMetadata => {
            tracing::warn!(
                component = %id,
                error = %err,
                policy = settings.on_descriptor_error.as_str(),
                "Using empty metadata"
            );
            Ok(PackageMetadata::empty())
        }
        Err(err) => Err(PipelineError::Resolve {
            component: id.clone(),
            source: err,
        }),
    }
}

/// File name and BLAKE3 digest of the component's artifact, if the host gave one
fn artifact_location(
    id: &ComponentId,
    origin: &ComponentOrigin,
) -> Result<Option<ArtifactLocation>, PipelineError> {
    let Some(path) = &origin.artifact else {
        return Ok(None);
    };

    let io_error = |source| PipelineError::Artifact {
        component: id.clone(),
        path: path.clone(),
        source,
    };

    let mut file = File::open(path).map_err(io_error)?;
    let mut hasher = blake3::Hasher::new();
    std::io::copy(&mut file, &mut hasher).map_err(io_error)?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| format!("{}-{}.jar", id.artifact(), id.version()));

    Ok(Some(ArtifactLocation {
        file_name,
        checksum: Some(Checksum::blake3(hasher.finalize().to_hex().to_string())),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ProjectInfo, RelationshipType, Resolution, ResolvedNode, NOASSERTION};
    use crate::maven::MemorySource;
    use crate::storage::TargetConfig;
    use std::fs;
    use tempfile::TempDir;

    fn app() -> ComponentId {
        ComponentId::new("com.example", "app", "1.0")
    }

    fn lib(name: &str) -> ComponentId {
        ComponentId::new("org.lib", name, "2.0")
    }

    fn project_node() -> ResolvedNode {
        let mut node = ResolvedNode::new(app());
        node.origin.project = Some(":".into());
        node
    }

    fn graphs(nodes: Vec<ResolvedNode>) -> ResolutionFile {
        ResolutionFile {
            resolutions: vec![Resolution {
                configuration: "runtimeClasspath".into(),
                root: 0,
                nodes,
            }],
        }
    }

    fn config(jobs: usize) -> SbomConfig {
        let mut config = SbomConfig::default();
        config.projects.push(ProjectInfo {
            path: ":".into(),
            name: "app".into(),
            group: "com.example".into(),
            version: "1.0".into(),
            ..Default::default()
        });
        config.resolver.jobs = jobs;
        config
    }

    fn lib_pom(name: &str, license: &str) -> String {
        format!(
            "<project><groupId>org.lib</groupId><artifactId>{}</artifactId><version>2.0</version>\
             <url>https://lib.example/{}</url>\
             <licenses><license><name>{}</name></license></licenses>\
             <organization><name>Lib Org</name></organization></project>",
            name, name, license
        )
    }

    fn creation() -> CreationInfo {
        creation_info(Some("1700000000"))
    }

    fn sample() -> (ResolutionFile, MemorySource) {
        let mut root = project_node();
        root.children = vec![1, 2];
        let mut a = ResolvedNode::new(lib("a"));
        a.children = vec![2];
        let b = ResolvedNode::new(lib("b"));

        let source = MemorySource::new()
            .with(lib("a"), lib_pom("a", "MIT"))
            .with(lib("b"), lib_pom("b", "Apache-2.0"));
        (graphs(vec![root, a, b]), source)
    }

    #[test]
    fn generates_document() {
        let (graphs, source) = sample();
        let doc = generate(&config(2), &graphs, "main", &source, &Properties::new(), creation()).unwrap();

        assert_eq!(doc.name, "app");
        assert_eq!(doc.packages.len(), 3);
        assert_eq!(doc.relationships_of(RelationshipType::Describes).count(), 1);
        assert_eq!(doc.relationships_of(RelationshipType::DependsOn).count(), 3);

        let a = doc.package_for(&lib("a")).unwrap();
        assert_eq!(a.supplier, "Organization: Lib Org");
        assert_eq!(a.homepage.as_deref(), Some("https://lib.example/a"));
        assert_eq!(doc.extracted_licenses.len(), 2);
    }

    #[test]
    fn output_does_not_depend_on_worker_count() {
        let (graphs, source) = sample();
        let one = generate(&config(1), &graphs, "main", &source, &Properties::new(), creation()).unwrap();
        let many = generate(&config(8), &graphs, "main", &source, &Properties::new(), creation()).unwrap();
        assert_eq!(one, many);
    }

    #[test]
    fn missing_descriptor_aborts_with_component() {
        let (graphs, _) = sample();
        let source = MemorySource::new().with(lib("a"), lib_pom("a", "MIT"));

        let err = generate(&config(2), &graphs, "main", &source, &Properties::new(), creation()).unwrap_err();
        match err {
            PipelineError::Resolve { component, .. } => assert_eq!(component, lib("b")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn empty_metadata_policy_keeps_the_package() {
        let (graphs, _) = sample();
        let source = MemorySource::new().with(lib("a"), lib_pom("a", "MIT"));
        let mut config = config(2);
        config.resolver.on_descriptor_error = OnDescriptorError::EmptyMetadata;

        let doc = generate(&config, &graphs, "main", &source, &Properties::new(), creation()).unwrap();
        let b = doc.package_for(&lib("b")).unwrap();
        assert_eq!(b.supplier, NOASSERTION);
        assert_eq!(b.license_declared, NOASSERTION);
        assert_eq!(doc.packages.len(), 3);
    }

    #[test]
    fn host_descriptor_and_artifact_are_used() {
        let dir = TempDir::new().unwrap();
        let pom = dir.path().join("c-2.0.pom");
        let jar = dir.path().join("c-2.0.jar");
        fs::write(&pom, lib_pom("c", "MIT")).unwrap();
        fs::write(&jar, b"jar bytes").unwrap();

        let mut root = project_node();
        root.children = vec![1];
        let mut c = ResolvedNode::new(lib("c"));
        c.origin.descriptor = Some(pom);
        c.origin.artifact = Some(jar);

        let doc = generate(
            &config(1),
            &graphs(vec![root, c]),
            "main",
            &MemorySource::new(),
            &Properties::new(),
            creation(),
        )
        .unwrap();

        let package = doc.package_for(&lib("c")).unwrap();
        assert_eq!(package.file_name.as_deref(), Some("c-2.0.jar"));
        assert_eq!(
            package.checksums[0].value,
            blake3::hash(b"jar bytes").to_hex().to_string()
        );
    }

    #[test]
    fn missing_artifact_is_fatal() {
        let mut root = project_node();
        root.children = vec![1];
        let mut c = ResolvedNode::new(lib("c"));
        c.origin.artifact = Some(PathBuf::from("/definitely/not/here.jar"));
        let source = MemorySource::new().with(lib("c"), lib_pom("c", "MIT"));

        let err = generate(&config(1), &graphs(vec![root, c]), "main", &source, &Properties::new(), creation())
            .unwrap_err();
        assert!(matches!(err, PipelineError::Artifact { component, .. } if component == lib("c")));
    }

    #[test]
    fn target_without_resolutions_is_an_error() {
        let (graphs, source) = sample();
        let mut config = config(1);
        config.targets.insert(
            "test".into(),
            TargetConfig {
                configurations: vec!["testRuntimeClasspath".into()],
                ..Default::default()
            },
        );

        let err = generate(&config, &graphs, "test", &source, &Properties::new(), creation()).unwrap_err();
        assert!(matches!(err, PipelineError::NoResolutions { .. }));
        let err = generate(&config, &graphs, "main", &source, &Properties::new(), creation()).unwrap_err();
        assert!(matches!(err, PipelineError::Config(ConfigError::UnknownTarget(_))));
    }

    #[test]
    fn source_date_epoch() {
        let info = creation_info(Some("0"));
        assert_eq!(info.created.timestamp(), 0);
        assert!(info.tool.starts_with("Tool: spdx-sbom-"));

        let before = Utc::now();
        assert!(creation_info(Some("yesterday")).created >= before);
        assert!(creation_info(None).created >= before);
    }
}
