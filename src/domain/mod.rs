//! Domain models for SBOM generation
//!
//! Contains the core logic without any I/O concerns.

mod id;
mod descriptor;
mod interpolate;
mod metadata;
mod graph;
mod project;
mod document;

pub use id::{ComponentId, SpdxId, IdError};
pub use descriptor::{
    Descriptor, DependencyRef, Developer, EffectiveDescriptor, License, Organization, ParentRef,
    Scm,
};
pub use interpolate::{ambient_properties, interpolate_descriptor, Interpolator, Properties};
pub use metadata::{extract, DeveloperInfo, LicenseInfo, PackageMetadata, NOASSERTION};
pub use graph::{ComponentOrigin, DependencyGraph, GraphError, Resolution, ResolvedNode};
pub use project::{
    DocumentInfo, PackageOverrides, ProjectInfo, RepositoryInfo, ScmInfo, DEFAULT_NAMESPACE,
    DEFAULT_SCM_TOOL, NO_SCM_REVISION, NO_SCM_URI,
};
pub use document::{
    assemble, Annotation, ArtifactLocation, AssembleError, AssemblyInput, Checksum, CreationInfo,
    DocumentGraph, ExtractedLicense, Package, Relationship, RelationshipType,
};
