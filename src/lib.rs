//! spdx-sbom - SPDX software bills of materials from resolved dependency graphs
//!
//! The host build tool hands over its resolved dependency graphs. For every
//! library in them the effective Maven descriptor is resolved (parents,
//! properties, BOM imports), normalized metadata is extracted, and one SPDX
//! document per target is assembled and written.

pub mod cli;
pub mod domain;
pub mod maven;
pub mod pipeline;
pub mod storage;
pub mod telemetry;

pub use domain::{ComponentId, DependencyGraph, DocumentGraph, SpdxId};
pub use pipeline::{generate, PipelineError};
