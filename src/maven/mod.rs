//! Maven descriptors
//!
//! POM parsing, the [`DescriptorSource`] port through which parents and
//! BOM imports are fetched, and the effective-descriptor resolver.

mod pom;
mod resolver;
mod source;

pub use pom::{parse_pom, PomError};
pub use resolver::{resolve_component, resolve_effective, ResolveError, GRAPH_REFERRER};
pub use source::{CachingSource, DescriptorFile, DescriptorSource, FetchError, MemorySource};
