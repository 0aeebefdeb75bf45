//! # Storage Layer
//!
//! File-facing adapters around the pure domain.
//!
//! | Data | Format | Location |
//! |------|--------|----------|
//! | Configuration | TOML | `sbom.toml` (nearest ancestor, or `--config`) |
//! | Resolved graphs | JSON | `--graph <file>` |
//! | Descriptors | POM XML | Maven-layout local repository |
//! | Output | SPDX 2.3 JSON | `<output-dir>/<target>.spdx.json` |
//!
//! Output is written atomically (temp file + rename).

mod config;
mod local_repository;
mod resolution;
pub mod spdx;

pub use config::{
    Config, ConfigError, OnDescriptorError, ResolverConfig, SbomConfig, TargetConfig,
    CONFIG_FILE, DEFAULT_CONFIGURATION, DEFAULT_TARGET,
};
pub use local_repository::LocalRepository;
pub use resolution::ResolutionFile;
