//! # Command-Line Interface
//!
//! | Command | Purpose |
//! |---------|---------|
//! | `generate` | Resolve metadata for a resolution graph and write SPDX documents |
//! | `effective-pom` | Show one POM's effective form and extracted metadata |
//!
//! ## Output Formats
//!
//! All commands support `--format`:
//! - `text` (default) - Human-readable output
//! - `json` - Machine-parseable JSON
//!
//! ## Verbose Mode
//!
//! `--verbose` (or `-v`) raises the log level to debug:
//! ```bash
//! spdx-sbom --verbose generate --graph build/resolution.json
//! ```
//!
//! ## Entry Point
//!
//! Call [`run()`] to parse arguments and execute the appropriate command.

mod app;
mod effective;
mod generate;
mod output;

pub use app::{run, Cli, Commands};
pub use output::{Output, OutputFormat};
