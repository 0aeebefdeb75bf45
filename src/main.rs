//! spdx-sbom - SPDX SBOM generation from resolved dependency graphs

use std::process::ExitCode;

fn main() -> ExitCode {
    if let Err(e) = spdx_sbom::cli::run() {
        eprintln!("Error: {:#}", e);
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
