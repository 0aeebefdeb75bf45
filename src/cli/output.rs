//! Output formatting for CLI commands
//!
//! Results go to stdout; diagnostics go through `tracing` to stderr.

use serde::Serialize;

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Output helper for consistent formatting
pub struct Output {
    format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Prints a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Text => println!("{}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({
                        "success": true,
                        "message": message
                    })
                );
            }
        }
    }

    /// Prints structured data
    pub fn data<T: Serialize>(&self, data: &T) {
        let rendered = match self.format {
            OutputFormat::Text => serde_json::to_string_pretty(data),
            OutputFormat::Json => serde_json::to_string(data),
        };
        if let Ok(json) = rendered {
            println!("{}", json);
        }
    }

    /// Prints an aligned `label: value` line (text only)
    pub fn field(&self, label: &str, value: &str) {
        if self.format == OutputFormat::Text {
            println!("{:<14}{}", format!("{}:", label), value);
        }
    }

    /// Prints an indented list item (text only)
    pub fn item(&self, value: &str) {
        if self.format == OutputFormat::Text {
            println!("  - {}", value);
        }
    }

    /// Returns true if using JSON format
    pub fn is_json(&self) -> bool {
        self.format == OutputFormat::Json
    }
}
