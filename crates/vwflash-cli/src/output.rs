//! Output formatting for vw-flash (table, json)

use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use tabled::{Table, Tabled};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// ASCII table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Context for output rendering
pub struct OutputContext {
    pub format: OutputFormat,
    pub quiet: bool,
}

impl OutputContext {
    pub fn new(format: OutputFormat, no_color: bool, quiet: bool) -> Self {
        if no_color {
            colored::control::set_override(false);
        }
        Self { format, quiet }
    }

    /// Print a success message (unless in quiet mode)
    pub fn success(&self, msg: &str) {
        if !self.quiet {
            println!("{}", msg.green());
        }
    }

    /// Print an info message (unless in quiet mode)
    pub fn info(&self, msg: &str) {
        if !self.quiet {
            println!("{}", msg);
        }
    }

    /// Print a warning message
    pub fn warn(&self, msg: &str) {
        eprintln!("{}", msg.yellow());
    }

    /// Print an error message
    pub fn error(&self, msg: &str) {
        eprintln!("{}", msg.red());
    }

    /// Print rows in the configured format
    pub fn print<T: Tabled + Serialize>(&self, data: &[T]) {
        match self.format {
            OutputFormat::Table => {
                if data.is_empty() {
                    if !self.quiet {
                        println!("No data");
                    }
                } else {
                    println!("{}", Table::new(data));
                }
            }
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::to_string_pretty(data).unwrap_or_else(|_| "[]".to_string())
                );
            }
        }
    }
}

// =============================================================================
// Display types
// =============================================================================

/// Checksum status row
#[derive(Debug, Tabled, Serialize)]
pub struct ChecksumRow {
    #[tabled(rename = "File")]
    pub file: String,
    #[tabled(rename = "Block")]
    pub block: String,
    #[tabled(rename = "Stored")]
    pub stored: String,
    #[tabled(rename = "Computed")]
    pub computed: String,
    #[tabled(rename = "Valid")]
    pub valid: String,
}

/// Transfer manifest row
#[derive(Debug, Tabled, Serialize)]
pub struct ManifestRow {
    #[tabled(rename = "File")]
    pub file: String,
    #[tabled(rename = "Block")]
    pub block: u8,
    #[tabled(rename = "Name")]
    pub name: String,
    #[tabled(rename = "Version")]
    pub version: String,
}

/// Materialized output row
#[derive(Debug, Tabled, Serialize)]
pub struct WriteRow {
    #[tabled(rename = "Output")]
    pub path: String,
    #[tabled(rename = "Status")]
    pub status: String,
}
