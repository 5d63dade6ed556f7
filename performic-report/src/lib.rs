#![warn(missing_docs)]
//! Performic Report - Output Generation
//!
//! Generates the output formats of a finished session:
//! - JSON (machine-readable, full report)
//! - CSV (thermal series, spreadsheet-compatible)
//!
//! Human-readable terminal output is rendered by the CLI from the same
//! [`Report`].

mod csv;
mod json;
mod report;

pub use csv::generate_csv_report;
pub use json::generate_json_report;
pub use report::{
    GpuSection, HistorySection, Report, ReportMeta, SCHEMA_VERSION, ScoreSection, SystemInfo,
    ThermalSection,
};

/// Output format selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// JSON with full schema
    Json,
    /// CSV of the thermal series
    Csv,
    /// Human-readable terminal output
    #[default]
    Human,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            "human" | "text" => Ok(OutputFormat::Human),
            other => Err(format!("Unknown output format: {}", other)),
        }
    }
}
