//! Serialization of analysis results.
//!
//! Three formats behind one facade: CSV (the historical schema, one row per
//! frame or per GOP), JSON (nested metadata/GOP/frame objects) and XML
//! (attribute-heavy elements mirroring the JSON nesting). The frame-level
//! CSV schema is frozen for backward compatibility:
//!
//! ```text
//! picNum,picType,count_I,count_P,count_B,error,bits
//! ```

mod csv;
mod json;
mod xml;

use std::io;
use std::str::FromStr;

use thiserror::Error;

use crate::results::AnalysisResults;

/// Error raised while emitting results.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum OutputError {
    /// The output file could not be created.
    #[error("cannot open output {path}: {source}")]
    Open {
        /// Path as given by the caller.
        path: String,
        /// Underlying IO failure.
        #[source]
        source: io::Error,
    },

    /// Writing serialized data failed.
    #[error("write failed: {0}")]
    Write(#[from] io::Error),

    /// JSON serialization failed.
    #[error("serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Output serialization format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Comma-separated rows.
    #[default]
    Csv,
    /// Pretty-printed JSON document.
    Json,
    /// XML document.
    Xml,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "csv" => Ok(OutputFormat::Csv),
            "json" => Ok(OutputFormat::Json),
            "xml" => Ok(OutputFormat::Xml),
            other => Err(format!(
                "unknown output format '{other}' (expected csv, json or xml)"
            )),
        }
    }
}

/// Granularity of the emitted rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DetailLevel {
    /// One entry per frame.
    #[default]
    Frame,
    /// One entry per GOP.
    Gop,
}

impl FromStr for DetailLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "frame" => Ok(DetailLevel::Frame),
            "gop" => Ok(DetailLevel::Gop),
            other => Err(format!(
                "unknown detail level '{other}' (expected frame or gop)"
            )),
        }
    }
}

/// Serialize `results` to `out` in the requested format.
pub fn write_results(
    out: &mut dyn io::Write,
    results: &AnalysisResults,
    format: OutputFormat,
    detail: DetailLevel,
) -> Result<(), OutputError> {
    match format {
        OutputFormat::Csv => csv::write(out, results, detail),
        OutputFormat::Json => json::write(out, results, detail),
        OutputFormat::Xml => xml::write(out, results, detail),
    }
}
