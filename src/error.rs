//! Analyzer-level error type.

use thiserror::Error;

use crate::source::SourceError;

/// Error raised while configuring or running the analyzer.
///
/// End-of-stream is not an error at this level: the analyzer swallows
/// [`SourceError::EndOfStream`](crate::SourceError::EndOfStream) and
/// completes the partial GOP instead.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AnalyzerError {
    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The frame source failed for a reason other than end of stream.
    #[error(transparent)]
    Source(#[from] SourceError),
}
