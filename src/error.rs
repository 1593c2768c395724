//! Error types for paperdown library.

use std::io;
use thiserror::Error;

/// Result type alias for paperdown operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while rendering, estimating or exporting.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Page geometry leaves no room for content.
    #[error("Invalid page geometry: {0}")]
    InvalidGeometry(String),

    /// A settings value is out of range.
    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    /// Settings file could not be parsed or serialized.
    #[error("Settings format error: {0}")]
    SettingsFormat(#[from] serde_json::Error),

    /// Syntax highlighting failed for a code block.
    #[error("Highlighting error: {0}")]
    Highlight(String),

    /// The diagram engine failed.
    #[error("Diagram error: {0}")]
    Diagram(String),

    /// Export assembly failed.
    #[error("Export error: {0}")]
    Export(String),

    /// The export backend rejected the document.
    #[error("Export backend error: {0}")]
    Backend(String),

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}

impl From<syntect::Error> for Error {
    fn from(err: syntect::Error) -> Self {
        Error::Highlight(err.to_string())
    }
}
