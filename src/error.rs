use std::path::PathBuf;

use thiserror::Error;

/// Unified error type for the search / download pipeline
///
/// The proxy core never returns these for per-proxy problems: failed probes
/// become verdicts and an empty pool becomes `None`.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors
    #[error("Settings file not found: {}", .0.display())]
    SettingsNotFound(PathBuf),

    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    // I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // HTTP errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Search failed: {0}")]
    Search(String),
}

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Whether the error comes from the transport rather than the data
    pub fn is_network(&self) -> bool {
        matches!(self, Error::Http(_))
    }
}
