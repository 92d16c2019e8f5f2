use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = core::result::Result<T, Error>;

/// Custom error types for the thumbnailer library
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Image decoding or encoding error
    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    /// Configuration (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// File not found error
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// A file exists but its metadata cannot be read
    #[error("Cannot stat {path}: {source}")]
    Stat {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid configuration or unprovisioned output directory
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// An upload failed staging validation
    #[error("Upload rejected: {0}")]
    Rejected(String),

    /// Unsupported image format
    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),
}
