//! Error types for certificate rendering and export

use thiserror::Error;

/// Result type alias for certgen operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while rendering, printing or exporting a certificate
#[derive(Error, Debug)]
pub enum Error {
    /// An operation needed a rendered certificate but none exists yet
    #[error("No certificate has been generated")]
    NoDocument,

    /// An export was requested while another one is still running
    #[error("An export is already in progress")]
    ExportInProgress,

    /// Failed to load an image for inlining
    #[error("Failed to load image: {0}")]
    ImageLoad(String),

    /// Loaded image bytes could not be decoded or re-encoded
    #[error("Failed to decode image: {0}")]
    ImageDecode(String),

    /// Operation timed out
    #[error("Operation timed out after {0}ms")]
    Timeout(u64),

    /// The mounted document could not be measured or laid out
    #[error("Layout failed: {0}")]
    Layout(String),

    /// Failed to rasterize the document
    #[error("Rasterization failed: {0}")]
    RasterizeError(String),

    /// Failed to encode the raster buffer
    #[error("Encoding failed: {0}")]
    EncodeError(String),

    /// The host could not save the exported file
    #[error("Saving failed: {0}")]
    SaveError(String),

    /// The host could not print the document
    #[error("Printing failed: {0}")]
    PrintError(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        Error::ImageDecode(err.to_string())
    }
}

#[cfg(feature = "http")]
impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::ImageLoad(err.to_string())
    }
}
