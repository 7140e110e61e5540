use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = core::result::Result<T, Error>;

/// Custom error types for the tiffinder library
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Image decoding or encoding error
    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    /// Cache file exists but could not be read
    #[error("Cache unreadable: {path}: {source}")]
    CacheUnreadable {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Cache file exists but does not contain a well-formed index
    #[error("Cache corrupt: {path}: {source}")]
    CacheCorrupt {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// Scan root does not exist or is not a directory
    #[error("Directory not found: {0}")]
    DirNotFound(PathBuf),

    /// Copy target is not a directory
    #[error("Target is not a directory: {0}")]
    InvalidDestination(PathBuf),

    /// No free variant name could be found at the destination
    #[error("No free target name for: {0}")]
    CollisionUnresolvable(PathBuf),

    /// Needle list file not found
    #[error("Needle file not found: {0}")]
    SpreadsheetMissing(PathBuf),

    /// Identifier export could not be parsed
    #[error("Malformed record file {path}: {detail}")]
    ExportMalformed { path: PathBuf, detail: String },

    /// Invalid configuration error
    #[error("Invalid configuration: {0}")]
    Configuration(String),
}
