//! Error types for the skinscan pipeline.
//!
//! Every stage-level operation fails fast and propagates the underlying
//! error unchanged up through the pipeline orchestrator; there is no local
//! recovery and no retry anywhere in this crate.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type covering the pipeline's failure taxonomy.
#[derive(Error, Debug)]
pub enum SkinScanError {
    /// Network failure while fetching the dataset archive.
    #[error("download failed for '{url}': {source}")]
    Download {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Non-success HTTP status while fetching the dataset archive.
    #[error("download of '{url}' returned HTTP status {status}")]
    DownloadStatus { url: String, status: u16 },

    /// Malformed or unreadable archive.
    #[error("archive error at '{path}': {message}")]
    Archive { path: PathBuf, message: String },

    /// A split's label table is missing required columns.
    #[error("'{split}' label table is missing required columns: {missing:?}")]
    Schema { split: String, missing: Vec<String> },

    /// A label table could not be read or parsed.
    #[error("label table error at '{path}': {message}")]
    Table { path: PathBuf, message: String },

    /// A required model snapshot does not exist on disk.
    #[error("model snapshot not found at '{0}'")]
    SnapshotMissing(PathBuf),

    /// Failure to write or read a model snapshot.
    #[error("model snapshot error at '{path}': {message}")]
    Persistence { path: PathBuf, message: String },

    /// Unreadable or non-image file supplied to preprocessing.
    #[error("failed to load image at '{path}': {message}")]
    ImageLoad { path: PathBuf, message: String },

    /// Model output that does not line up with the label schema.
    #[error("inference error: {0}")]
    Inference(String),

    /// Invalid or unsupported configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Plain IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type for skinscan operations.
pub type Result<T> = std::result::Result<T, SkinScanError>;
