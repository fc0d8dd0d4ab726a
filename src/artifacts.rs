//! Immutable stage artifacts.
//!
//! Stages communicate only through these value types: each carries the
//! durable filesystem outputs of a completed stage run and is constructed
//! only after the stage's side effects have finished successfully. Stages
//! never hand a loaded model forward in memory; later stages reload from the
//! recorded paths.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Output of the data ingestion stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataIngestionArtifact {
    /// Where the downloaded archive landed.
    pub archive_path: PathBuf,
    /// Directory the archive was extracted into.
    pub unzip_dir: PathBuf,
}

/// Output of the backbone preparation stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackboneArtifact {
    /// Snapshot stem of the bare backbone.
    pub base_model_path: PathBuf,
    /// Snapshot stem of the backbone with the classification head attached.
    pub updated_model_path: PathBuf,
}

/// Output of the model training stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingArtifact {
    /// Snapshot stem of the final trained model.
    pub trained_model_path: PathBuf,
}
