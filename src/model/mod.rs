//! Model architecture, objectives, and the backbone preparation stage.

pub mod classifier;
pub mod objective;
pub mod prepare;

pub use classifier::{Backbone, ClassifierConfig, Head, SkinClassifier};
pub use objective::{CompiledModel, Objective};
pub use prepare::BackbonePreparer;

use std::path::{Path, PathBuf};

use burn::module::Module;
use burn::record::CompactRecorder;
use burn::tensor::backend::Backend;

use crate::error::{Result, SkinScanError};
use crate::utils::ensure_dir;

/// The on-disk file backing a snapshot stem.
///
/// Snapshot paths in configuration are extension-less stems; the recorder
/// appends its own extension when writing.
pub fn snapshot_file(stem: &Path) -> PathBuf {
    stem.with_extension("mpk")
}

/// Whether a snapshot stem has been persisted.
pub fn snapshot_exists(stem: &Path) -> bool {
    snapshot_file(stem).exists()
}

/// Persist a module snapshot, creating parent directories as needed.
pub fn save_snapshot<B: Backend, M: Module<B>>(module: M, stem: &Path) -> Result<()> {
    if let Some(parent) = stem.parent() {
        ensure_dir(parent)?;
    }
    module
        .save_file(stem, &CompactRecorder::new())
        .map_err(|e| SkinScanError::Persistence {
            path: stem.to_path_buf(),
            message: e.to_string(),
        })
}

/// Load a module snapshot into a freshly initialized module.
pub fn load_snapshot<B: Backend, M: Module<B>>(
    module: M,
    stem: &Path,
    device: &B::Device,
) -> Result<M> {
    module
        .load_file(stem, &CompactRecorder::new(), device)
        .map_err(|e| SkinScanError::Persistence {
            path: stem.to_path_buf(),
            message: e.to_string(),
        })
}
