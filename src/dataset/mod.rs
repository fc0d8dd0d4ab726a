//! Dataset layout, annotation tables, and batch assembly.

pub mod batcher;
pub mod table;

pub use batcher::{load_image_chw, SkinBatch, SkinBatcher, SkinDataset, SkinItem};
pub use table::{ImageRecord, Split, SplitTable};

use std::path::{Path, PathBuf};

/// Directory inside the extracted archive holding the dataset splits.
pub const DATASET_SUBDIR: &str = "skin_problems_dataset_multilabel";

/// Annotation table filename inside each split directory.
pub const CSV_NAME: &str = "_classes.csv";

/// Resolve the dataset root inside an extraction directory.
pub fn dataset_root(unzip_dir: &Path) -> PathBuf {
    unzip_dir.join(DATASET_SUBDIR)
}
