//! Typed pipeline configuration loaded from a YAML file.
//!
//! Each stage receives its own immutable config struct, constructed once per
//! pipeline run. The loader is the only component that touches the config
//! file; the stages treat their structs as read-only inputs.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SkinScanError};
use crate::labels::NUM_LABELS;

/// Root configuration: one section per pipeline stage.
///
/// The `training` section is optional; when omitted the training pipeline
/// runs only the stages it is given (ingestion + base model preparation).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Root directory for all stage artifacts.
    pub artifacts_root: PathBuf,
    /// Stage 01: dataset acquisition.
    pub data_ingestion: DataIngestionConfig,
    /// Stage 02: backbone preparation.
    pub base_model: BackboneConfig,
    /// Stage 03: supervised training (optional).
    pub training: Option<TrainingConfig>,
}

/// Configuration for the data ingestion stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataIngestionConfig {
    /// Working directory for this stage.
    pub root_dir: PathBuf,
    /// Where the downloaded archive is written.
    pub local_archive_path: PathBuf,
    /// Directory the archive is extracted into.
    pub unzip_dir: PathBuf,
    /// Opaque remote-storage identifier resolved into a download URL.
    pub remote_file_id: String,
}

/// Configuration for the backbone preparation stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackboneConfig {
    /// Working directory for this stage.
    pub root_dir: PathBuf,
    /// Snapshot path (extension-less stem) for the bare backbone.
    pub base_model_path: PathBuf,
    /// Snapshot path (extension-less stem) for backbone + head.
    pub updated_model_path: PathBuf,
    /// Input geometry as `[height, width, channels]`.
    pub image_size: [usize; 3],
    /// The backbone is always built without its original classifier;
    /// `true` is rejected as unsupported.
    pub include_top: bool,
    /// Named source or filesystem path for pretrained backbone weights.
    pub weights_source: String,
    /// Learning rate recorded with the phase-2 (multi-class) compile.
    pub learning_rate: f64,
    /// Number of output classes; must match the label schema.
    pub num_classes: usize,
    /// Base convolutional width; stage widths grow as 1x/2x/4x/8x/8x.
    #[serde(default = "default_base_filters")]
    pub base_filters: usize,
    /// Dropout rate of the classification head.
    #[serde(default = "default_dropout")]
    pub dropout: f64,
}

fn default_base_filters() -> usize {
    64
}

fn default_dropout() -> f64 {
    0.5
}

/// Configuration for the supervised training stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Snapshot path (extension-less stem) for the final trained model.
    pub trained_model_path: PathBuf,
    /// Input geometry as `[height, width, channels]`; must match the
    /// backbone stage so preprocessing is identical everywhere.
    pub image_size: [usize; 3],
    /// Examples per batch.
    pub batch_size: usize,
    /// Number of passes over the training split.
    pub epochs: usize,
    /// Learning rate for the multi-label recompile.
    pub learning_rate: f64,
    /// Data loader worker threads (bounded prefetch depth).
    #[serde(default = "default_num_workers")]
    pub num_workers: usize,
    /// Seed for the training split shuffle.
    #[serde(default = "default_seed")]
    pub seed: u64,
}

fn default_num_workers() -> usize {
    4
}

fn default_seed() -> u64 {
    42
}

impl PipelineConfig {
    /// Load and validate configuration from a YAML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            SkinScanError::Config(format!("cannot read config file '{}': {e}", path.display()))
        })?;
        Self::from_yaml(&text)
    }

    /// Parse and validate configuration from YAML text.
    pub fn from_yaml(text: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(text)
            .map_err(|e| SkinScanError::Config(format!("invalid config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.base_model.include_top {
            return Err(SkinScanError::Config(
                "include_top: true is not supported; the backbone is always built headless"
                    .to_string(),
            ));
        }
        if self.base_model.num_classes != NUM_LABELS {
            return Err(SkinScanError::Config(format!(
                "num_classes must equal the label schema length ({NUM_LABELS}), got {}",
                self.base_model.num_classes
            )));
        }
        validate_image_size("base_model", &self.base_model.image_size)?;
        if let Some(training) = &self.training {
            validate_image_size("training", &training.image_size)?;
            if training.image_size != self.base_model.image_size {
                return Err(SkinScanError::Config(
                    "training.image_size must match base_model.image_size".to_string(),
                ));
            }
            if training.batch_size == 0 {
                return Err(SkinScanError::Config("batch_size must be positive".to_string()));
            }
        }
        Ok(())
    }
}

/// Minimum input edge length. Five pooling stages each halve the spatial
/// dimensions; anything smaller leaves an empty feature map.
const MIN_IMAGE_EDGE: usize = 32;

fn validate_image_size(section: &str, size: &[usize; 3]) -> Result<()> {
    let [height, width, channels] = *size;
    if channels != 3 {
        return Err(SkinScanError::Config(format!(
            "{section}.image_size must have 3 channels (RGB), got {channels}"
        )));
    }
    if height < MIN_IMAGE_EDGE || width < MIN_IMAGE_EDGE {
        return Err(SkinScanError::Config(format!(
            "{section}.image_size must be at least {MIN_IMAGE_EDGE}x{MIN_IMAGE_EDGE}, got [{height}, {width}]"
        )));
    }
    Ok(())
}
