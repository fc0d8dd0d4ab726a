//! # skinscan
//!
//! Staged training and inference pipeline for a multi-label skin-problem
//! image classifier, built on the [burn](https://burn.dev) deep learning
//! framework.
//!
//! The training pipeline runs three stages in order, each persisting its
//! outputs to disk and handing only filesystem paths to the next:
//!
//! 1. **Data ingestion** - download and extract the dataset archive
//! 2. **Base model preparation** - build the convolutional backbone,
//!    attach the classification head, persist both snapshots
//! 3. **Model training** - reload the prepared model, fine-tune it on the
//!    multi-label objective, persist the trained snapshot
//!
//! Inference loads the trained snapshot once and scores single images
//! against all ten labels independently.

pub mod artifacts;
pub mod backend;
pub mod config;
pub mod dataset;
pub mod error;
pub mod ingestion;
pub mod labels;
pub mod model;
pub mod pipeline;
pub mod training;
pub mod utils;

pub use artifacts::{BackboneArtifact, DataIngestionArtifact, TrainingArtifact};
pub use backend::{default_device, DefaultBackend, TrainingBackend};
pub use config::PipelineConfig;
pub use error::{Result, SkinScanError};
pub use labels::{LABELS, LABEL_SCHEMA_VERSION, NUM_LABELS};
pub use pipeline::{PredictionReport, Predictor, TrainingPipeline, DEFAULT_THRESHOLD};
