//! Pipeline orchestration: staged training and single-image prediction.

pub mod prediction;
pub mod training;

pub use prediction::{LabelScore, PredictionReport, Predictor, DEFAULT_THRESHOLD};
pub use training::{PipelineArtifacts, TrainingPipeline};
