//! End-to-end training pipeline.
//!
//! Runs the stages strictly in order, handing each stage the artifact of
//! the one before it. The first stage error aborts the run; later stages
//! never start after a failure.

use tracing::info;

use burn::tensor::backend::AutodiffBackend;

use crate::artifacts::{BackboneArtifact, DataIngestionArtifact, TrainingArtifact};
use crate::config::PipelineConfig;
use crate::error::Result;
use crate::ingestion::DataIngestion;
use crate::model::BackbonePreparer;
use crate::training::ModelTrainer;

/// Artifacts of one full pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineArtifacts {
    pub ingestion: DataIngestionArtifact,
    pub backbone: BackboneArtifact,
    /// Absent when the configuration has no training section.
    pub training: Option<TrainingArtifact>,
}

/// Staged training pipeline runner.
pub struct TrainingPipeline {
    config: PipelineConfig,
}

impl TrainingPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run every configured stage in order.
    pub fn run<B: AutodiffBackend>(&self, device: &B::Device) -> Result<PipelineArtifacts> {
        let ingestion_artifact =
            DataIngestion::new(self.config.data_ingestion.clone()).initiate()?;

        let preparer = BackbonePreparer::new(self.config.base_model.clone());
        let backbone_artifact = preparer.initiate::<B>(device)?;

        let training_artifact = match &self.config.training {
            Some(training_config) => {
                let trainer = ModelTrainer::new(
                    training_config.clone(),
                    preparer.classifier_config(),
                    &ingestion_artifact,
                    &backbone_artifact,
                )?;
                Some(trainer.initiate::<B>(device)?)
            }
            None => {
                info!("No training section configured; stopping after base model preparation");
                None
            }
        };

        Ok(PipelineArtifacts {
            ingestion: ingestion_artifact,
            backbone: backbone_artifact,
            training: training_artifact,
        })
    }
}
