//! Single-image prediction.
//!
//! The [`Predictor`] loads the trained snapshot once at construction and
//! reuses the model for every image it scores. Preprocessing goes through
//! the same `load_image_chw` path as training.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use burn::tensor::backend::Backend;
use burn::tensor::{Tensor, TensorData};

use crate::config::PipelineConfig;
use crate::dataset::load_image_chw;
use crate::error::{Result, SkinScanError};
use crate::labels::{LABELS, NUM_LABELS};
use crate::model::{
    load_snapshot, snapshot_exists, snapshot_file, ClassifierConfig, Objective, SkinClassifier,
};

/// Decision threshold applied when the caller does not supply one.
pub const DEFAULT_THRESHOLD: f32 = 0.5;

/// Score of a single label.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelScore {
    pub label: String,
    /// Sigmoid probability in `[0, 1]`.
    pub probability: f32,
    /// Thresholded decision: 1 when `probability >= threshold`.
    pub prediction: u8,
}

/// Per-label scores for one image, always in label schema order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionReport {
    pub scores: Vec<LabelScore>,
}

impl PredictionReport {
    /// Pair raw per-class probabilities with the label schema and threshold
    /// them. Probabilities must arrive in schema order.
    pub fn from_probabilities(probabilities: &[f32], threshold: f32) -> Result<Self> {
        if probabilities.len() != NUM_LABELS {
            return Err(SkinScanError::Inference(format!(
                "expected {NUM_LABELS} class probabilities, got {}",
                probabilities.len()
            )));
        }

        let scores = LABELS
            .iter()
            .zip(probabilities)
            .map(|(label, &probability)| LabelScore {
                label: (*label).to_string(),
                probability,
                prediction: u8::from(probability >= threshold),
            })
            .collect();
        Ok(Self { scores })
    }

    /// Look up one label's score by name.
    pub fn get(&self, label: &str) -> Option<&LabelScore> {
        self.scores.iter().find(|score| score.label == label)
    }

    /// Labels whose probability cleared the threshold, in schema order.
    pub fn positive_labels(&self) -> Vec<&str> {
        self.scores
            .iter()
            .filter(|score| score.prediction == 1)
            .map(|score| score.label.as_str())
            .collect()
    }
}

impl fmt::Display for PredictionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for score in &self.scores {
            writeln!(
                f,
                "{:<14} {:>6.1}%  {}",
                score.label,
                score.probability * 100.0,
                if score.prediction == 1 { "positive" } else { "-" }
            )?;
        }
        Ok(())
    }
}

/// Reusable single-image predictor.
pub struct Predictor<B: Backend> {
    model: SkinClassifier<B>,
    height: usize,
    width: usize,
    device: B::Device,
}

impl<B: Backend> Predictor<B> {
    /// Load the trained snapshot named by the pipeline configuration.
    ///
    /// Requires a training section: prediction only makes sense against a
    /// trained model.
    pub fn from_config(config: &PipelineConfig, device: &B::Device) -> Result<Self> {
        let training = config.training.as_ref().ok_or_else(|| {
            SkinScanError::Config(
                "prediction requires a training section naming the trained model".to_string(),
            )
        })?;

        let [height, width, _] = training.image_size;
        let classifier_config = ClassifierConfig::new(height, width)
            .with_num_classes(config.base_model.num_classes)
            .with_base_filters(config.base_model.base_filters)
            .with_dropout(config.base_model.dropout);

        Self::load(&classifier_config, &training.trained_model_path, device)
    }

    /// Load a trained snapshot directly.
    pub fn load(
        config: &ClassifierConfig,
        trained_model_path: &Path,
        device: &B::Device,
    ) -> Result<Self> {
        if !snapshot_exists(trained_model_path) {
            return Err(SkinScanError::SnapshotMissing(snapshot_file(
                trained_model_path,
            )));
        }

        let model = SkinClassifier::new(config, device);
        let model = load_snapshot(model, trained_model_path, device)?;
        info!("Loaded trained model: {}", trained_model_path.display());

        Ok(Self {
            model,
            height: config.height,
            width: config.width,
            device: device.clone(),
        })
    }

    /// Score one image file against every label.
    pub fn predict(&self, image_path: &Path, threshold: f32) -> Result<PredictionReport> {
        let pixels = load_image_chw(image_path, self.height, self.width)?;
        let input = Tensor::<B, 4>::from_data(
            TensorData::new(pixels, [1, 3, self.height, self.width]),
            &self.device,
        );

        let logits = self.model.forward(input);
        let probabilities: Vec<f32> = Objective::MultiLabel
            .probabilities(logits)
            .into_data()
            .to_vec()
            .map_err(|e| SkinScanError::Inference(format!("{e:?}")))?;

        PredictionReport::from_probabilities(&probabilities, threshold)
    }
}
