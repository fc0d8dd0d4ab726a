//! Stage 03: fine-tune the prepared model on the extracted dataset.
//!
//! The trainer never receives a model in memory: it reloads the prepared
//! snapshot from disk, recompiles it for multi-label training, runs the
//! epoch loop, and persists the result. Validation runs after every epoch
//! and the held-out test split is scored once at the end.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use tracing::info;

use burn::data::dataloader::{DataLoader, DataLoaderBuilder};
use burn::module::AutodiffModule;
use burn::optim::{AdamConfig, GradientsParams, Optimizer};
use burn::tensor::activation::sigmoid;
use burn::tensor::backend::{AutodiffBackend, Backend};
use burn::tensor::{ElementConversion, Int, Tensor};

use crate::artifacts::{BackboneArtifact, DataIngestionArtifact, TrainingArtifact};
use crate::config::TrainingConfig;
use crate::dataset::{dataset_root, SkinBatch, SkinBatcher, SkinDataset, Split, SplitTable};
use crate::error::{Result, SkinScanError};
use crate::model::{
    load_snapshot, save_snapshot, snapshot_exists, snapshot_file, ClassifierConfig,
    CompiledModel, Objective, SkinClassifier,
};
use crate::utils::format_duration;

/// Model training stage runner.
pub struct ModelTrainer {
    config: TrainingConfig,
    classifier_config: ClassifierConfig,
    dataset_dir: PathBuf,
    updated_model_path: PathBuf,
}

impl ModelTrainer {
    /// Bind the stage to its inputs.
    ///
    /// Fails fast when the prepared snapshot is missing, so a pipeline wired
    /// out of order is caught before any data is decoded.
    pub fn new(
        config: TrainingConfig,
        classifier_config: ClassifierConfig,
        ingestion: &DataIngestionArtifact,
        backbone: &BackboneArtifact,
    ) -> Result<Self> {
        if !snapshot_exists(&backbone.updated_model_path) {
            return Err(SkinScanError::SnapshotMissing(snapshot_file(
                &backbone.updated_model_path,
            )));
        }
        Ok(Self {
            config,
            classifier_config,
            dataset_dir: dataset_root(&ingestion.unzip_dir),
            updated_model_path: backbone.updated_model_path.clone(),
        })
    }

    /// Run the full training stage and produce the stage artifact.
    pub fn initiate<B: AutodiffBackend>(&self, device: &B::Device) -> Result<TrainingArtifact> {
        info!("=== Stage 03: Model Training started ===");
        let started = Instant::now();

        let [height, width, _] = self.config.image_size;

        let train_table = SplitTable::load(&self.dataset_dir, Split::Train)?;
        let valid_table = SplitTable::load(&self.dataset_dir, Split::Valid)?;
        let test_table = SplitTable::load(&self.dataset_dir, Split::Test)?;

        let train_loader = DataLoaderBuilder::new(SkinBatcher::<B>::new(height, width))
            .batch_size(self.config.batch_size)
            .shuffle(self.config.seed)
            .num_workers(self.config.num_workers)
            .set_device(device.clone())
            .build(SkinDataset::new(train_table, height, width)?);

        // Autodiff backends share their inner backend's device type.
        let inner_device: <B::InnerBackend as Backend>::Device = device.clone();
        let valid_loader = eval_loader::<B::InnerBackend>(
            valid_table,
            height,
            width,
            self.config.batch_size,
            self.config.num_workers,
            &inner_device,
        )?;
        let test_loader = eval_loader::<B::InnerBackend>(
            test_table,
            height,
            width,
            self.config.batch_size,
            self.config.num_workers,
            &inner_device,
        )?;

        // Reload the prepared model from disk. The snapshot was compiled for
        // the single-label phase; rebinding the same weights to the
        // multi-label objective is the training-phase recompile.
        let model = SkinClassifier::<B>::new(&self.classifier_config, device);
        let model = load_snapshot(model, &self.updated_model_path, device)?;
        info!("Loaded prepared model: {}", self.updated_model_path.display());
        let compiled = CompiledModel::new(model, Objective::MultiClass, self.config.learning_rate)
            .recompile(Objective::MultiLabel, self.config.learning_rate);
        let objective = compiled.objective;
        let learning_rate = compiled.learning_rate;
        let mut model = compiled.model;

        let mut optimizer = AdamConfig::new().init();

        for epoch in 1..=self.config.epochs {
            let epoch_started = Instant::now();
            let mut epoch_loss = 0.0;
            let mut epoch_accuracy = 0.0;
            let mut batches = 0usize;

            for batch in train_loader.iter() {
                let logits = model.forward(batch.images);
                let loss = objective.loss(logits.clone(), batch.targets.clone(), device);

                epoch_loss += loss.clone().into_scalar().elem::<f64>();
                epoch_accuracy += binary_accuracy(logits, batch.targets);
                batches += 1;

                let grads = GradientsParams::from_grads(loss.backward(), &model);
                model = optimizer.step(learning_rate, model, grads);
            }

            let batches = batches.max(1) as f64;
            let (valid_loss, valid_accuracy) =
                evaluate(&model.valid(), objective, &valid_loader, &inner_device);

            info!(
                "Epoch {}/{} - loss: {:.4} - binary_accuracy: {:.4} - val_loss: {:.4} - val_binary_accuracy: {:.4} ({})",
                epoch,
                self.config.epochs,
                epoch_loss / batches,
                epoch_accuracy / batches,
                valid_loss,
                valid_accuracy,
                format_duration(epoch_started.elapsed().as_secs_f64()),
            );
        }

        let (test_loss, test_accuracy) =
            evaluate(&model.valid(), objective, &test_loader, &inner_device);
        info!("Test evaluation - loss: {:.4} - binary_accuracy: {:.4}", test_loss, test_accuracy);

        save_snapshot(model, &self.config.trained_model_path)?;
        info!("Saved trained model: {}", self.config.trained_model_path.display());

        info!(
            "=== Stage 03: Model Training completed in {} ===",
            format_duration(started.elapsed().as_secs_f64())
        );

        Ok(TrainingArtifact {
            trained_model_path: self.config.trained_model_path.clone(),
        })
    }
}

fn eval_loader<BE: Backend>(
    table: SplitTable,
    height: usize,
    width: usize,
    batch_size: usize,
    num_workers: usize,
    device: &BE::Device,
) -> Result<Arc<dyn DataLoader<BE, SkinBatch<BE>>>> {
    Ok(DataLoaderBuilder::new(SkinBatcher::<BE>::new(height, width))
        .batch_size(batch_size)
        .num_workers(num_workers)
        .set_device(device.clone())
        .build(SkinDataset::new(table, height, width)?))
}

/// Fraction of per-label predictions that match the targets, with the
/// decision threshold fixed at 0.5.
fn binary_accuracy<BE: Backend>(logits: Tensor<BE, 2>, targets: Tensor<BE, 2, Int>) -> f64 {
    let [batch, classes] = logits.dims();
    let predictions: Tensor<BE, 2, Int> = sigmoid(logits).greater_equal_elem(0.5).int();
    let correct = predictions
        .equal(targets)
        .int()
        .sum()
        .into_scalar()
        .elem::<i64>();
    correct as f64 / (batch * classes) as f64
}

/// Mean loss and binary accuracy over one evaluation split.
fn evaluate<BE: Backend>(
    model: &SkinClassifier<BE>,
    objective: Objective,
    loader: &Arc<dyn DataLoader<BE, SkinBatch<BE>>>,
    device: &BE::Device,
) -> (f64, f64) {
    let mut total_loss = 0.0;
    let mut total_accuracy = 0.0;
    let mut batches = 0usize;

    for batch in loader.iter() {
        let logits = model.forward(batch.images);
        let loss = objective.loss(logits.clone(), batch.targets.clone(), device);
        total_loss += loss.into_scalar().elem::<f64>();
        total_accuracy += binary_accuracy(logits, batch.targets);
        batches += 1;
    }

    let batches = batches.max(1) as f64;
    (total_loss / batches, total_accuracy / batches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::tensor::TensorData;

    type TestBackend = burn::backend::NdArray;

    #[test]
    fn test_binary_accuracy_counts_per_label_matches() {
        let device = Default::default();
        let logits = Tensor::<TestBackend, 2>::from_data(
            TensorData::new(vec![5.0_f32, -5.0, 5.0, -5.0], [1, 4]),
            &device,
        );
        let targets = Tensor::<TestBackend, 2, Int>::from_data(
            TensorData::new(vec![1_i64, 0, 0, 0], [1, 4]),
            &device,
        );

        // Three of four labels agree.
        let accuracy = binary_accuracy(logits, targets);
        assert!((accuracy - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_trainer_requires_prepared_snapshot() {
        let tmp = tempfile::tempdir().unwrap();
        let ingestion = DataIngestionArtifact {
            archive_path: tmp.path().join("data.zip"),
            unzip_dir: tmp.path().join("extracted"),
        };
        let backbone = BackboneArtifact {
            base_model_path: tmp.path().join("base_model"),
            updated_model_path: tmp.path().join("updated_model"),
        };
        let config = TrainingConfig {
            trained_model_path: tmp.path().join("trained_model"),
            image_size: [32, 32, 3],
            batch_size: 1,
            epochs: 1,
            learning_rate: 0.01,
            num_workers: 1,
            seed: 42,
        };

        let result = ModelTrainer::new(
            config,
            ClassifierConfig::new(32, 32).with_base_filters(4),
            &ingestion,
            &backbone,
        );
        assert!(matches!(result, Err(SkinScanError::SnapshotMissing(_))));
    }
}
