//! Stage 02: base model preparation.
//!
//! Two explicit steps: build (and persist) the bare backbone, then attach
//! the classification head and persist the combined model. `initiate` runs
//! both in order; callers driving the steps individually must do the same,
//! as attaching a head requires a backbone to attach it to.

use std::path::Path;

use tracing::{info, warn};

use burn::tensor::backend::Backend;

use crate::artifacts::BackboneArtifact;
use crate::config::BackboneConfig;
use crate::error::Result;
use crate::model::classifier::{Backbone, ClassifierConfig, Head, SkinClassifier};
use crate::model::objective::{CompiledModel, Objective};
use crate::model::{load_snapshot, save_snapshot};

/// Base model preparation stage runner.
pub struct BackbonePreparer {
    config: BackboneConfig,
}

impl BackbonePreparer {
    pub fn new(config: BackboneConfig) -> Self {
        Self { config }
    }

    /// Architecture hyperparameters derived from the stage config.
    pub fn classifier_config(&self) -> ClassifierConfig {
        let [height, width, _channels] = self.config.image_size;
        ClassifierConfig::new(height, width)
            .with_num_classes(self.config.num_classes)
            .with_base_filters(self.config.base_filters)
            .with_dropout(self.config.dropout)
    }

    /// Build the headless backbone and persist its snapshot.
    ///
    /// When `weights_source` names an existing snapshot stem the backbone
    /// weights are loaded from it; otherwise the backbone starts from random
    /// initialization. Re-running overwrites the previous snapshot, so with
    /// an unchanged config and weights source the result is identical.
    pub fn build_base<B: Backend>(&self, device: &B::Device) -> Result<Backbone<B>> {
        let config = self.classifier_config();
        let backbone = Backbone::new(&config, device);

        let source = Path::new(&self.config.weights_source);
        let backbone = if crate::model::snapshot_exists(source) {
            info!("Loading pretrained backbone weights from: {}", source.display());
            load_snapshot(backbone, source, device)?
        } else {
            warn!(
                "No pretrained weights at '{}'; backbone starts from random initialization",
                self.config.weights_source
            );
            backbone
        };

        save_snapshot(backbone.clone(), &self.config.base_model_path)?;
        info!("Saved base model: {}", self.config.base_model_path.display());
        Ok(backbone)
    }

    /// Attach a fresh classification head to the given backbone, compile
    /// the combined model for the initial multi-class phase, and persist it.
    ///
    /// The backbone is frozen: full-model freezing, matching a `freeze_all`
    /// preparation. The head is always trainable.
    pub fn attach_head<B: Backend>(
        &self,
        backbone: Backbone<B>,
        device: &B::Device,
    ) -> Result<CompiledModel<B>> {
        let config = self.classifier_config();
        let head = Head::new(&config, device);
        let model = SkinClassifier::from_parts(backbone, head, true);

        let compiled = CompiledModel::new(model, Objective::MultiClass, self.config.learning_rate);

        save_snapshot(compiled.model.clone(), &self.config.updated_model_path)?;
        info!(
            "Saved updated model (backbone + head): {}",
            self.config.updated_model_path.display()
        );
        Ok(compiled)
    }

    /// Run both preparation steps and produce the stage artifact.
    pub fn initiate<B: Backend>(&self, device: &B::Device) -> Result<BackboneArtifact> {
        info!("=== Stage 02: Prepare Base Model started ===");

        let backbone = self.build_base::<B>(device)?;
        let _compiled = self.attach_head(backbone, device)?;

        info!("=== Stage 02: Prepare Base Model completed ===");

        Ok(BackboneArtifact {
            base_model_path: self.config.base_model_path.clone(),
            updated_model_path: self.config.updated_model_path.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::snapshot_file;
    use burn::backend::NdArray;
    use std::path::PathBuf;

    type TestBackend = NdArray;

    fn test_config(dir: &Path, weights_source: &str) -> BackboneConfig {
        BackboneConfig {
            root_dir: dir.to_path_buf(),
            base_model_path: dir.join("base_model"),
            updated_model_path: dir.join("updated_model"),
            image_size: [32, 32, 3],
            include_top: false,
            weights_source: weights_source.to_string(),
            learning_rate: 0.0001,
            num_classes: 10,
            base_filters: 4,
            dropout: 0.5,
        }
    }

    #[test]
    fn test_initiate_writes_both_snapshots() {
        let tmp = tempfile::tempdir().unwrap();
        let preparer = BackbonePreparer::new(test_config(tmp.path(), "imagenet"));
        let device = Default::default();

        let artifact = preparer.initiate::<TestBackend>(&device).unwrap();

        assert!(snapshot_file(&artifact.base_model_path).is_file());
        assert!(snapshot_file(&artifact.updated_model_path).is_file());
    }

    #[test]
    fn test_build_base_is_deterministic_given_weights_source() {
        let tmp = tempfile::tempdir().unwrap();
        let device = Default::default();

        // Seed a backbone snapshot to act as the pretrained source.
        let seed_preparer = BackbonePreparer::new(test_config(tmp.path(), "none"));
        seed_preparer.build_base::<TestBackend>(&device).unwrap();
        let source: PathBuf = tmp.path().join("base_model");

        let dir_a = tmp.path().join("a");
        let dir_b = tmp.path().join("b");
        let preparer_a =
            BackbonePreparer::new(test_config(&dir_a, source.to_str().unwrap()));
        let preparer_b =
            BackbonePreparer::new(test_config(&dir_b, source.to_str().unwrap()));

        let backbone_a = preparer_a.build_base::<TestBackend>(&device).unwrap();
        let backbone_b = preparer_b.build_base::<TestBackend>(&device).unwrap();

        let weight_a = backbone_a.entry_weight().into_data();
        let weight_b = backbone_b.entry_weight().into_data();
        assert_eq!(weight_a, weight_b);
    }

    #[test]
    fn test_attach_head_compiles_for_multiclass_with_frozen_backbone() {
        let tmp = tempfile::tempdir().unwrap();
        let preparer = BackbonePreparer::new(test_config(tmp.path(), "imagenet"));
        let device = Default::default();

        let backbone = preparer.build_base::<TestBackend>(&device).unwrap();
        let compiled = preparer.attach_head(backbone, &device).unwrap();

        assert_eq!(compiled.objective, Objective::MultiClass);
        assert_eq!(compiled.learning_rate, 0.0001);
        assert!(compiled.model.is_backbone_frozen());
    }
}
