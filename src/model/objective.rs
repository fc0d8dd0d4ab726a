//! Training objectives and the compile step.
//!
//! "Compiling" pairs a model with an objective and a learning rate. It is a
//! pure reconfiguration: the model's weights and topology are untouched, so
//! a model can be snapshot under one objective and later recompiled under
//! another without losing anything it has learned.

use burn::nn::loss::BinaryCrossEntropyLossConfig;
use burn::tensor::activation::{log_softmax, sigmoid};
use burn::tensor::backend::Backend;
use burn::tensor::{Int, Tensor};

use super::classifier::SkinClassifier;

/// Loss and activation pairing for a training phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Objective {
    /// Softmax + categorical cross-entropy; one label per example.
    MultiClass,
    /// Sigmoid + binary cross-entropy; labels scored independently.
    MultiLabel,
}

impl Objective {
    /// Mean loss over a batch of logits against multi-hot integer targets.
    pub fn loss<B: Backend>(
        &self,
        logits: Tensor<B, 2>,
        targets: Tensor<B, 2, Int>,
        device: &B::Device,
    ) -> Tensor<B, 1> {
        match self {
            Objective::MultiClass => {
                let log_probs = log_softmax(logits, 1);
                (targets.float() * log_probs).sum_dim(1).mean().neg()
            }
            Objective::MultiLabel => BinaryCrossEntropyLossConfig::new()
                .with_logits(true)
                .init(device)
                .forward(logits, targets),
        }
    }

    /// Map logits to per-class probabilities.
    ///
    /// Multi-label inference always applies an independent sigmoid per
    /// class; it never inherits the softmax of an earlier phase.
    pub fn probabilities<B: Backend>(&self, logits: Tensor<B, 2>) -> Tensor<B, 2> {
        match self {
            Objective::MultiClass => log_softmax(logits, 1).exp(),
            Objective::MultiLabel => sigmoid(logits),
        }
    }
}

/// A model bound to its current objective and learning rate.
#[derive(Debug)]
pub struct CompiledModel<B: Backend> {
    pub model: SkinClassifier<B>,
    pub objective: Objective,
    pub learning_rate: f64,
}

impl<B: Backend> CompiledModel<B> {
    pub fn new(model: SkinClassifier<B>, objective: Objective, learning_rate: f64) -> Self {
        Self {
            model,
            objective,
            learning_rate,
        }
    }

    /// Rebind the same weights to a different objective.
    pub fn recompile(self, objective: Objective, learning_rate: f64) -> Self {
        Self {
            model: self.model,
            objective,
            learning_rate,
        }
    }
}
