//! VGG-style convolutional classifier.
//!
//! The network splits into two parts with different training treatment: a
//! convolutional [`Backbone`] that may be frozen, and a dense classification
//! [`Head`] that is always trainable. `forward` emits raw logits; callers
//! pick the activation through their training objective.

use burn::config::Config;
use burn::module::Module;
use burn::nn::conv::{Conv2d, Conv2dConfig};
use burn::nn::pool::{MaxPool2d, MaxPool2dConfig};
use burn::nn::{Dropout, DropoutConfig, Linear, LinearConfig, PaddingConfig2d, Relu};
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

use crate::labels::NUM_LABELS;

/// Number of conv stages; each halves the spatial resolution.
const NUM_STAGES: usize = 5;

/// Architecture hyperparameters.
///
/// The snapshot format stores weights only, so the module must be rebuilt
/// from this config before a snapshot can be loaded into it.
#[derive(Config, Debug)]
pub struct ClassifierConfig {
    /// Input image height.
    pub height: usize,
    /// Input image width.
    pub width: usize,
    /// Number of output classes.
    #[config(default = "NUM_LABELS")]
    pub num_classes: usize,
    /// Width of the first conv stage; later stages grow as 2x/4x/8x/8x.
    #[config(default = 64)]
    pub base_filters: usize,
    /// Dropout rate of the classification head.
    #[config(default = 0.5)]
    pub dropout: f64,
    /// Hidden width of the classification head.
    #[config(default = 256)]
    pub hidden_size: usize,
}

impl ClassifierConfig {
    /// Per-stage output channel counts.
    pub fn stage_widths(&self) -> [usize; NUM_STAGES] {
        let f = self.base_filters;
        [f, 2 * f, 4 * f, 8 * f, 8 * f]
    }

    /// Flattened feature size after the backbone, for the given input
    /// geometry. Each stage floor-halves the spatial dimensions.
    pub fn feature_dim(&self) -> usize {
        let h = (0..NUM_STAGES).fold(self.height, |d, _| d / 2);
        let w = (0..NUM_STAGES).fold(self.width, |d, _| d / 2);
        self.stage_widths()[NUM_STAGES - 1] * h * w
    }
}

/// Conv -> ReLU -> MaxPool block.
#[derive(Module, Debug)]
pub struct ConvBlock<B: Backend> {
    conv: Conv2d<B>,
    activation: Relu,
    pool: MaxPool2d,
}

impl<B: Backend> ConvBlock<B> {
    fn new(in_channels: usize, out_channels: usize, device: &B::Device) -> Self {
        Self {
            conv: Conv2dConfig::new([in_channels, out_channels], [3, 3])
                .with_padding(PaddingConfig2d::Same)
                .init(device),
            activation: Relu::new(),
            pool: MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init(),
        }
    }

    fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self.conv.forward(x);
        let x = self.activation.forward(x);
        self.pool.forward(x)
    }
}

/// Convolutional feature extractor.
#[derive(Module, Debug)]
pub struct Backbone<B: Backend> {
    block1: ConvBlock<B>,
    block2: ConvBlock<B>,
    block3: ConvBlock<B>,
    block4: ConvBlock<B>,
    block5: ConvBlock<B>,
}

impl<B: Backend> Backbone<B> {
    pub fn new(config: &ClassifierConfig, device: &B::Device) -> Self {
        let [w1, w2, w3, w4, w5] = config.stage_widths();
        Self {
            block1: ConvBlock::new(3, w1, device),
            block2: ConvBlock::new(w1, w2, device),
            block3: ConvBlock::new(w2, w3, device),
            block4: ConvBlock::new(w3, w4, device),
            block5: ConvBlock::new(w4, w5, device),
        }
    }

    /// Reference to the first conv weight tensor, for change-tracking in
    /// tests.
    #[cfg(test)]
    pub fn entry_weight(&self) -> Tensor<B, 4> {
        self.block1.conv.weight.val()
    }

    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self.block1.forward(x);
        let x = self.block2.forward(x);
        let x = self.block3.forward(x);
        let x = self.block4.forward(x);
        self.block5.forward(x)
    }
}

/// Dense classification head: flatten -> hidden -> dropout -> logits.
#[derive(Module, Debug)]
pub struct Head<B: Backend> {
    fc1: Linear<B>,
    dropout: Dropout,
    fc2: Linear<B>,
    activation: Relu,
}

impl<B: Backend> Head<B> {
    pub fn new(config: &ClassifierConfig, device: &B::Device) -> Self {
        Self {
            fc1: LinearConfig::new(config.feature_dim(), config.hidden_size).init(device),
            dropout: DropoutConfig::new(config.dropout).init(),
            fc2: LinearConfig::new(config.hidden_size, config.num_classes).init(device),
            activation: Relu::new(),
        }
    }

    pub fn forward(&self, features: Tensor<B, 4>) -> Tensor<B, 2> {
        let [batch, channels, height, width] = features.dims();
        let x = features.reshape([batch, channels * height * width]);
        let x = self.fc1.forward(x);
        let x = self.activation.forward(x);
        let x = self.dropout.forward(x);
        self.fc2.forward(x)
    }
}

/// Full classifier: backbone + head.
#[derive(Module, Debug)]
pub struct SkinClassifier<B: Backend> {
    backbone: Backbone<B>,
    head: Head<B>,
    /// When set, backbone activations are detached in `forward` so gradients
    /// only reach the head and optimizer steps leave the backbone unchanged.
    freeze_backbone: bool,
}

impl<B: Backend> SkinClassifier<B> {
    /// Fresh model with randomly initialized weights and a frozen backbone.
    pub fn new(config: &ClassifierConfig, device: &B::Device) -> Self {
        Self::from_parts(Backbone::new(config, device), Head::new(config, device), true)
    }

    /// Assemble a classifier from an existing backbone and head.
    pub fn from_parts(backbone: Backbone<B>, head: Head<B>, freeze_backbone: bool) -> Self {
        Self {
            backbone,
            head,
            freeze_backbone,
        }
    }

    /// Compute raw logits of shape `[batch, num_classes]`.
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let features = self.backbone.forward(images);
        let features = if self.freeze_backbone {
            features.detach()
        } else {
            features
        };
        self.head.forward(features)
    }

    pub fn is_backbone_frozen(&self) -> bool {
        self.freeze_backbone
    }

    /// Reference to a head weight tensor, for change-tracking in tests and
    /// recompile verification.
    #[cfg(test)]
    pub fn head_output_weight(&self) -> Tensor<B, 2> {
        self.head.fc2.weight.val()
    }

    /// Reference to a backbone weight tensor.
    #[cfg(test)]
    pub fn backbone_entry_weight(&self) -> Tensor<B, 4> {
        self.backbone.block1.conv.weight.val()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::tensor::Distribution;

    type TestBackend = NdArray;

    fn tiny_config() -> ClassifierConfig {
        ClassifierConfig::new(64, 64).with_base_filters(4).with_hidden_size(16)
    }

    #[test]
    fn test_feature_dim_follows_five_halvings() {
        let config = ClassifierConfig::new(224, 224);
        // 224 / 2^5 = 7; last stage width is 8 * 64.
        assert_eq!(config.feature_dim(), 512 * 7 * 7);

        let tiny = tiny_config();
        assert_eq!(tiny.feature_dim(), 32 * 2 * 2);
    }

    #[test]
    fn test_forward_output_shape() {
        let device = Default::default();
        let config = tiny_config();
        let model = SkinClassifier::<TestBackend>::new(&config, &device);

        let images =
            Tensor::<TestBackend, 4>::random([2, 3, 64, 64], Distribution::Default, &device);
        let logits = model.forward(images);
        assert_eq!(logits.dims(), [2, NUM_LABELS]);
    }

    #[test]
    fn test_odd_input_floor_halves() {
        let device = Default::default();
        let config = ClassifierConfig::new(50, 50).with_base_filters(4).with_hidden_size(16);
        let model = SkinClassifier::<TestBackend>::new(&config, &device);

        let images =
            Tensor::<TestBackend, 4>::random([1, 3, 50, 50], Distribution::Default, &device);
        let logits = model.forward(images);
        assert_eq!(logits.dims(), [1, NUM_LABELS]);
    }
}
