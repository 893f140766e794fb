//! MobileNetV2 feature extractor for the FPN generator.
//!
//! Only the part of the network that feeds the feature pyramid is built: the
//! stem and the first fifteen inverted residual blocks, grouped into five
//! levels at strides 2, 4, 8, 16 and 32. The trailing 320-channel block and the
//! 1280-channel classifier head never reach the pyramid and are omitted.

use burn::nn::{
    conv::{Conv2d, Conv2dConfig},
    BatchNorm, BatchNormConfig, PaddingConfig2d,
};
use burn::prelude::*;
use burn_extra_ops::{set_require_grad, Relu6};

mod blocks;
pub use blocks::*;

/// `(expansion, out_channels, repeats, first_stride)` per stage.
const INVERTED_RESIDUAL_SETTINGS: [(usize, usize, usize, usize); 6] = [
    (1, 16, 1, 1),
    (6, 24, 2, 2),
    (6, 32, 3, 2),
    (6, 64, 4, 2),
    (6, 96, 3, 1),
    (6, 160, 3, 2),
];

/// Exclusive end index (into the flat feature list, stem = 0) of each level.
const LEVEL_ENDS: [usize; 5] = [2, 4, 7, 11, 16];

const STEM_CHANNELS: usize = 32;

/// MobileNetV2 backbone returning five feature levels.
#[derive(Module, Debug)]
pub struct MobileNetV2Backbone<B: Backend> {
    /// 3x3 stride-2 convolution, feature index 0.
    pub stem: ConvBnRelu6<B>,
    /// Inverted residual blocks grouped by pyramid level.
    pub levels: Vec<Vec<InvertedResidual<B>>>,
}

impl<B: Backend> MobileNetV2Backbone<B> {
    /// Builds the backbone with the reference MobileNetV2 layout.
    pub fn new(device: &Device<B>) -> Self {
        let stem = ConvBnRelu6::new(3, STEM_CHANNELS, 3, 2, 1, device);

        let mut levels: Vec<Vec<InvertedResidual<B>>> =
            (0..LEVEL_ENDS.len()).map(|_| Vec::new()).collect();
        let mut in_channels = STEM_CHANNELS;
        let mut index = 1;

        'settings: for (expansion, out_channels, repeats, first_stride) in
            INVERTED_RESIDUAL_SETTINGS
        {
            for i in 0..repeats {
                if index >= LEVEL_ENDS[LEVEL_ENDS.len() - 1] {
                    break 'settings;
                }
                let stride = if i == 0 { first_stride } else { 1 };
                let block =
                    InvertedResidual::new(in_channels, out_channels, stride, expansion, device);

                let level = LEVEL_ENDS
                    .iter()
                    .position(|&end| index < end)
                    .unwrap_or(LEVEL_ENDS.len() - 1);
                levels[level].push(block);

                in_channels = out_channels;
                index += 1;
            }
        }

        Self { stem, levels }
    }

    /// Forward pass returning the feature map at the end of every level,
    /// finest first.
    pub fn forward(&self, input: Tensor<B, 4>) -> [Tensor<B, 4>; 5] {
        let mut x = self.stem.forward(input);

        core::array::from_fn(|level| {
            x = self.levels[level]
                .iter()
                .fold(x.clone(), |x, block| block.forward(x));
            x.clone()
        })
    }

    /// Channels of each returned level.
    pub const fn output_channels(&self) -> [usize; 5] {
        [16, 24, 32, 64, 160]
    }

    /// Stops (or resumes) gradient tracking on every parameter, stem included.
    pub fn set_frozen(self, frozen: bool) -> Self {
        set_require_grad(self, !frozen)
    }
}

/// Convolution + BatchNorm + ReLU6.
#[derive(Module, Debug)]
pub struct ConvBnRelu6<B: Backend> {
    conv: Conv2d<B>,
    bn: BatchNorm<B, 2>,
    act: Relu6,
}

impl<B: Backend> ConvBnRelu6<B> {
    pub fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        let out = self.conv.forward(input);
        let out = self.bn.forward(out);
        self.act.forward(out)
    }

    /// Create a new block. `groups` equal to the channel count makes it depthwise.
    pub fn new(
        in_channels: usize,
        out_channels: usize,
        kernel_size: usize,
        stride: usize,
        groups: usize,
        device: &Device<B>,
    ) -> Self {
        let padding = (kernel_size - 1) / 2;
        let conv = Conv2dConfig::new([in_channels, out_channels], [kernel_size, kernel_size])
            .with_stride([stride, stride])
            .with_padding(PaddingConfig2d::Explicit(padding, padding))
            .with_groups(groups)
            .with_bias(false)
            .init(device);

        Self {
            conv,
            bn: BatchNormConfig::new(out_channels).init(device),
            act: Relu6::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{Autodiff, NdArray};

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_level_layout() {
        let device = Default::default();
        let model = MobileNetV2Backbone::<TestBackend>::new(&device);

        let blocks: Vec<usize> = model.levels.iter().map(Vec::len).collect();
        assert_eq!(blocks, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_mobilenet_forward() {
        let device = Default::default();
        let model = MobileNetV2Backbone::new(&device);

        let input = Tensor::<TestBackend, 4>::random(
            [1, 3, 64, 64],
            burn::tensor::Distribution::Normal(0.0, 1.0),
            &device,
        );
        let output = model.forward(input);

        assert_eq!(output[0].dims(), [1, 16, 32, 32]); // 64/2
        assert_eq!(output[1].dims(), [1, 24, 16, 16]); // 64/4
        assert_eq!(output[2].dims(), [1, 32, 8, 8]); // 64/8
        assert_eq!(output[3].dims(), [1, 64, 4, 4]); // 64/16
        assert_eq!(output[4].dims(), [1, 160, 2, 2]); // 64/32
    }

    #[test]
    fn test_set_frozen_covers_stem() {
        let device = Default::default();
        let model = MobileNetV2Backbone::<Autodiff<TestBackend>>::new(&device).set_frozen(true);
        assert!(!model.stem.conv.weight.val().is_require_grad());

        let model = model.set_frozen(false);
        assert!(model.stem.conv.weight.val().is_require_grad());
    }

    #[test]
    fn test_output_channels_match_forward() {
        let device = Default::default();
        let model = MobileNetV2Backbone::new(&device);
        let input = Tensor::<TestBackend, 4>::zeros([1, 3, 32, 32], &device);

        let output = model.forward(input);
        let channels = model.output_channels();

        for (feature, expected) in output.iter().zip(channels) {
            assert_eq!(feature.dims()[1], expected);
        }
    }
}
