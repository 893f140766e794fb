use backbones::{GhostModule, GhostModuleConfig};
use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        PaddingConfig2d, Relu,
    },
    prelude::*,
};
use burn_extra_ops::{Norm2d, NormKind};

/// How a convolution slot of the pyramid is realised.
#[derive(Config, Debug, PartialEq, Eq)]
pub enum ConvStyle {
    /// A regular convolution.
    Plain,
    /// A Ghost module without inner normalization or activation.
    Ghost,
    /// A Ghost module with instance norm and ReLU on both branches.
    NormalizedGhost,
}

/// Configuration for a [`ConvUnit`].
#[derive(Config, Debug)]
pub struct ConvUnitConfig {
    in_channels: usize,
    out_channels: usize,
    #[config(default = "3")]
    kernel_size: usize,
    #[config(default = "ConvStyle::Plain")]
    style: ConvStyle,
    #[config(default = "false")]
    bias: bool,
}

impl ConvUnitConfig {
    pub fn init<B: Backend>(&self, device: &Device<B>) -> ConvUnit<B> {
        match self.style {
            ConvStyle::Plain => {
                let padding = self.kernel_size / 2;
                ConvUnit::Plain(
                    Conv2dConfig::new(
                        [self.in_channels, self.out_channels],
                        [self.kernel_size, self.kernel_size],
                    )
                    .with_padding(PaddingConfig2d::Explicit(padding, padding))
                    .with_bias(self.bias)
                    .init(device),
                )
            }
            ConvStyle::Ghost => ConvUnit::Ghost(
                self.ghost_config()
                    .with_relu(false)
                    .with_norm(NormKind::None)
                    .init(device),
            ),
            ConvStyle::NormalizedGhost => ConvUnit::Ghost(
                self.ghost_config()
                    .with_relu(true)
                    .with_norm(NormKind::Instance)
                    .init(device),
            ),
        }
    }

    fn ghost_config(&self) -> GhostModuleConfig {
        GhostModuleConfig::new(self.in_channels, self.out_channels)
            .with_kernel_size(self.kernel_size)
            .with_bias(self.bias)
    }
}

/// A single convolution slot: either a plain convolution or a Ghost module.
#[derive(Module, Debug)]
pub enum ConvUnit<B: Backend> {
    Plain(Conv2d<B>),
    Ghost(GhostModule<B>),
}

impl<B: Backend> ConvUnit<B> {
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        match self {
            Self::Plain(conv) => conv.forward(x),
            Self::Ghost(ghost) => ghost.forward(x),
        }
    }
}

/// Convolution slot followed by the configured normalization and a ReLU.
#[derive(Module, Debug)]
pub struct ConvNormRelu<B: Backend> {
    conv: ConvUnit<B>,
    norm: Norm2d<B>,
    relu: Relu,
}

impl<B: Backend> ConvNormRelu<B> {
    pub fn new(conv: ConvUnitConfig, norm: &NormKind, device: &Device<B>) -> Self {
        let out_channels = conv.out_channels;

        Self {
            conv: conv.init(device),
            norm: norm.init(out_channels, device),
            relu: Relu::new(),
        }
    }

    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        self.relu.forward(self.norm.forward(self.conv.forward(x)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::{backend::NdArray, tensor::Distribution};

    type TestBackend = NdArray<f32>;

    fn input(channels: usize) -> Tensor<TestBackend, 4> {
        Tensor::random(
            [2, channels, 8, 8],
            Distribution::Normal(0.0, 1.0),
            &Default::default(),
        )
    }

    #[test]
    fn test_every_style_keeps_spatial_size() {
        let device = Default::default();

        for style in [ConvStyle::Plain, ConvStyle::Ghost, ConvStyle::NormalizedGhost] {
            let unit = ConvUnitConfig::new(16, 12)
                .with_style(style.clone())
                .init::<TestBackend>(&device);
            assert_eq!(unit.forward(input(16)).dims(), [2, 12, 8, 8], "{style:?}");

            let pointwise = ConvUnitConfig::new(16, 7)
                .with_kernel_size(1)
                .with_style(style.clone())
                .init::<TestBackend>(&device);
            assert_eq!(pointwise.forward(input(16)).dims(), [2, 7, 8, 8], "{style:?}");
        }
    }

    #[test]
    fn test_normalized_ghost_is_non_negative() {
        let device = Default::default();
        let unit = ConvUnitConfig::new(8, 8)
            .with_style(ConvStyle::NormalizedGhost)
            .init::<TestBackend>(&device);

        let min = unit.forward(input(8)).min().into_scalar();
        assert!(min >= 0.0);
    }

    #[test]
    fn test_conv_norm_relu() {
        let device = Default::default();
        let block = ConvNormRelu::<TestBackend>::new(
            ConvUnitConfig::new(16, 16).with_bias(true),
            &NormKind::Instance,
            &device,
        );

        let output = block.forward(input(16));
        assert_eq!(output.dims(), [2, 16, 8, 8]);
        assert!(output.min().into_scalar() >= 0.0);
    }
}
