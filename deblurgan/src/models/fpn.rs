//! # Feature Pyramid Network
//!
//! Bottom-up features come from the backbone. Each level is projected by a
//! lateral 1x1 slot, then merged top-down: the coarser map is upsampled
//! (nearest), added to the lateral and passed through a 3x3 conv, norm and
//! ReLU. The finest lateral is returned as-is for the generator's final skip
//! connection.

use backbones::{create_backbone, Backbone, BackboneWrapper};
use burn::prelude::*;
use burn_extra_ops::NormKind;

use super::modules::{spatial_size, upsample_to, ConvNormRelu, ConvStyle, ConvUnit, ConvUnitConfig};
use crate::config::Generator;

/// How each generator fills the convolution slots around its backbone.
#[derive(Debug, Clone)]
pub struct FpnLayout {
    /// Style of the lateral 1x1 projections (always bias-free).
    pub lateral: ConvStyle,
    /// Style of the top-down, head, smoothing and output convolutions.
    pub body: ConvStyle,
    /// Whether the smoothing and output convolutions carry a bias.
    pub output_bias: bool,
    /// The coarsest level is a 1x1 global vector broadcast onto a grid.
    pub global_context: bool,
}

impl FpnLayout {
    pub fn of(generator: &Generator) -> Self {
        match generator {
            Generator::FpnMobileNet => Self {
                lateral: ConvStyle::Plain,
                body: ConvStyle::Plain,
                output_bias: true,
                global_context: false,
            },
            Generator::FpnGhostNetV2 => Self {
                lateral: ConvStyle::NormalizedGhost,
                body: ConvStyle::NormalizedGhost,
                output_bias: false,
                global_context: true,
            },
            Generator::FpnGhostNetV4 => Self {
                lateral: ConvStyle::Plain,
                body: ConvStyle::Ghost,
                output_bias: true,
                global_context: false,
            },
        }
    }
}

/// Configuration for the [`Fpn`] module.
#[derive(Config, Debug)]
pub struct FpnConfig {
    /// The generator whose backbone and slot layout to use.
    generator: Generator,
    /// Normalization after each top-down convolution.
    #[config(default = "NormKind::Instance")]
    norm: NormKind,
    /// Channels of every pyramid map.
    #[config(default = "128")]
    num_filters: usize,
    /// Start with the backbone frozen.
    #[config(default = "true")]
    frozen: bool,
}

impl FpnConfig {
    pub fn init<B: Backend>(&self, device: &Device<B>) -> Fpn<B> {
        let layout = FpnLayout::of(&self.generator);
        let backbone = create_backbone(self.generator.backbone(), device).set_frozen(self.frozen);
        let [c0, c1, c2, c3, c4] = backbone.output_channels();

        log::debug!(
            "{} backbone levels: [{c0}, {c1}, {c2}, {c3}, {c4}] channels",
            self.generator.name()
        );

        let lateral = |in_channels: usize, out_channels: usize| {
            ConvUnitConfig::new(in_channels, out_channels)
                .with_kernel_size(1)
                .with_style(layout.lateral.clone())
                .init(device)
        };
        let top_down = || {
            ConvNormRelu::new(
                ConvUnitConfig::new(self.num_filters, self.num_filters)
                    .with_style(layout.body.clone())
                    .with_bias(true),
                &self.norm,
                device,
            )
        };

        Fpn {
            backbone,
            lateral0: lateral(c0, self.num_filters / 2),
            lateral1: lateral(c1, self.num_filters),
            lateral2: lateral(c2, self.num_filters),
            lateral3: lateral(c3, self.num_filters),
            lateral4: lateral(c4, self.num_filters),
            td1: top_down(),
            td2: top_down(),
            td3: top_down(),
            global_context: layout.global_context,
            frozen: self.frozen,
        }
    }
}

/// Feature pyramid over a backbone.
#[derive(Module, Debug)]
pub struct Fpn<B: Backend> {
    backbone: BackboneWrapper<B>,
    lateral0: ConvUnit<B>,
    lateral1: ConvUnit<B>,
    lateral2: ConvUnit<B>,
    lateral3: ConvUnit<B>,
    lateral4: ConvUnit<B>,
    td1: ConvNormRelu<B>,
    td2: ConvNormRelu<B>,
    td3: ConvNormRelu<B>,
    global_context: bool,
    frozen: bool,
}

impl<B: Backend> Fpn<B> {
    /// Runs the backbone alone and returns its five levels, finest first.
    pub fn forward_encoder(&self, x: Tensor<B, 4>) -> [Tensor<B, 4>; 5] {
        self.backbone.forward(x)
    }

    /// Returns `[map0, map1, map2, map3, map4]`.
    ///
    /// `map0` is the finest lateral with half the pyramid channels; the other
    /// maps carry the full pyramid width.
    pub fn forward(&self, x: Tensor<B, 4>) -> [Tensor<B, 4>; 5] {
        let [enc0, enc1, enc2, enc3, enc4] = self.forward_encoder(x);

        let lateral4 = self.lateral4.forward(enc4);
        let lateral3 = self.lateral3.forward(enc3);
        let lateral2 = self.lateral2.forward(enc2);
        let lateral1 = self.lateral1.forward(enc1);
        let lateral0 = self.lateral0.forward(enc0);

        let size3 = spatial_size(&lateral3);
        let size2 = spatial_size(&lateral2);
        let size1 = spatial_size(&lateral1);

        let map3 = self
            .td1
            .forward(lateral3 + upsample_to(lateral4.clone(), size3));
        let map2 = self.td2.forward(lateral2 + upsample_to(map3.clone(), size2));
        let map1 = self.td3.forward(lateral1 + upsample_to(map2.clone(), size1));

        let map4 = if self.global_context {
            let [h, w] = size3;
            upsample_to(lateral4, [(h / 2).max(1), (w / 2).max(1)])
        } else {
            lateral4
        };

        [lateral0, map1, map2, map3, map4]
    }

    /// Channels of the backbone levels feeding the laterals.
    pub fn backbone_channels(&self) -> [usize; 5] {
        self.backbone.output_channels()
    }

    pub const fn backbone(&self) -> &BackboneWrapper<B> {
        &self.backbone
    }

    pub const fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Resumes gradient tracking on the pretrained feature blocks.
    pub fn unfreeze(self) -> Self {
        self.set_frozen(false)
    }

    /// Stops gradient tracking on the pretrained feature blocks.
    pub fn freeze(self) -> Self {
        self.set_frozen(true)
    }

    fn set_frozen(mut self, frozen: bool) -> Self {
        self.backbone = self.backbone.set_frozen(frozen);
        self.frozen = frozen;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::{backend::NdArray, tensor::Distribution};

    type TestBackend = NdArray<f32>;

    fn run(generator: Generator, size: usize) -> [Tensor<TestBackend, 4>; 5] {
        let device = Default::default();
        let fpn = FpnConfig::new(generator)
            .with_num_filters(32)
            .init::<TestBackend>(&device);
        let input = Tensor::<TestBackend, 4>::random(
            [1, 3, size, size],
            Distribution::Normal(0.0, 1.0),
            &device,
        );
        fpn.forward(input)
    }

    #[test]
    fn test_mobilenet_pyramid() {
        let maps = run(Generator::FpnMobileNet, 64);

        assert_eq!(maps[0].dims(), [1, 16, 32, 32]);
        assert_eq!(maps[1].dims(), [1, 32, 16, 16]);
        assert_eq!(maps[2].dims(), [1, 32, 8, 8]);
        assert_eq!(maps[3].dims(), [1, 32, 4, 4]);
        assert_eq!(maps[4].dims(), [1, 32, 2, 2]);
    }

    #[test]
    fn test_ghostnet_v4_pyramid() {
        let maps = run(Generator::FpnGhostNetV4, 64);

        assert_eq!(maps[0].dims(), [1, 16, 32, 32]);
        assert_eq!(maps[1].dims(), [1, 32, 16, 16]);
        assert_eq!(maps[4].dims(), [1, 32, 2, 2]);
    }

    #[test]
    fn test_ghostnet_v2_global_context_grid() {
        let maps = run(Generator::FpnGhostNetV2, 128);

        assert_eq!(maps[0].dims(), [1, 16, 64, 64]);
        assert_eq!(maps[1].dims(), [1, 32, 16, 16]);
        assert_eq!(maps[2].dims(), [1, 32, 8, 8]);
        assert_eq!(maps[3].dims(), [1, 32, 4, 4]);
        assert_eq!(maps[4].dims(), [1, 32, 2, 2]);
    }

    #[test]
    fn test_freeze_toggle() {
        let device = Default::default();
        let fpn = FpnConfig::new(Generator::FpnMobileNet).init::<TestBackend>(&device);
        assert!(fpn.is_frozen());

        let fpn = fpn.unfreeze();
        assert!(!fpn.is_frozen());
        assert!(fpn.freeze().is_frozen());
    }
}
