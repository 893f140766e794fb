//! # FPN Deblurring Generator
//!
//! Four segmentation heads run on the pyramid maps, are brought to the
//! resolution of `map1` and concatenated. Two smoothing stages fuse them with
//! the finest lateral, and a final convolution predicts a residual that is
//! squashed with `tanh`, added to the blurred input and clamped to `[-1, 1]`.

use burn::{module::Ignored, prelude::*};

use super::{
    fpn::{Fpn, FpnConfig, FpnLayout},
    modules::{
        spatial_size, upsample_to, ConvNormRelu, ConvUnit, ConvUnitConfig, FpnHead,
        FpnHeadConfig,
    },
};
use crate::{
    config::{Generator, ModelConfig},
    error::{DeblurError, DeblurResult},
};

/// Input height and width must be multiples of the backbone's total stride.
pub const INPUT_MULTIPLE: usize = 32;

/// Configuration for the [`FpnGenerator`] model.
#[derive(Config, Debug)]
pub struct FpnGeneratorConfig {
    /// The detailed model configuration.
    config: ModelConfig,
}

impl FpnGeneratorConfig {
    /// Initializes an `FpnGenerator` with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns `Err(DeblurError::InvalidConfiguration)` if the configuration
    /// fails [`ModelConfig::validate`].
    pub fn init<B: Backend>(&self, device: &Device<B>) -> DeblurResult<FpnGenerator<B>> {
        self.config.validate()?;

        let generator = self.config.generator.clone();
        let layout = FpnLayout::of(&generator);
        let norm = &self.config.norm_layer;
        let num_filters_fpn = self.config.pyramid.num_filters_fpn;
        let num_filters = self.config.head.num_filters;

        let fpn = FpnConfig::new(generator.clone())
            .with_norm(norm.clone())
            .with_num_filters(num_filters_fpn)
            .with_frozen(self.config.pyramid.freeze_backbone)
            .init(device);

        let head = || {
            FpnHeadConfig::new(num_filters_fpn, num_filters, num_filters)
                .with_style(layout.body.clone())
                .init(device)
        };
        let output_conv = |in_channels: usize, out_channels: usize| {
            ConvUnitConfig::new(in_channels, out_channels)
                .with_style(layout.body.clone())
                .with_bias(layout.output_bias)
        };

        let model = FpnGenerator {
            fpn,
            head1: head(),
            head2: head(),
            head3: head(),
            head4: head(),
            smooth: ConvNormRelu::new(output_conv(4 * num_filters, num_filters), norm, device),
            smooth2: ConvNormRelu::new(output_conv(num_filters, num_filters / 2), norm, device),
            final_conv: output_conv(num_filters / 2, self.config.head.output_ch).init(device),
            generator: Ignored(generator),
        };

        log::info!(
            "Built {} generator: norm {:?}, {} pyramid / {} head filters, {} parameters, backbone {}",
            model.generator_name(),
            norm,
            num_filters_fpn,
            num_filters,
            model.num_params(),
            if model.is_backbone_frozen() { "frozen" } else { "trainable" },
        );

        Ok(model)
    }
}

/// Feature pyramid deblurring generator.
#[derive(Module, Debug)]
pub struct FpnGenerator<B: Backend> {
    fpn: Fpn<B>,
    head1: FpnHead<B>,
    head2: FpnHead<B>,
    head3: FpnHead<B>,
    head4: FpnHead<B>,
    smooth: ConvNormRelu<B>,
    smooth2: ConvNormRelu<B>,
    final_conv: ConvUnit<B>,
    generator: Ignored<Generator>,
}

impl<B: Backend> FpnGenerator<B> {
    /// Deblurs a batch of images.
    ///
    /// # Arguments
    ///
    /// * `x` - Images of shape `[batch_size, 3, height, width]` scaled to
    ///   `[-1, 1]`, with `height` and `width` multiples of 32.
    ///
    /// # Returns
    ///
    /// The restored images, same shape as `x`, values in `[-1, 1]`.
    ///
    /// # Errors
    ///
    /// Returns `Err(DeblurError::InvalidTensorShape)` for any other input shape.
    pub fn forward(&self, x: Tensor<B, 4>) -> DeblurResult<Tensor<B, 4>> {
        check_input_shape(&x.dims())?;

        let [map0, map1, map2, map3, map4] = self.fpn.forward(x.clone());

        let size1 = spatial_size(&map1);
        let map4 = upsample_to(self.head4.forward(map4), size1);
        let map3 = upsample_to(self.head3.forward(map3), size1);
        let map2 = upsample_to(self.head2.forward(map2), size1);
        let map1 = self.head1.forward(map1);

        let smoothed = self.smooth.forward(Tensor::cat(vec![map4, map3, map2, map1], 1));
        let size0 = spatial_size(&map0);
        let smoothed = self.smooth2.forward(upsample_to(smoothed, size0) + map0);
        let smoothed = upsample_to(smoothed, spatial_size(&x));

        let residual = self.final_conv.forward(smoothed).tanh();

        Ok((residual + x).clamp(-1.0, 1.0))
    }

    /// Runs only the backbone, returning its five feature levels.
    pub fn forward_encoder(&self, x: Tensor<B, 4>) -> DeblurResult<[Tensor<B, 4>; 5]> {
        check_input_shape(&x.dims())?;
        Ok(self.fpn.forward_encoder(x))
    }

    /// Resumes gradient tracking on the pretrained backbone blocks.
    pub fn unfreeze(mut self) -> Self {
        self.fpn = self.fpn.unfreeze();
        log::debug!("{} backbone unfrozen", self.generator_name());
        self
    }

    /// Stops gradient tracking on the pretrained backbone blocks.
    pub fn freeze(mut self) -> Self {
        self.fpn = self.fpn.freeze();
        log::debug!("{} backbone frozen", self.generator_name());
        self
    }

    pub const fn is_backbone_frozen(&self) -> bool {
        self.fpn.is_frozen()
    }

    pub fn generator(&self) -> &Generator {
        &self.generator.0
    }

    pub fn generator_name(&self) -> &'static str {
        self.generator.name()
    }

    /// Channels of the five backbone levels.
    pub fn backbone_channels(&self) -> [usize; 5] {
        self.fpn.backbone_channels()
    }
}

fn check_input_shape(dims: &[usize; 4]) -> DeblurResult<()> {
    let [batch, channels, height, width] = *dims;
    let valid_side = |side: usize| side > 0 && side % INPUT_MULTIPLE == 0;

    if batch == 0 || channels != 3 || !valid_side(height) || !valid_side(width) {
        return Err(DeblurError::InvalidTensorShape {
            expected: format!("[N, 3, H, W] with H and W positive multiples of {INPUT_MULTIPLE}"),
            actual: format!("{dims:?}"),
        });
    }

    Ok(())
}
