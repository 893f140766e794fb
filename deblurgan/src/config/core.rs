//! Core configuration structures for the FPN generators.
//!
//! Field defaults reproduce the DeblurGAN generator settings: a 128-channel
//! pyramid, 64-channel heads, instance normalization and a frozen backbone.

use burn::prelude::*;
use burn_extra_ops::NormKind;

use super::enums::Generator;
use crate::error::{DeblurError, DeblurResult};

/// Main configuration for a deblurring generator.
#[derive(Config, Debug)]
pub struct ModelConfig {
    /// Which generator variant to build.
    #[config(default = "Generator::FpnMobileNet")]
    pub generator: Generator,
    /// Normalization after the top-down and smoothing convolutions.
    #[config(default = "NormKind::Instance")]
    pub norm_layer: NormKind,
    /// Feature pyramid configuration.
    #[config(default = "PyramidConfig::new()")]
    pub pyramid: PyramidConfig,
    /// Segmentation head configuration.
    #[config(default = "HeadConfig::new()")]
    pub head: HeadConfig,
}

/// Feature pyramid configuration.
#[derive(Config, Debug)]
pub struct PyramidConfig {
    /// Channels of every pyramid map. The finest lateral uses half of it.
    #[config(default = "128")]
    pub num_filters_fpn: usize,
    /// Stop gradients at the backbone outputs until the generator is unfrozen.
    #[config(default = "true")]
    pub freeze_backbone: bool,
}

/// Segmentation head and output configuration.
#[derive(Config, Debug)]
pub struct HeadConfig {
    /// Channels of each segmentation head.
    #[config(default = "64")]
    pub num_filters: usize,
    /// Channels of the produced image.
    #[config(default = "3")]
    pub output_ch: usize,
}

impl ModelConfig {
    /// Validate the configuration and return appropriate errors for invalid settings.
    ///
    /// # Errors
    ///
    /// Returns `Err(DeblurError::InvalidConfiguration)` if any validation rule is violated.
    pub fn validate(&self) -> DeblurResult<()> {
        let num_filters_fpn = self.pyramid.num_filters_fpn;
        let num_filters = self.head.num_filters;

        // 1. The finest lateral carries half of the pyramid width
        if num_filters_fpn < 2 || num_filters_fpn % 2 != 0 {
            return Err(DeblurError::InvalidConfiguration {
                reason: format!("num_filters_fpn must be even and >= 2, got {num_filters_fpn}"),
            });
        }

        // 2. The second smoothing stage halves the head width
        if num_filters < 2 {
            return Err(DeblurError::InvalidConfiguration {
                reason: format!("num_filters must be >= 2, got {num_filters}"),
            });
        }

        // 3. The finest lateral is added to the output of the first smoothing stage
        if num_filters_fpn / 2 != num_filters {
            return Err(DeblurError::InvalidConfiguration {
                reason: format!(
                    "num_filters_fpn / 2 must equal num_filters, got {num_filters_fpn} and {num_filters}"
                ),
            });
        }

        // 4. The correction is added to the RGB input
        if self.head.output_ch != 3 {
            return Err(DeblurError::InvalidConfiguration {
                reason: format!("output_ch must be 3, got {}", self.head.output_ch),
            });
        }

        Ok(())
    }
}
