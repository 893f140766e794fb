//! Enumeration types for the generator configuration.

use backbones::{BackboneType, GhostNetSplit};
use burn::prelude::*;

use crate::error::{DeblurError, DeblurResult};

/// The FPN generator variant.
#[derive(Config, Debug, PartialEq, Eq)]
pub enum Generator {
    /// MobileNetV2 backbone with plain convolutions throughout.
    FpnMobileNet,
    /// GhostNet (hub split, 1280-channel global head) with instance
    /// normalized Ghost modules in every FPN slot.
    FpnGhostNetV2,
    /// GhostNet (timm split, half instance norm) with bare Ghost modules in
    /// the top-down, head and output slots.
    FpnGhostNetV4,
}

impl Generator {
    /// All supported generators.
    pub const ALL: [Self; 3] = [Self::FpnMobileNet, Self::FpnGhostNetV2, Self::FpnGhostNetV4];

    /// The backbone this generator extracts features with.
    pub const fn backbone(&self) -> BackboneType {
        match self {
            Self::FpnMobileNet => BackboneType::MobileNetV2,
            Self::FpnGhostNetV2 => BackboneType::GhostNet(GhostNetSplit::Hub),
            Self::FpnGhostNetV4 => BackboneType::GhostNet(GhostNetSplit::Timm),
        }
    }

    /// Name used in DeblurGAN training configurations.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::FpnMobileNet => "fpn_mobilenet",
            Self::FpnGhostNetV2 => "fpn_ghostnet_v2",
            Self::FpnGhostNetV4 => "fpn_ghostnet_v4",
        }
    }

    /// Parses a generator from its configuration name.
    ///
    /// # Errors
    ///
    /// Returns `Err(DeblurError::UnsupportedGenerator)` for unknown names.
    pub fn from_name(name: &str) -> DeblurResult<Self> {
        Self::ALL
            .into_iter()
            .find(|generator| generator.name() == name)
            .ok_or_else(|| DeblurError::UnsupportedGenerator {
                name: name.to_string(),
            })
    }
}
