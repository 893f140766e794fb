//! Backbone implementations for the FPN deblurring generators
//!
//! This crate provides a unified interface over the feature extractors the
//! generators are built on: MobileNetV2 and GhostNet. Every backbone exposes
//! five pyramid levels, finest first.

use burn::prelude::*;

pub use ghostnet::{GhostModule, GhostModuleConfig, GhostNet, GhostNetConfig, GhostNetSplit};
pub use mobilenet_v2::MobileNetV2Backbone;

/// Unified backbone trait for the FPN generators
pub trait Backbone<B: Backend> {
    /// Forward pass through the backbone
    ///
    /// # Arguments
    /// * `input` - Input tensor of shape `[batch_size, 3, height, width]`
    ///
    /// # Returns
    /// Array of 5 feature maps, `enc0` (finest) to `enc4` (coarsest)
    fn forward(&self, input: Tensor<B, 4>) -> [Tensor<B, 4>; 5];

    /// Get output channels for each level
    fn output_channels(&self) -> [usize; 5];

    /// Stop or resume gradient tracking on the pretrained feature blocks
    fn set_frozen(self, frozen: bool) -> Self
    where
        Self: Sized;
}

impl<B: Backend> Backbone<B> for MobileNetV2Backbone<B> {
    fn forward(&self, input: Tensor<B, 4>) -> [Tensor<B, 4>; 5] {
        self.forward(input)
    }

    fn output_channels(&self) -> [usize; 5] {
        self.output_channels()
    }

    fn set_frozen(self, frozen: bool) -> Self {
        self.set_frozen(frozen)
    }
}

impl<B: Backend> Backbone<B> for GhostNet<B> {
    fn forward(&self, input: Tensor<B, 4>) -> [Tensor<B, 4>; 5] {
        self.forward(input)
    }

    fn output_channels(&self) -> [usize; 5] {
        self.output_channels()
    }

    fn set_frozen(self, frozen: bool) -> Self {
        self.set_frozen(frozen)
    }
}

/// Enumeration of supported backbone types
#[derive(Debug, Clone, PartialEq)]
pub enum BackboneType {
    /// MobileNetV2 truncated after the 160-channel stage
    MobileNetV2,
    /// GhostNet 1.0x with the given level grouping
    GhostNet(GhostNetSplit),
}

/// Enum to wrap different backbone implementations
#[derive(Module, Debug)]
pub enum BackboneWrapper<B: Backend> {
    /// MobileNetV2 backbone
    MobileNetV2(MobileNetV2Backbone<B>),
    /// GhostNet backbone
    GhostNet(GhostNet<B>),
}

impl<B: Backend> Backbone<B> for BackboneWrapper<B> {
    fn forward(&self, input: Tensor<B, 4>) -> [Tensor<B, 4>; 5] {
        match self {
            Self::MobileNetV2(backbone) => backbone.forward(input),
            Self::GhostNet(backbone) => backbone.forward(input),
        }
    }

    fn output_channels(&self) -> [usize; 5] {
        match self {
            Self::MobileNetV2(backbone) => backbone.output_channels(),
            Self::GhostNet(backbone) => backbone.output_channels(),
        }
    }

    fn set_frozen(self, frozen: bool) -> Self {
        match self {
            Self::MobileNetV2(backbone) => Self::MobileNetV2(backbone.set_frozen(frozen)),
            Self::GhostNet(backbone) => Self::GhostNet(backbone.set_frozen(frozen)),
        }
    }
}

/// Factory function to create backbones
pub fn create_backbone<B: Backend>(
    backbone_type: BackboneType,
    device: &Device<B>,
) -> BackboneWrapper<B> {
    match backbone_type {
        BackboneType::MobileNetV2 => BackboneWrapper::MobileNetV2(MobileNetV2Backbone::new(device)),
        BackboneType::GhostNet(split) => {
            BackboneWrapper::GhostNet(GhostNetConfig::new().with_split(split).init(device))
        }
    }
}
