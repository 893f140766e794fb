//! Selectable 2-D normalization layer.

use burn::{
    nn::{BatchNorm, BatchNormConfig, InstanceNorm, InstanceNormConfig},
    prelude::*,
};

use crate::{HalfInstanceNorm, HalfInstanceNormConfig, Identity};

/// Which normalization to place after a convolution.
#[derive(Config, Debug, PartialEq)]
pub enum NormKind {
    /// Affine batch normalization with running statistics.
    Batch,
    /// Instance normalization without affine parameters.
    Instance,
    /// Affine instance normalization over half of the channels.
    HalfInstance,
    /// No normalization.
    None,
}

impl NormKind {
    /// Builds the normalization layer for `num_channels` channels.
    pub fn init<B: Backend>(&self, num_channels: usize, device: &Device<B>) -> Norm2d<B> {
        match self {
            Self::Batch => Norm2d::Batch(BatchNormConfig::new(num_channels).init(device)),
            Self::Instance => Norm2d::Instance(
                InstanceNormConfig::new(num_channels)
                    .with_affine(false)
                    .init(device),
            ),
            Self::HalfInstance => {
                Norm2d::HalfInstance(HalfInstanceNormConfig::new(num_channels).init(device))
            }
            Self::None => Norm2d::Identity(Identity::new()),
        }
    }
}

/// A normalization layer over `[N, C, H, W]` tensors.
#[derive(Module, Debug)]
pub enum Norm2d<B: Backend> {
    Batch(BatchNorm<B, 2>),
    Instance(InstanceNorm<B>),
    HalfInstance(HalfInstanceNorm<B>),
    Identity(Identity<B>),
}

impl<B: Backend> Norm2d<B> {
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        match self {
            Self::Batch(norm) => norm.forward(x),
            Self::Instance(norm) => norm.forward(x),
            Self::HalfInstance(norm) => norm.forward(x),
            Self::Identity(identity) => identity.forward(x),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::{backend::NdArray, tensor::Distribution};

    type TestBackend = NdArray<f32>;

    #[test]
    fn every_kind_preserves_shape() {
        let device = Default::default();
        let input =
            Tensor::<TestBackend, 4>::random([2, 8, 6, 6], Distribution::Normal(0.0, 1.0), &device);

        for kind in [
            NormKind::Batch,
            NormKind::Instance,
            NormKind::HalfInstance,
            NormKind::None,
        ] {
            let norm = kind.init::<TestBackend>(8, &device);
            assert_eq!(norm.forward(input.clone()).dims(), [2, 8, 6, 6]);
        }
    }

    #[test]
    fn none_is_identity() {
        let device = Default::default();
        let input =
            Tensor::<TestBackend, 4>::random([1, 3, 4, 4], Distribution::Normal(0.0, 1.0), &device);

        let output = NormKind::None.init::<TestBackend>(3, &device).forward(input.clone());

        output.to_data().assert_eq(&input.to_data(), true);
    }
}
