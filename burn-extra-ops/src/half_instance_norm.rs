//! Half instance normalization.
//!
//! Normalizes the first half of the channels per instance and leaves the
//! remaining channels untouched, so that both normalized and raw context
//! reach the next layer.

use burn::{
    nn::{InstanceNorm, InstanceNormConfig},
    prelude::*,
};

/// Configuration for [`HalfInstanceNorm`].
#[derive(Config, Debug)]
pub struct HalfInstanceNormConfig {
    /// Total number of input channels.
    pub num_channels: usize,
    /// Value added to the variance for numerical stability.
    #[config(default = "1e-5")]
    pub epsilon: f64,
}

impl HalfInstanceNormConfig {
    /// Number of leading channels that get normalized.
    pub const fn normalized_channels(&self) -> usize {
        self.num_channels - self.num_channels / 2
    }

    pub fn init<B: Backend>(&self, device: &Device<B>) -> HalfInstanceNorm<B> {
        let normalized = self.normalized_channels();
        let norm = InstanceNormConfig::new(normalized)
            .with_epsilon(self.epsilon)
            .init(device);

        HalfInstanceNorm { norm, normalized }
    }
}

/// Affine instance norm over the leading `C - C/2` channels.
#[derive(Module, Debug)]
pub struct HalfInstanceNorm<B: Backend> {
    norm: InstanceNorm<B>,
    normalized: usize,
}

impl<B: Backend> HalfInstanceNorm<B> {
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let [n, c, h, w] = x.dims();
        if c <= self.normalized {
            return self.norm.forward(x);
        }

        let head = x.clone().slice([0..n, 0..self.normalized, 0..h, 0..w]);
        let tail = x.slice([0..n, self.normalized..c, 0..h, 0..w]);

        Tensor::cat(vec![self.norm.forward(head), tail], 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::{backend::NdArray, tensor::Distribution};

    type TestBackend = NdArray<f32>;

    #[test]
    fn odd_channel_split() {
        let config = HalfInstanceNormConfig::new(5);
        assert_eq!(config.normalized_channels(), 3);
    }

    #[test]
    fn passthrough_channels_untouched() {
        let device = Default::default();
        let norm = HalfInstanceNormConfig::new(6).init::<TestBackend>(&device);
        let input =
            Tensor::<TestBackend, 4>::random([2, 6, 5, 5], Distribution::Normal(2.0, 3.0), &device);

        let output = norm.forward(input.clone());
        assert_eq!(output.dims(), [2, 6, 5, 5]);

        let raw = input.slice([0..2, 3..6, 0..5, 0..5]);
        let kept = output.slice([0..2, 3..6, 0..5, 0..5]);
        kept.to_data().assert_eq(&raw.to_data(), true);
    }

    #[test]
    fn normalized_channels_are_centered() {
        let device = Default::default();
        let norm = HalfInstanceNormConfig::new(4).init::<TestBackend>(&device);
        let input =
            Tensor::<TestBackend, 4>::random([1, 4, 8, 8], Distribution::Normal(5.0, 2.0), &device);

        let output = norm.forward(input);
        let head = output.slice([0..1, 0..2, 0..8, 0..8]);
        let mean: f32 = head.mean().into_scalar();

        assert!(mean.abs() < 1e-4, "mean was {mean}");
    }

    #[test]
    fn single_channel_is_fully_normalized() {
        let device = Default::default();
        let norm = HalfInstanceNormConfig::new(1).init::<TestBackend>(&device);
        let input =
            Tensor::<TestBackend, 4>::random([1, 1, 4, 4], Distribution::Normal(3.0, 1.0), &device);

        let output = norm.forward(input);
        let mean: f32 = output.mean().into_scalar();

        assert!(mean.abs() < 1e-4, "mean was {mean}");
    }
}
