//! Clamped activations used by MobileNet and GhostNet.

use burn::prelude::*;

/// `min(max(x, 0), 6)`.
pub fn relu6<B: Backend, const D: usize>(input: Tensor<B, D>) -> Tensor<B, D> {
    input.clamp(0.0, 6.0)
}

/// Piecewise-linear sigmoid approximation: `relu6(x + 3) / 6`.
///
/// This is the gate used by GhostNet's squeeze-and-excitation blocks.
pub fn hard_sigmoid<B: Backend, const D: usize>(input: Tensor<B, D>) -> Tensor<B, D> {
    relu6(input.add_scalar(3.0)).div_scalar(6.0)
}

/// Module wrapper around [`relu6`].
#[derive(Module, Debug, Clone)]
pub struct Relu6;

impl Relu6 {
    pub const fn new() -> Self {
        Self {}
    }

    pub fn forward<B: Backend, const D: usize>(&self, input: Tensor<B, D>) -> Tensor<B, D> {
        relu6(input)
    }
}

impl Default for Relu6 {
    fn default() -> Self {
        Self::new()
    }
}
