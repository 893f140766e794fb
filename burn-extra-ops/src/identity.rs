//! Identity module implementation

use burn::prelude::*;

/// Identity module that returns input unchanged.
///
/// Stands in for a normalization or activation slot that a layer
/// configuration leaves empty.
#[derive(Module, Debug)]
pub struct Identity<B: Backend> {
    _phantom: std::marker::PhantomData<B>,
}

impl<B: Backend> Identity<B> {
    /// Create new Identity module
    pub const fn new() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }

    /// Forward pass (identity function)
    pub const fn forward<const D: usize>(&self, input: Tensor<B, D>) -> Tensor<B, D> {
        input
    }
}

impl<B: Backend> Default for Identity<B> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::{backend::NdArray, tensor::Tensor};

    type TestBackend = NdArray<f32>;

    #[test]
    fn identity_keeps_values() {
        let device = Default::default();
        let identity = Identity::<TestBackend>::default();
        let input = Tensor::<TestBackend, 4>::random(
            [2, 3, 4, 4],
            burn::tensor::Distribution::Normal(0.0, 1.0),
            &device,
        );
        let output = identity.forward(input.clone());

        output.to_data().assert_eq(&input.to_data(), true);
    }
}
