//! Toggle gradient tracking on every parameter of a module.

use burn::{
    module::{Module, ModuleMapper, ParamId},
    prelude::*,
};

struct RequireGrad(bool);

impl<B: Backend> ModuleMapper<B> for RequireGrad {
    fn map_float<const D: usize>(&mut self, _id: ParamId, tensor: Tensor<B, D>) -> Tensor<B, D> {
        tensor.set_require_grad(self.0)
    }
}

/// Sets `require_grad` on every float parameter of `module`.
///
/// `Module::no_grad` only goes one way; this also turns tracking back on.
/// Activations flowing through the module keep their graph either way, so
/// modules before it still receive gradients.
pub fn set_require_grad<B: Backend, M: Module<B>>(module: M, require_grad: bool) -> M {
    module.map(&mut RequireGrad(require_grad))
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::{
        backend::{Autodiff, NdArray},
        nn::{Linear, LinearConfig},
    };

    type TestBackend = Autodiff<NdArray<f32>>;

    fn weight_tracked(linear: &Linear<TestBackend>) -> bool {
        linear.weight.val().is_require_grad()
    }

    #[test]
    fn test_toggle_require_grad() {
        let device = Default::default();
        let linear = LinearConfig::new(4, 2).init::<TestBackend>(&device);
        assert!(weight_tracked(&linear));

        let linear = set_require_grad(linear, false);
        assert!(!weight_tracked(&linear));

        let linear = set_require_grad(linear, true);
        assert!(weight_tracked(&linear));
    }
}
