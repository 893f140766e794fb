use burn::{nn::Relu, prelude::*};

use super::{ConvStyle, ConvUnit, ConvUnitConfig};

/// Segmentation head applied to one pyramid map.
#[derive(Config, Debug)]
pub struct FpnHeadConfig {
    num_in: usize,
    num_mid: usize,
    num_out: usize,
    #[config(default = "ConvStyle::Plain")]
    style: ConvStyle,
}

impl FpnHeadConfig {
    pub fn init<B: Backend>(&self, device: &Device<B>) -> FpnHead<B> {
        let block0 = ConvUnitConfig::new(self.num_in, self.num_mid)
            .with_style(self.style.clone())
            .init(device);
        let block1 = ConvUnitConfig::new(self.num_mid, self.num_out)
            .with_style(self.style.clone())
            .init(device);

        FpnHead {
            block0,
            block1,
            relu: Relu::new(),
        }
    }
}

/// Two 3x3 bias-free convolutions, each followed by ReLU.
#[derive(Module, Debug)]
pub struct FpnHead<B: Backend> {
    block0: ConvUnit<B>,
    block1: ConvUnit<B>,
    relu: Relu,
}

impl<B: Backend> FpnHead<B> {
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self.relu.forward(self.block0.forward(x));
        self.relu.forward(self.block1.forward(x))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::{backend::NdArray, tensor::Distribution};

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_head_shape() {
        let device = Default::default();
        let head = FpnHeadConfig::new(32, 16, 16)
            .with_style(ConvStyle::Ghost)
            .init::<TestBackend>(&device);

        let input =
            Tensor::<TestBackend, 4>::random([1, 32, 4, 6], Distribution::Normal(0.0, 1.0), &device);
        let output = head.forward(input);

        assert_eq!(output.dims(), [1, 16, 4, 6]);
        assert!(output.min().into_scalar() >= 0.0);
    }
}
