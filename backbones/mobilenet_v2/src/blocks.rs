use burn::nn::{
    conv::{Conv2d, Conv2dConfig},
    BatchNorm, BatchNormConfig,
};
use burn::prelude::*;

use super::ConvBnRelu6;

/// MobileNetV2 inverted residual block.
///
/// Optional 1x1 expansion, 3x3 depthwise convolution, then a linear 1x1
/// projection. The input is added back when the block keeps both resolution
/// and width.
#[derive(Module, Debug)]
pub struct InvertedResidual<B: Backend> {
    pub expand: Option<ConvBnRelu6<B>>,
    pub depthwise: ConvBnRelu6<B>,
    pub project: Conv2d<B>,
    pub project_bn: BatchNorm<B, 2>,
    pub use_residual: bool,
}

impl<B: Backend> InvertedResidual<B> {
    pub fn new(
        in_channels: usize,
        out_channels: usize,
        stride: usize,
        expansion: usize,
        device: &Device<B>,
    ) -> Self {
        let hidden = in_channels * expansion;

        let expand =
            (expansion != 1).then(|| ConvBnRelu6::new(in_channels, hidden, 1, 1, 1, device));
        let depthwise = ConvBnRelu6::new(hidden, hidden, 3, stride, hidden, device);
        let project = Conv2dConfig::new([hidden, out_channels], [1, 1])
            .with_bias(false)
            .init(device);
        let project_bn = BatchNormConfig::new(out_channels).init(device);

        Self {
            expand,
            depthwise,
            project,
            project_bn,
            use_residual: stride == 1 && in_channels == out_channels,
        }
    }

    pub fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        let out = match &self.expand {
            Some(expand) => expand.forward(input.clone()),
            None => input.clone(),
        };
        let out = self.depthwise.forward(out);
        let out = self.project.forward(out);
        let out = self.project_bn.forward(out);

        if self.use_residual {
            out + input
        } else {
            out
        }
    }
}
