//! Ghost module: a cheap substitute for a full convolution.
//!
//! A primary convolution produces `ceil(out / ratio)` intrinsic maps and a
//! depthwise "cheap operation" derives the remaining ghost maps from them.

use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        PaddingConfig2d, Relu,
    },
    prelude::*,
};
use burn_extra_ops::{Norm2d, NormKind};

/// Configuration for [`GhostModule`].
#[derive(Config, Debug)]
pub struct GhostModuleConfig {
    /// Number of input channels.
    pub in_channels: usize,
    /// Number of output channels.
    pub out_channels: usize,
    /// Kernel size of the primary convolution.
    #[config(default = "1")]
    pub kernel_size: usize,
    /// Ratio of output channels to intrinsic channels.
    #[config(default = "2")]
    pub ratio: usize,
    /// Kernel size of the depthwise cheap operation.
    #[config(default = "3")]
    pub dw_size: usize,
    /// Stride of the primary convolution.
    #[config(default = "1")]
    pub stride: usize,
    /// Apply ReLU after each branch.
    #[config(default = "true")]
    pub relu: bool,
    /// Whether the convolutions carry a bias.
    #[config(default = "false")]
    pub bias: bool,
    /// Normalization after each branch's convolution.
    #[config(default = "NormKind::None")]
    pub norm: NormKind,
}

impl GhostModuleConfig {
    /// Channels produced by the primary convolution.
    pub const fn init_channels(&self) -> usize {
        self.out_channels.div_ceil(self.ratio)
    }

    /// Channels produced by the cheap operation.
    pub const fn new_channels(&self) -> usize {
        self.init_channels() * (self.ratio - 1)
    }

    pub fn init<B: Backend>(&self, device: &Device<B>) -> GhostModule<B> {
        let init_channels = self.init_channels();
        let new_channels = self.new_channels();
        let padding = self.kernel_size / 2;
        let dw_padding = self.dw_size / 2;

        let primary_conv = Conv2dConfig::new(
            [self.in_channels, init_channels],
            [self.kernel_size, self.kernel_size],
        )
        .with_stride([self.stride, self.stride])
        .with_padding(PaddingConfig2d::Explicit(padding, padding))
        .with_bias(self.bias)
        .init(device);

        let cheap_conv = Conv2dConfig::new([init_channels, new_channels], [self.dw_size, self.dw_size])
            .with_padding(PaddingConfig2d::Explicit(dw_padding, dw_padding))
            .with_groups(init_channels)
            .with_bias(self.bias)
            .init(device);

        GhostModule {
            primary_conv,
            primary_norm: self.norm.init(init_channels, device),
            cheap_conv,
            cheap_norm: self.norm.init(new_channels, device),
            act: self.relu.then(Relu::new),
            out_channels: self.out_channels,
        }
    }
}

#[derive(Module, Debug)]
pub struct GhostModule<B: Backend> {
    primary_conv: Conv2d<B>,
    primary_norm: Norm2d<B>,
    cheap_conv: Conv2d<B>,
    cheap_norm: Norm2d<B>,
    act: Option<Relu>,
    out_channels: usize,
}

impl<B: Backend> GhostModule<B> {
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x1 = self.activate(self.primary_norm.forward(self.primary_conv.forward(x)));
        let x2 = self.activate(self.cheap_norm.forward(self.cheap_conv.forward(x1.clone())));

        let out = Tensor::cat(vec![x1, x2], 1);
        let [n, c, h, w] = out.dims();
        if c == self.out_channels {
            out
        } else {
            out.slice([0..n, 0..self.out_channels, 0..h, 0..w])
        }
    }

    fn activate(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        match &self.act {
            Some(relu) => relu.forward(x),
            None => x,
        }
    }
}
