use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{AdaptiveAvgPool2d, AdaptiveAvgPool2dConfig},
        PaddingConfig2d, Relu,
    },
    prelude::*,
};
use burn_extra_ops::{hard_sigmoid, make_divisible, Norm2d, NormKind};

use crate::{GhostModule, GhostModuleConfig};

/// Squeeze-and-excitation gate with a hard-sigmoid activation.
#[derive(Module, Debug)]
pub struct SqueezeExcite<B: Backend> {
    pool: AdaptiveAvgPool2d,
    conv_reduce: Conv2d<B>,
    act: Relu,
    conv_expand: Conv2d<B>,
}

impl<B: Backend> SqueezeExcite<B> {
    pub fn new(channels: usize, se_ratio: f64, device: &Device<B>) -> Self {
        let reduced = make_divisible(channels as f64 * se_ratio, 4);

        Self {
            pool: AdaptiveAvgPool2dConfig::new([1, 1]).init(),
            conv_reduce: Conv2dConfig::new([channels, reduced], [1, 1]).init(device),
            act: Relu::new(),
            conv_expand: Conv2dConfig::new([reduced, channels], [1, 1]).init(device),
        }
    }

    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let gate = self.pool.forward(x.clone());
        let gate = self.act.forward(self.conv_reduce.forward(gate));
        let gate = hard_sigmoid(self.conv_expand.forward(gate));

        x * gate
    }
}

/// Convolution followed by normalization and an optional ReLU.
#[derive(Module, Debug)]
pub struct ConvNormAct<B: Backend> {
    conv: Conv2d<B>,
    norm: Norm2d<B>,
    act: Option<Relu>,
}

impl<B: Backend> ConvNormAct<B> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        in_channels: usize,
        out_channels: usize,
        kernel_size: usize,
        stride: usize,
        groups: usize,
        norm: &NormKind,
        relu: bool,
        device: &Device<B>,
    ) -> Self {
        let padding = (kernel_size - 1) / 2;
        let conv = Conv2dConfig::new([in_channels, out_channels], [kernel_size, kernel_size])
            .with_stride([stride, stride])
            .with_padding(PaddingConfig2d::Explicit(padding, padding))
            .with_groups(groups)
            .with_bias(false)
            .init(device);

        Self {
            conv,
            norm: norm.init(out_channels, device),
            act: relu.then(Relu::new),
        }
    }

    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self.norm.forward(self.conv.forward(x));
        match &self.act {
            Some(relu) => relu.forward(x),
            None => x,
        }
    }
}

/// Shortcut branch of a [`GhostBottleneck`] that changes width or resolution.
#[derive(Module, Debug)]
pub struct ProjectionShortcut<B: Backend> {
    depthwise: ConvNormAct<B>,
    pointwise: ConvNormAct<B>,
}

impl<B: Backend> ProjectionShortcut<B> {
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        self.pointwise.forward(self.depthwise.forward(x))
    }
}

/// One row of the GhostNet stage table.
#[derive(Debug, Clone, Copy)]
pub struct BottleneckRow {
    pub kernel_size: usize,
    pub mid_channels: usize,
    pub out_channels: usize,
    pub se_ratio: f64,
    pub stride: usize,
}

/// GhostNet bottleneck: expand with a Ghost module, optionally downsample
/// depthwise and re-weight channels, project back with a second Ghost module.
#[derive(Module, Debug)]
pub struct GhostBottleneck<B: Backend> {
    ghost1: GhostModule<B>,
    conv_dw: Option<ConvNormAct<B>>,
    se: Option<SqueezeExcite<B>>,
    ghost2: GhostModule<B>,
    shortcut: Option<ProjectionShortcut<B>>,
}

impl<B: Backend> GhostBottleneck<B> {
    pub fn new(
        in_channels: usize,
        row: &BottleneckRow,
        norm: &NormKind,
        device: &Device<B>,
    ) -> Self {
        let BottleneckRow {
            kernel_size,
            mid_channels,
            out_channels,
            se_ratio,
            stride,
        } = *row;

        let ghost1 = GhostModuleConfig::new(in_channels, mid_channels)
            .with_norm(norm.clone())
            .init(device);

        let conv_dw = (stride > 1).then(|| {
            ConvNormAct::new(
                mid_channels,
                mid_channels,
                kernel_size,
                stride,
                mid_channels,
                norm,
                false,
                device,
            )
        });

        let se = (se_ratio > 0.0).then(|| SqueezeExcite::new(mid_channels, se_ratio, device));

        let ghost2 = GhostModuleConfig::new(mid_channels, out_channels)
            .with_relu(false)
            .with_norm(norm.clone())
            .init(device);

        let shortcut = (in_channels != out_channels || stride != 1).then(|| ProjectionShortcut {
            depthwise: ConvNormAct::new(
                in_channels,
                in_channels,
                kernel_size,
                stride,
                in_channels,
                norm,
                false,
                device,
            ),
            pointwise: ConvNormAct::new(in_channels, out_channels, 1, 1, 1, norm, false, device),
        });

        Self {
            ghost1,
            conv_dw,
            se,
            ghost2,
            shortcut,
        }
    }

    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let residual = match &self.shortcut {
            Some(shortcut) => shortcut.forward(x.clone()),
            None => x.clone(),
        };

        let out = self.ghost1.forward(x);
        let out = match &self.conv_dw {
            Some(conv_dw) => conv_dw.forward(out),
            None => out,
        };
        let out = match &self.se {
            Some(se) => se.forward(out),
            None => out,
        };

        self.ghost2.forward(out) + residual
    }
}
