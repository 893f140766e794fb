//! GhostNet implementation for the FPN generator backbone.
//!
//! Provides the [`GhostModule`] building block, the GhostNet bottleneck, and a
//! backbone that groups the GhostNet stages into five pyramid levels. Two
//! groupings are supported, see [`GhostNetSplit`].

use burn::nn::{
    conv::{Conv2d, Conv2dConfig},
    pool::{AdaptiveAvgPool2d, AdaptiveAvgPool2dConfig},
    Relu,
};
use burn::prelude::*;
use burn_extra_ops::{set_require_grad, NormKind};

mod bottleneck;
mod ghost_module;

pub use bottleneck::*;
pub use ghost_module::*;

const fn row(
    kernel_size: usize,
    mid_channels: usize,
    out_channels: usize,
    se_ratio: f64,
    stride: usize,
) -> BottleneckRow {
    BottleneckRow {
        kernel_size,
        mid_channels,
        out_channels,
        se_ratio,
        stride,
    }
}

/// GhostNet 1.0x stage table: kernel, expansion, output, SE ratio, stride.
const STAGES: [&[BottleneckRow]; 9] = [
    &[row(3, 16, 16, 0.0, 1)],
    &[row(3, 48, 24, 0.0, 2)],
    &[row(3, 72, 24, 0.0, 1)],
    &[row(5, 72, 40, 0.25, 2)],
    &[row(5, 120, 40, 0.25, 1)],
    &[row(3, 240, 80, 0.0, 2)],
    &[
        row(3, 200, 80, 0.0, 1),
        row(3, 184, 80, 0.0, 1),
        row(3, 184, 80, 0.0, 1),
        row(3, 480, 112, 0.25, 1),
        row(3, 672, 112, 0.25, 1),
    ],
    &[row(5, 672, 160, 0.25, 2)],
    &[
        row(5, 960, 160, 0.0, 1),
        row(5, 960, 160, 0.25, 1),
        row(5, 960, 160, 0.0, 1),
        row(5, 960, 160, 0.25, 1),
    ],
];

const STEM_CHANNELS: usize = 16;
const EXPANDED_CHANNELS: usize = 960;
const HEAD_CHANNELS: usize = 1280;

/// How the GhostNet stages are grouped into pyramid levels.
#[derive(Config, Debug, PartialEq)]
pub enum GhostNetSplit {
    /// Stem | stages 0-3 | 4-6 | 7-8 + 1x1 expansion | global pooled head.
    ///
    /// Levels at strides 2, 8, 16, 32 and a 1x1 global context vector.
    Hub,
    /// Stem | stages 0-1 | 2-3 | 4-5 | 6-7.
    ///
    /// Levels at strides 2, 4, 8, 16, 32.
    Timm,
}

impl GhostNetSplit {
    /// Normalization used by the pretrained checkpoints of each grouping.
    pub const fn default_norm(&self) -> NormKind {
        match self {
            Self::Hub => NormKind::Batch,
            Self::Timm => NormKind::HalfInstance,
        }
    }

    /// Channels of each level.
    pub const fn output_channels(&self) -> [usize; 5] {
        match self {
            Self::Hub => [STEM_CHANNELS, 40, 112, EXPANDED_CHANNELS, HEAD_CHANNELS],
            Self::Timm => [STEM_CHANNELS, 24, 40, 80, 160],
        }
    }

    /// Stage indices making up levels 1-4 (level 0 is the stem).
    const fn stage_groups(&self) -> [core::ops::Range<usize>; 4] {
        match self {
            Self::Hub => [0..4, 4..7, 7..9, 9..9],
            Self::Timm => [0..2, 2..4, 4..6, 6..8],
        }
    }

    /// Whether the stem belongs to the pretrained feature blocks that get
    /// frozen. The hub network keeps its stem outside of them.
    const fn stem_in_features(&self) -> bool {
        matches!(self, Self::Timm)
    }

    /// Non-bottleneck block closing each of levels 1-4.
    const fn tails(&self) -> [LevelTail; 4] {
        match self {
            Self::Hub => [
                LevelTail::None,
                LevelTail::None,
                LevelTail::Expand,
                LevelTail::Head,
            ],
            Self::Timm => [LevelTail::None; 4],
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum LevelTail {
    None,
    Expand,
    Head,
}

/// Configuration for [`GhostNet`].
#[derive(Config, Debug)]
pub struct GhostNetConfig {
    /// Level grouping.
    #[config(default = "GhostNetSplit::Hub")]
    pub split: GhostNetSplit,
    /// Normalization override. Defaults to the split's own normalization.
    #[config(default = "None")]
    pub norm: Option<NormKind>,
}

impl GhostNetConfig {
    pub fn init<B: Backend>(&self, device: &Device<B>) -> GhostNet<B> {
        let norm = self
            .norm
            .clone()
            .unwrap_or_else(|| self.split.default_norm());

        let stem = ConvNormAct::new(3, STEM_CHANNELS, 3, 2, 1, &norm, true, device);

        let mut in_channels = STEM_CHANNELS;
        let mut levels = Vec::with_capacity(4);

        for (stages, tail) in self.split.stage_groups().into_iter().zip(self.split.tails()) {
            let mut blocks = Vec::with_capacity(stages.len() + 1);

            for stage in &STAGES[stages] {
                let mut bottlenecks = Vec::with_capacity(stage.len());
                for row in stage.iter() {
                    bottlenecks.push(GhostBottleneck::new(in_channels, row, &norm, device));
                    in_channels = row.out_channels;
                }
                blocks.push(GhostBlock::Stage(bottlenecks));
            }

            match tail {
                LevelTail::Expand => {
                    blocks.push(GhostBlock::Expand(ConvNormAct::new(
                        in_channels,
                        EXPANDED_CHANNELS,
                        1,
                        1,
                        1,
                        &norm,
                        true,
                        device,
                    )));
                    in_channels = EXPANDED_CHANNELS;
                }
                LevelTail::Head => {
                    blocks.push(GhostBlock::Head(GlobalHead::new(device)));
                    in_channels = HEAD_CHANNELS;
                }
                LevelTail::None => {}
            }

            levels.push(GhostLevel { blocks });
        }

        GhostNet {
            stem,
            levels,
            output_channels: self.split.output_channels(),
            freeze_stem: self.split.stem_in_features(),
        }
    }
}

/// Global average pool + 1x1 conv + ReLU.
#[derive(Module, Debug)]
pub struct GlobalHead<B: Backend> {
    pool: AdaptiveAvgPool2d,
    conv_head: Conv2d<B>,
    act: Relu,
}

impl<B: Backend> GlobalHead<B> {
    pub fn new(device: &Device<B>) -> Self {
        Self {
            pool: AdaptiveAvgPool2dConfig::new([1, 1]).init(),
            conv_head: Conv2dConfig::new([EXPANDED_CHANNELS, HEAD_CHANNELS], [1, 1]).init(device),
            act: Relu::new(),
        }
    }

    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        self.act.forward(self.conv_head.forward(self.pool.forward(x)))
    }
}

/// One entry of the GhostNet block list.
#[derive(Module, Debug)]
pub enum GhostBlock<B: Backend> {
    /// A stage of bottlenecks.
    Stage(Vec<GhostBottleneck<B>>),
    /// The 160 -> 960 pointwise expansion after the last stage.
    Expand(ConvNormAct<B>),
    /// Global pooled classifier head without the classifier.
    Head(GlobalHead<B>),
}

impl<B: Backend> GhostBlock<B> {
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        match self {
            Self::Stage(bottlenecks) => bottlenecks
                .iter()
                .fold(x, |x, bottleneck| bottleneck.forward(x)),
            Self::Expand(conv) => conv.forward(x),
            Self::Head(head) => head.forward(x),
        }
    }

    /// The global head stays trainable; everything else follows `frozen`.
    pub fn set_frozen(self, frozen: bool) -> Self {
        match self {
            Self::Head(head) => Self::Head(head),
            block => set_require_grad(block, !frozen),
        }
    }
}

/// The blocks between two consecutive pyramid outputs.
#[derive(Module, Debug)]
pub struct GhostLevel<B: Backend> {
    pub blocks: Vec<GhostBlock<B>>,
}

impl<B: Backend> GhostLevel<B> {
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        self.blocks.iter().fold(x, |x, block| block.forward(x))
    }

    pub fn set_frozen(self, frozen: bool) -> Self {
        Self {
            blocks: self
                .blocks
                .into_iter()
                .map(|block| block.set_frozen(frozen))
                .collect(),
        }
    }
}

/// GhostNet backbone returning five feature levels, finest first.
#[derive(Module, Debug)]
pub struct GhostNet<B: Backend> {
    pub stem: ConvNormAct<B>,
    pub levels: Vec<GhostLevel<B>>,
    output_channels: [usize; 5],
    freeze_stem: bool,
}

impl<B: Backend> GhostNet<B> {
    pub fn forward(&self, input: Tensor<B, 4>) -> [Tensor<B, 4>; 5] {
        let mut x = self.stem.forward(input);

        core::array::from_fn(|level| {
            if level > 0 {
                x = self.levels[level - 1].forward(x.clone());
            }
            x.clone()
        })
    }

    /// Channels of each returned level.
    pub const fn output_channels(&self) -> [usize; 5] {
        self.output_channels
    }

    /// Stops (or resumes) gradient tracking on the pretrained feature blocks.
    ///
    /// With the hub split the stem and the global head stay trainable, and
    /// gradients still flow back through the frozen stages into the stem.
    pub fn set_frozen(mut self, frozen: bool) -> Self {
        if self.freeze_stem {
            self.stem = set_require_grad(self.stem, !frozen);
        }
        self.levels = self
            .levels
            .into_iter()
            .map(|level| level.set_frozen(frozen))
            .collect();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::{
        backend::{Autodiff, NdArray},
        module::{ModuleVisitor, ParamId},
        tensor::Distribution,
    };

    type TestBackend = NdArray<f32>;

    struct TrackedParams(usize);

    impl<B: Backend> ModuleVisitor<B> for TrackedParams {
        fn visit_float<const D: usize>(&mut self, _id: ParamId, tensor: &Tensor<B, D>) {
            if tensor.is_require_grad() {
                self.0 += 1;
            }
        }
    }

    fn tracked<B: Backend, M: Module<B>>(module: &M) -> usize {
        let mut visitor = TrackedParams(0);
        module.visit(&mut visitor);
        visitor.0
    }

    #[test]
    fn test_hub_split_shapes() {
        let device = Default::default();
        let model = GhostNetConfig::new().init::<TestBackend>(&device);

        let input =
            Tensor::<TestBackend, 4>::random([1, 3, 64, 64], Distribution::Normal(0.0, 1.0), &device);
        let output = model.forward(input);

        assert_eq!(output[0].dims(), [1, 16, 32, 32]);
        assert_eq!(output[1].dims(), [1, 40, 8, 8]);
        assert_eq!(output[2].dims(), [1, 112, 4, 4]);
        assert_eq!(output[3].dims(), [1, 960, 2, 2]);
        assert_eq!(output[4].dims(), [1, 1280, 1, 1]);
    }

    #[test]
    fn test_timm_split_shapes() {
        let device = Default::default();
        let model = GhostNetConfig::new()
            .with_split(GhostNetSplit::Timm)
            .init::<TestBackend>(&device);

        let input =
            Tensor::<TestBackend, 4>::random([2, 3, 64, 64], Distribution::Normal(0.0, 1.0), &device);
        let output = model.forward(input);

        assert_eq!(output[0].dims(), [2, 16, 32, 32]);
        assert_eq!(output[1].dims(), [2, 24, 16, 16]);
        assert_eq!(output[2].dims(), [2, 40, 8, 8]);
        assert_eq!(output[3].dims(), [2, 80, 4, 4]);
        assert_eq!(output[4].dims(), [2, 160, 2, 2]);
    }

    #[test]
    fn test_level_block_counts() {
        let device = Default::default();

        let hub = GhostNetConfig::new().init::<TestBackend>(&device);
        let counts: Vec<usize> = hub.levels.iter().map(|level| level.blocks.len()).collect();
        assert_eq!(counts, vec![4, 3, 3, 1]);

        let timm = GhostNetConfig::new()
            .with_split(GhostNetSplit::Timm)
            .init::<TestBackend>(&device);
        let counts: Vec<usize> = timm.levels.iter().map(|level| level.blocks.len()).collect();
        assert_eq!(counts, vec![2, 2, 2, 2]);
    }

    #[test]
    fn test_default_norms() {
        assert_eq!(GhostNetSplit::Hub.default_norm(), NormKind::Batch);
        assert_eq!(GhostNetSplit::Timm.default_norm(), NormKind::HalfInstance);
    }

    #[test]
    fn test_hub_freeze_keeps_stem_and_head_trainable() {
        let device = Default::default();
        let model = GhostNetConfig::new()
            .init::<Autodiff<TestBackend>>(&device)
            .set_frozen(true);

        assert!(tracked(&model.stem) > 0);
        for level in &model.levels[..3] {
            assert_eq!(tracked(level), 0);
        }
        assert!(matches!(model.levels[3].blocks[0], GhostBlock::Head(_)));
        assert_eq!(tracked(&model.levels[3]), 2);

        let model = model.set_frozen(false);
        assert!(tracked(&model.levels[0]) > 0);
    }

    #[test]
    fn test_timm_freeze_covers_stem() {
        let device = Default::default();
        let model = GhostNetConfig::new()
            .with_split(GhostNetSplit::Timm)
            .init::<Autodiff<TestBackend>>(&device)
            .set_frozen(true);

        assert_eq!(tracked(&model), 0);
        assert!(tracked(&model.set_frozen(false).stem) > 0);
    }
}
