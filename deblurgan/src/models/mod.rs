//! # Model Architectures
//!
//! - `fpn`: the feature pyramid built on a backbone.
//! - `generator`: the deblurring generator combining the pyramid with
//!   segmentation heads and smoothing stages.
//! - `modules`: convolution slots, heads and resizing helpers shared by both.

pub mod fpn;
pub mod generator;
pub mod modules;

pub use fpn::{Fpn, FpnConfig, FpnLayout};
pub use generator::{FpnGenerator, FpnGeneratorConfig, FpnGeneratorRecord, INPUT_MULTIPLE};
pub use modules::{ConvStyle, ConvUnit, ConvUnitConfig, FpnHead, FpnHeadConfig};
