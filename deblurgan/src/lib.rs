//! # DeblurGAN-Burn
//!
//! Feature pyramid generators for blind image deblurring, built on MobileNetV2
//! and GhostNet backbones.
//!
//! ```no_run
//! use burn::backend::NdArray;
//! use deblurgan_burn::{FpnGeneratorConfig, Generator, ModelConfig};
//!
//! let device = Default::default();
//! let config = ModelConfig::new().with_generator(Generator::FpnGhostNetV4);
//! let generator = FpnGeneratorConfig::new(config)
//!     .init::<NdArray>(&device)
//!     .expect("valid configuration");
//! ```

mod config;
mod error;
mod models;


pub use config::{Generator, HeadConfig, ModelConfig, PyramidConfig};
pub use error::{DeblurError, DeblurResult};
pub use models::{
    ConvStyle, ConvUnit, ConvUnitConfig, Fpn, FpnConfig, FpnGenerator, FpnGeneratorConfig,
    FpnGeneratorRecord, FpnHead, FpnHeadConfig, FpnLayout, INPUT_MULTIPLE,
};

pub use backbones::{BackboneType, GhostNetSplit};
pub use burn_extra_ops::NormKind;
