//! Additional layers for the Burn deep learning framework
//!
//! This crate provides the normalization layers and activations used by the
//! GhostNet/MobileNet backbones and the FPN generators that are not available
//! in the core Burn framework.

mod activation;
mod divisible;
mod half_instance_norm;
mod identity;
mod norm;
mod require_grad;

// Convenient re-exports
pub use activation::{hard_sigmoid, relu6, Relu6};
pub use divisible::make_divisible;
pub use half_instance_norm::{HalfInstanceNorm, HalfInstanceNormConfig};
pub use identity::Identity;
pub use norm::{Norm2d, NormKind};
pub use require_grad::set_require_grad;
