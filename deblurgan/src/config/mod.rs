//! Configuration module for the FPN generators.
//!
//! - `core`: the main configuration structures
//! - `enums`: the generator variant enumeration

pub mod core;
pub mod enums;

pub use self::core::{HeadConfig, ModelConfig, PyramidConfig};
pub use self::enums::Generator;
