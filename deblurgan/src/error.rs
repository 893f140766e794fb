use thiserror::Error;

/// The error type for `DeblurGAN-Burn` operations.
///
/// Covers configuration problems detected before a generator is built and
/// input tensors the generator cannot process.
#[derive(Error, Debug)]
pub enum DeblurError {
    /// Error for when an invalid model configuration is provided.
    /// This can happen if configuration parameters are logically inconsistent.
    #[error("Invalid model configuration: {reason}")]
    InvalidConfiguration {
        /// The reason why the configuration is invalid.
        reason: String,
    },

    /// Error for when an input tensor has an invalid shape.
    #[error("Invalid input tensor shape: expected {expected}, got {actual}")]
    InvalidTensorShape {
        /// The expected tensor shape.
        expected: String,
        /// The actual tensor shape.
        actual: String,
    },

    /// Error for when a generator name does not match any known variant.
    #[error("Unsupported generator: {name}")]
    UnsupportedGenerator {
        /// The name that was requested.
        name: String,
    },
}

/// A specialized `Result` type for `DeblurGAN-Burn` operations.
pub type DeblurResult<T> = Result<T, DeblurError>;
