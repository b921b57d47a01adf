//! Error types for loudness normalization

use thiserror::Error;

/// Result type for normalization operations
pub type Result<T> = std::result::Result<T, NormalizeError>;

/// Errors that can occur while creating or reconfiguring a normalizer
#[derive(Error, Debug)]
pub enum NormalizeError {
    /// Invalid sample rate
    #[error("Invalid sample rate: {0} Hz (must be between 8000 and 384000)")]
    InvalidSampleRate(u32),

    /// Invalid channel count
    #[error("Invalid channel count: {0} (must be 1-8)")]
    InvalidChannelCount(usize),

    /// Settings outside of their documented range
    #[error("Invalid normalization settings: {0}")]
    InvalidSettings(String),

    /// EBU R128 meter error
    #[error("Loudness meter failed: {0}")]
    Meter(String),

    /// The lookahead buffer could not be allocated
    #[error("Failed to allocate lookahead buffer of {frames} frames")]
    Allocation {
        /// Requested capacity in frames (per channel)
        frames: usize,
    },

    /// Host configuration could not be parsed
    #[error("Failed to parse settings: {0}")]
    Config(String),

    /// A previous panic left the engine state unusable
    #[error("Normalizer state is poisoned")]
    StatePoisoned,
}

impl From<ebur128::Error> for NormalizeError {
    fn from(err: ebur128::Error) -> Self {
        Self::Meter(format!("{:?}", err))
    }
}

impl From<serde_json::Error> for NormalizeError {
    fn from(err: serde_json::Error) -> Self {
        Self::Config(err.to_string())
    }
}
