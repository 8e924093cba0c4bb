//! Error types for capability lookups

use thiserror::Error;

/// Result type alias using the capability Error
pub type Result<T> = std::result::Result<T, Error>;

/// Capability registry error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The model identifier is not in the registry. Fatal for every
    /// capability-dependent operation; never retried.
    #[error("unknown device model: {0}")]
    UnknownModel(String),

    #[error("invalid capability record for {model}: {reason}")]
    InvalidRecord { model: String, reason: String },
}
