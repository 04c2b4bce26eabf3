//! Error types for the protocol crate.

use thiserror::Error;

/// Protocol error type covering all possible failure modes.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// A listing option could not be parsed.
    #[error("invalid value for {option}: {value:?}")]
    InvalidOption {
        /// Name of the option (query parameter).
        option: &'static str,
        /// The rejected value.
        value: String,
    },
}

/// Result type alias for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;
