//! Error types for roomsync wire handling.

use thiserror::Error;

/// Errors that can occur while encoding, decoding or validating wire data.
#[derive(Debug, Error)]
pub enum WireError {
    /// JSON serialization failed
    #[error("serialization failed: {0}")]
    Encode(#[source] serde_json::Error),

    /// JSON deserialization failed (malformed or unexpected response body)
    #[error("deserialization failed: {0}")]
    Decode(#[source] serde_json::Error),

    /// An identifier did not have the expected shape
    #[error("invalid {kind} identifier: {value:?}")]
    InvalidIdentifier {
        /// Which identifier was being parsed ("user", "room").
        kind: &'static str,
        /// The rejected input.
        value: String,
    },
}
