//! Error types for encoding and decoding signaling messages.

use thiserror::Error;

/// Result alias for this crate.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors raised while moving signaling messages through a byte channel.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// CBOR serialization failed
    #[error("CBOR encode failed: {0}")]
    CborEncode(String),

    /// CBOR deserialization failed
    #[error("CBOR decode failed: {0}")]
    CborDecode(String),

    /// Encoded message is larger than the channel accepts
    #[error("message too large: {size} bytes (max {max})")]
    MessageTooLarge {
        /// Size of the rejected message
        size: usize,
        /// Maximum accepted size
        max: usize,
    },
}
