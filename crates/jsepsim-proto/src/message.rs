//! CBOR signaling envelope.
//!
//! Simulated peers never talk to each other directly in a realistic test: a
//! signaling channel carries their descriptions and candidates. This module
//! gives that channel a concrete byte format so fixtures exercise the same
//! encode/decode boundary a real consumer has.

use bytes::BufMut;
use serde::{Deserialize, Serialize};

use crate::{
    IceCandidate, SessionDescription,
    errors::{ProtocolError, Result},
};

/// Largest encoded message accepted by [`SignalingMessage::decode`].
pub const MAX_MESSAGE_SIZE: usize = 64 * 1024;

/// One message on the signaling channel between two peers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalingMessage {
    /// Offer from the initiating peer
    Offer(SessionDescription),
    /// Answer from the responding peer
    Answer(SessionDescription),
    /// Trickled ICE candidate
    Candidate(IceCandidate),
    /// Sender is closing the session
    Close,
}

impl SignalingMessage {
    /// Short name for logging.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Offer(_) => "offer",
            Self::Answer(_) => "answer",
            Self::Candidate(_) => "candidate",
            Self::Close => "close",
        }
    }

    /// Encode as CBOR into `dst`.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::CborEncode` if serialization fails
    pub fn encode(&self, dst: &mut impl BufMut) -> Result<()> {
        let mut writer = dst.writer();
        ciborium::ser::into_writer(self, &mut writer)
            .map_err(|e| ProtocolError::CborEncode(e.to_string()))
    }

    /// Decode a message from CBOR bytes.
    ///
    /// The size check runs before any parsing.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::MessageTooLarge` if `bytes` exceeds
    ///   [`MAX_MESSAGE_SIZE`]
    /// - `ProtocolError::CborDecode` if the bytes are not a valid message
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() > MAX_MESSAGE_SIZE {
            return Err(ProtocolError::MessageTooLarge {
                size: bytes.len(),
                max: MAX_MESSAGE_SIZE,
            });
        }

        ciborium::de::from_reader(bytes).map_err(|e| ProtocolError::CborDecode(e.to_string()))
    }
}
