//! Value types exchanged between simulated JSEP peers.
//!
//! Descriptions and candidates are fakes: the text payloads only look like
//! SDP. What matters to the simulator is the structured data riding along with
//! them, most importantly the [`PeerId`] of the peer that produced a
//! description, which is how the receiving peer finds its partner.
//!
//! [`SignalingMessage`] wraps these values in a CBOR envelope so test
//! fixtures can move them between peers as bytes, the way a real signaling
//! channel would.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod candidate;
pub mod description;
pub mod errors;
pub mod message;

use std::fmt;

pub use candidate::IceCandidate;
pub use description::{DescriptionKind, SdpAction, SessionDescription};
pub use errors::{ProtocolError, Result};
pub use message::SignalingMessage;
use serde::{Deserialize, Serialize};

/// Identifier of a simulated peer, unique within one registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerId(u64);

impl PeerId {
    /// Wrap a raw id.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw numeric value.
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
