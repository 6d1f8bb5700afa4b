//! Fake session descriptions.
//!
//! A description carries a text payload shaped like the opening of an SDP
//! body, plus the structured fields the simulator actually relies on: which
//! peer produced it and how many streams that peer was publishing.
//!
//! # Invariants
//!
//! - The only mutation after construction is [`SessionDescription::add_candidate`],
//!   which appends to the text payload and never touches `origin`.
//! - `from_sdp` recovers `origin` from text produced by `new`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{IceCandidate, PeerId};

/// Marker preceding the originating peer id in the text payload.
const ORIGIN_MARKER: &str = " from ";

/// Marker preceding the stream count in the text payload.
const STREAMS_MARKER: &str = " with ";

/// Which half of the offer/answer exchange a description belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DescriptionKind {
    /// Produced by `create_offer`
    Offer,
    /// Produced by `create_answer`
    Answer,
}

impl fmt::Display for DescriptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Offer => f.write_str("offer"),
            Self::Answer => f.write_str("answer"),
        }
    }
}

/// Action passed alongside a description when setting it on a peer.
///
/// Peers accept it for call-shape parity and never validate it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SdpAction {
    /// Description is an offer
    Offer,
    /// Description is a final answer
    Answer,
    /// Description is a provisional answer
    PrAnswer,
}

/// A fake session description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescription {
    kind: DescriptionKind,
    origin: Option<PeerId>,
    stream_count: usize,
    sdp: String,
}

impl SessionDescription {
    /// Describe a session proposed by `origin`, which publishes `stream_count`
    /// streams.
    pub fn new(kind: DescriptionKind, origin: PeerId, stream_count: usize) -> Self {
        let sdp = format!(
            "Fake session description of {kind}{ORIGIN_MARKER}{origin}{STREAMS_MARKER}{stream_count} streams"
        );
        Self { kind, origin: Some(origin), stream_count, sdp }
    }

    /// Wrap a raw text payload.
    ///
    /// The origin is recovered from the first `" from <digits>"` marker in the
    /// text. Payloads without one yield a description with no origin, which a
    /// peer rejects as a signaling mismatch.
    pub fn from_sdp(kind: DescriptionKind, sdp: impl Into<String>) -> Self {
        let sdp = sdp.into();
        let origin = parse_number_after(&sdp, ORIGIN_MARKER).map(PeerId::new);
        let stream_count = parse_number_after(&sdp, STREAMS_MARKER).unwrap_or(0) as usize;
        Self { kind, origin, stream_count, sdp }
    }

    /// Offer or answer.
    pub fn kind(&self) -> DescriptionKind {
        self.kind
    }

    /// Peer that produced this description. `None` for foreign payloads.
    pub fn origin(&self) -> Option<PeerId> {
        self.origin
    }

    /// Number of streams the origin published when it built the description.
    pub fn stream_count(&self) -> usize {
        self.stream_count
    }

    /// Text payload.
    pub fn to_sdp(&self) -> &str {
        &self.sdp
    }

    /// Append a candidate's SDP text to the payload.
    pub fn add_candidate(&mut self, candidate: &IceCandidate) {
        self.sdp.push_str(candidate.to_sdp());
    }
}

/// First run of ASCII digits directly following any occurrence of `marker`.
fn parse_number_after(text: &str, marker: &str) -> Option<u64> {
    text.match_indices(marker).find_map(|(at, found)| {
        let rest = &text[at + found.len()..];
        let end = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
        rest[..end].parse().ok()
    })
}
