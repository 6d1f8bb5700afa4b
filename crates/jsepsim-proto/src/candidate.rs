//! Fake ICE candidates.

use serde::{Deserialize, Serialize};

/// Candidate line every simulated peer advertises.
pub const FAKE_CANDIDATE_SDP: &str = "a=candidate:Fake candidate";

/// Media line label attached to the fake candidate.
pub const FAKE_CANDIDATE_LABEL: &str = "first";

/// An ICE candidate: a line of SDP text plus the label of the media line it
/// belongs to. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceCandidate {
    sdp: String,
    label: String,
}

impl IceCandidate {
    /// Build a candidate from its text and media line label.
    pub fn new(sdp: impl Into<String>, label: impl Into<String>) -> Self {
        Self { sdp: sdp.into(), label: label.into() }
    }

    /// The single candidate a simulated peer produces.
    pub fn fake() -> Self {
        Self::new(FAKE_CANDIDATE_SDP, FAKE_CANDIDATE_LABEL)
    }

    /// SDP form of the candidate.
    pub fn to_sdp(&self) -> &str {
        &self.sdp
    }

    /// Media line label.
    pub fn label(&self) -> &str {
        &self.label
    }
}

impl Default for IceCandidate {
    fn default() -> Self {
        Self::fake()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fake_candidate_uses_first_media_line() {
        let candidate = IceCandidate::default();
        assert_eq!(candidate.to_sdp(), "a=candidate:Fake candidate");
        assert_eq!(candidate.label(), "first");
    }
}
