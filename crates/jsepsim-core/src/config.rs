//! Peer configuration.

use jsepsim_proto::IceCandidate;

/// Per-peer configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerConfig {
    /// ICE server URLs. Accepted for call-shape parity with a real peer
    /// connection and otherwise ignored.
    pub ice_servers: Vec<String>,
    /// Candidate reported when ICE gathering completes
    pub candidate: IceCandidate,
}

impl Default for PeerConfig {
    fn default() -> Self {
        Self { ice_servers: Vec::new(), candidate: IceCandidate::fake() }
    }
}
