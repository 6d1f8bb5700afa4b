//! Error types for the simulated peer.
//!
//! The simulator has a single failure mode: a remote description that cannot
//! be tied to a known peer. Every other operation is total.

use jsepsim_proto::PeerId;
use thiserror::Error;

/// Why a remote description could not be correlated with a peer.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MismatchReason {
    /// The description carries no originating peer id
    #[error("description does not name its originating peer")]
    MissingOrigin,

    /// The named peer is not (or no longer) in the registry
    #[error("peer {0} is not registered")]
    UnknownPeer(PeerId),
}

/// Errors returned by [`SimulatedPeer`](crate::SimulatedPeer) operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PeerError {
    /// Remote description could not be correlated with a known peer.
    ///
    /// Fatal for the step that set it; the peer is left unchanged.
    #[error("signaling mismatch on peer {peer}: {reason}")]
    SignalingMismatch {
        /// Peer the description was set on
        peer: PeerId,
        /// What was wrong with the description
        reason: MismatchReason,
    },
}

impl PeerError {
    /// Peer that reported the error.
    pub fn peer(&self) -> PeerId {
        match self {
            Self::SignalingMismatch { peer, .. } => *peer,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mismatch_message_names_both_peers() {
        let err = PeerError::SignalingMismatch {
            peer: PeerId::new(2),
            reason: MismatchReason::UnknownPeer(PeerId::new(9)),
        };
        assert_eq!(err.to_string(), "signaling mismatch on peer 2: peer 9 is not registered");
        assert_eq!(err.peer(), PeerId::new(2));
    }
}
