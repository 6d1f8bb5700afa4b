//! In-memory signaling channel between the two sides of a [`PeerPair`].
//!
//! Messages are CBOR-encoded on send and decoded on receive, so fixtures cross
//! the same byte boundary a real signaling transport would.
//!
//! [`PeerPair`]: crate::PeerPair

use std::{cell::RefCell, collections::VecDeque, rc::Rc};

use jsepsim_core::{PeerError, SignalingMessage};
use jsepsim_proto::ProtocolError;
use thiserror::Error;

/// One end of a signaling link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    /// Peer that sends the first offer
    Caller,
    /// Peer that answers
    Callee,
}

impl Side {
    /// The other end.
    pub const fn opposite(self) -> Self {
        match self {
            Self::Caller => Self::Callee,
            Self::Callee => Self::Caller,
        }
    }
}

/// Errors raised while moving signaling through a link.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LinkError {
    /// Message could not be encoded or decoded
    #[error("signaling codec: {0}")]
    Protocol(#[from] ProtocolError),

    /// Receiving peer rejected a delivered description
    #[error(transparent)]
    Peer(#[from] PeerError),
}

#[derive(Debug, Default)]
struct LinkState {
    to_caller: VecDeque<Vec<u8>>,
    to_callee: VecDeque<Vec<u8>>,
    bytes_sent: usize,
    messages_sent: usize,
}

impl LinkState {
    fn inbox(&mut self, to: Side) -> &mut VecDeque<Vec<u8>> {
        match to {
            Side::Caller => &mut self.to_caller,
            Side::Callee => &mut self.to_callee,
        }
    }
}

/// Two FIFO byte queues, one per direction. Clones share the link.
#[derive(Debug, Clone, Default)]
pub struct SignalingLink {
    state: Rc<RefCell<LinkState>>,
}

impl SignalingLink {
    /// Create an empty link.
    pub fn new() -> Self {
        Self::default()
    }

    /// Encode `message` and queue it for the side opposite `from`.
    ///
    /// # Errors
    ///
    /// - `LinkError::Protocol` if the message cannot be encoded
    pub fn send(&self, from: Side, message: &SignalingMessage) -> Result<(), LinkError> {
        let mut frame = Vec::new();
        message.encode(&mut frame)?;
        tracing::trace!(?from, kind = message.name(), bytes = frame.len(), "link send");

        let mut state = self.state.borrow_mut();
        state.bytes_sent += frame.len();
        state.messages_sent += 1;
        state.inbox(from.opposite()).push_back(frame);
        Ok(())
    }

    /// Queue raw bytes for `to`, bypassing the encoder.
    pub fn inject_raw(&self, to: Side, frame: Vec<u8>) {
        self.state.borrow_mut().inbox(to).push_back(frame);
    }

    /// Take and decode the oldest message waiting for `to`.
    ///
    /// A frame that fails to decode is consumed.
    ///
    /// # Errors
    ///
    /// - `LinkError::Protocol` if the frame is not a valid message
    pub fn recv(&self, to: Side) -> Result<Option<SignalingMessage>, LinkError> {
        let frame = self.state.borrow_mut().inbox(to).pop_front();
        let Some(frame) = frame else {
            return Ok(None);
        };

        let message = SignalingMessage::decode(&frame).inspect_err(|e| {
            tracing::warn!(?to, error = %e, "dropping undecodable signaling frame");
        })?;
        tracing::trace!(?to, kind = message.name(), "link recv");
        Ok(Some(message))
    }

    /// Messages waiting for `to`.
    pub fn pending(&self, to: Side) -> usize {
        self.state.borrow_mut().inbox(to).len()
    }

    /// True when neither side has anything waiting.
    pub fn is_idle(&self) -> bool {
        let state = self.state.borrow();
        state.to_caller.is_empty() && state.to_callee.is_empty()
    }

    /// Total encoded bytes sent through the link.
    pub fn bytes_sent(&self) -> usize {
        self.state.borrow().bytes_sent
    }

    /// Total messages sent through the link.
    pub fn messages_sent(&self) -> usize {
        self.state.borrow().messages_sent
    }
}

#[cfg(test)]
mod tests {
    use jsepsim_core::{DescriptionKind, IceCandidate, PeerId, SessionDescription};

    use super::*;

    #[test]
    fn messages_cross_to_the_opposite_side_in_order() {
        let link = SignalingLink::new();
        let offer = SessionDescription::new(DescriptionKind::Offer, PeerId::new(1), 2);
        link.send(Side::Caller, &SignalingMessage::Offer(offer.clone())).unwrap();
        link.send(Side::Caller, &SignalingMessage::Candidate(IceCandidate::fake())).unwrap();

        assert_eq!(link.pending(Side::Callee), 2);
        assert_eq!(link.pending(Side::Caller), 0);
        assert_eq!(link.recv(Side::Callee).unwrap(), Some(SignalingMessage::Offer(offer)));
        assert_eq!(
            link.recv(Side::Callee).unwrap(),
            Some(SignalingMessage::Candidate(IceCandidate::fake()))
        );
        assert_eq!(link.recv(Side::Callee).unwrap(), None);
        assert!(link.is_idle());
        assert_eq!(link.messages_sent(), 2);
        assert!(link.bytes_sent() > 0);
    }

    #[test]
    fn garbage_frame_is_consumed_with_an_error() {
        let link = SignalingLink::new();
        link.inject_raw(Side::Caller, vec![0xff, 0x00, 0x13]);

        assert!(matches!(link.recv(Side::Caller), Err(LinkError::Protocol(_))));
        assert!(link.is_idle());
    }
}
