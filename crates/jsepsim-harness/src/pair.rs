//! Two simulated peers wired through a signaling link.
//!
//! A [`PeerPair`] plays the consumer role for both peers: it sends offers,
//! answers delivered offers, applies answers, forwards trickled candidates and
//! records every callback. Deferred work only runs when the test calls
//! [`PeerPair::drain`] or [`PeerPair::settle`], so every interleaving is
//! chosen explicitly.

use jsepsim_core::{
    ManualQueue, PeerConfig, PeerHandlers, PeerRegistry, SdpAction, SessionDescription,
    SignalingMessage, SimulatedPeer,
};

use crate::{
    events::EventLog,
    invariants::{InvariantRegistry, PairSnapshot, PeerSnapshot, Violation},
    link::{LinkError, Side, SignalingLink},
};

/// Caller and callee sharing a registry, a manual queue and a link.
pub struct PeerPair {
    registry: PeerRegistry,
    queue: ManualQueue,
    link: SignalingLink,
    events: EventLog,
    caller: SimulatedPeer,
    callee: SimulatedPeer,
}

impl Default for PeerPair {
    fn default() -> Self {
        Self::new()
    }
}

impl PeerPair {
    /// Create a pair with default peer configuration.
    pub fn new() -> Self {
        Self::with_configs(PeerConfig::default(), PeerConfig::default())
    }

    /// Create a pair with explicit configuration for each side.
    pub fn with_configs(caller: PeerConfig, callee: PeerConfig) -> Self {
        let registry = PeerRegistry::new();
        let queue = ManualQueue::new();
        let link = SignalingLink::new();
        let events = EventLog::new();

        let caller = SimulatedPeer::new(
            &registry,
            caller,
            queue.clone(),
            Self::handlers(&events, &link, Side::Caller),
        );
        let callee = SimulatedPeer::new(
            &registry,
            callee,
            queue.clone(),
            Self::handlers(&events, &link, Side::Callee),
        );

        Self { registry, queue, link, events, caller, callee }
    }

    /// Recording handlers that also trickle candidates across the link.
    fn handlers(events: &EventLog, link: &SignalingLink, side: Side) -> PeerHandlers {
        let log = events.clone();
        let link = link.clone();
        events.handlers().on_ice_candidate(move |peer, candidate, more_to_follow| {
            log.record_candidate(peer.id(), peer.ice_state(), more_to_follow);
            if let Err(e) = link.send(side, &SignalingMessage::Candidate(candidate)) {
                tracing::error!(peer = %peer.id(), error = %e, "failed to forward candidate");
            }
        })
    }

    /// Peer that sends the first offer.
    pub fn caller(&self) -> &SimulatedPeer {
        &self.caller
    }

    /// Peer that answers.
    pub fn callee(&self) -> &SimulatedPeer {
        &self.callee
    }

    /// Peer on `side`.
    pub fn peer(&self, side: Side) -> &SimulatedPeer {
        match side {
            Side::Caller => &self.caller,
            Side::Callee => &self.callee,
        }
    }

    /// Registry both peers are registered in.
    pub fn registry(&self) -> &PeerRegistry {
        &self.registry
    }

    /// Queue both peers defer their callbacks to.
    pub fn queue(&self) -> &ManualQueue {
        &self.queue
    }

    /// Signaling link between the peers.
    pub fn link(&self) -> &SignalingLink {
        &self.link
    }

    /// Callbacks delivered so far.
    pub fn events(&self) -> &EventLog {
        &self.events
    }

    /// Create an offer on `side`, apply it locally and send it.
    ///
    /// # Errors
    ///
    /// - `LinkError::Protocol` if the offer cannot be encoded
    pub fn offer_from(&self, side: Side) -> Result<SessionDescription, LinkError> {
        let peer = self.peer(side);
        let offer = peer.create_offer();
        peer.set_local_description(SdpAction::Offer, offer.clone());
        self.link.send(side, &SignalingMessage::Offer(offer.clone()))?;
        Ok(offer)
    }

    /// Deliver the oldest message waiting for `to`. Returns whether one was
    /// waiting.
    ///
    /// # Errors
    ///
    /// - `LinkError::Protocol` if the frame does not decode, or the answer to
    ///   a delivered offer cannot be encoded
    /// - `LinkError::Peer` if the receiving peer rejects a description
    pub fn deliver_next(&self, to: Side) -> Result<bool, LinkError> {
        let Some(message) = self.link.recv(to)? else {
            return Ok(false);
        };
        let peer = self.peer(to);
        tracing::debug!(peer = %peer.id(), kind = message.name(), "delivering signaling");

        match message {
            SignalingMessage::Offer(offer) => {
                peer.set_remote_description(SdpAction::Offer, offer.clone())?;
                let answer = peer.create_answer(&offer);
                peer.set_local_description(SdpAction::Answer, answer.clone());
                self.link.send(to, &SignalingMessage::Answer(answer))?;
            },
            SignalingMessage::Answer(answer) => {
                peer.set_remote_description(SdpAction::Answer, answer)?;
            },
            SignalingMessage::Candidate(candidate) => peer.process_ice_message(&candidate),
            SignalingMessage::Close => peer.close(),
        }
        Ok(true)
    }

    /// Deliver signaling until the link is idle. Returns the number of
    /// messages delivered.
    ///
    /// Stops at the first error; messages behind it stay queued.
    ///
    /// # Errors
    ///
    /// See [`PeerPair::deliver_next`].
    pub fn deliver(&self) -> Result<usize, LinkError> {
        let mut delivered = 0;
        loop {
            let mut progressed = false;
            for side in [Side::Callee, Side::Caller] {
                while self.deliver_next(side)? {
                    delivered += 1;
                    progressed = true;
                }
            }
            if !progressed {
                return Ok(delivered);
            }
        }
    }

    /// Run every deferred task. Returns the number run.
    pub fn drain(&self) -> usize {
        self.queue.drain()
    }

    /// Alternate draining the queue and delivering signaling until both are
    /// idle. Returns the number of tasks and messages processed.
    ///
    /// # Errors
    ///
    /// See [`PeerPair::deliver_next`].
    pub fn settle(&self) -> Result<usize, LinkError> {
        let mut processed = 0;
        loop {
            let ran = self.queue.drain();
            let delivered = self.deliver()?;
            if ran == 0 && delivered == 0 {
                return Ok(processed);
            }
            processed += ran + delivered;
        }
    }

    /// Offer from the caller, answer from the callee, then start ICE on both
    /// sides. Callbacks stay queued until drained.
    ///
    /// # Errors
    ///
    /// See [`PeerPair::deliver_next`].
    pub fn connect(&self) -> Result<(), LinkError> {
        self.offer_from(Side::Caller)?;
        self.deliver()?;
        self.caller.start_ice();
        self.callee.start_ice();
        Ok(())
    }

    /// Run a further offer/answer exchange from the caller so both sides pick
    /// up each other's current streams.
    ///
    /// # Errors
    ///
    /// See [`PeerPair::deliver_next`].
    pub fn renegotiate(&self) -> Result<(), LinkError> {
        self.offer_from(Side::Caller)?;
        self.deliver()?;
        Ok(())
    }

    /// Close `side` and tell the other side to close as well.
    ///
    /// # Errors
    ///
    /// - `LinkError::Protocol` if the close message cannot be encoded
    pub fn close(&self, side: Side) -> Result<(), LinkError> {
        self.peer(side).close();
        self.link.send(side, &SignalingMessage::Close)
    }

    /// Capture both peers, the event log and the queue depth.
    pub fn snapshot(&self) -> PairSnapshot {
        PairSnapshot {
            peers: vec![PeerSnapshot::capture(&self.caller), PeerSnapshot::capture(&self.callee)],
            events: self.events.all(),
            pending_tasks: self.queue.len(),
        }
    }

    /// Check `invariants` against the current snapshot.
    ///
    /// # Errors
    ///
    /// Every violated invariant.
    pub fn check_invariants(&self, invariants: &InvariantRegistry) -> Result<(), Vec<Violation>> {
        invariants.check_all(&self.snapshot())
    }
}

#[cfg(test)]
mod tests {
    use jsepsim_core::IceState;

    use super::*;

    #[test]
    fn peers_get_consecutive_ids() {
        let pair = PeerPair::new();
        assert_eq!(pair.caller().id().get() + 1, pair.callee().id().get());
        assert_eq!(pair.registry().len(), 2);
    }

    #[test]
    fn connect_defers_every_callback() {
        let pair = PeerPair::new();
        pair.connect().unwrap();

        assert!(pair.events().all().is_empty());
        assert_eq!(pair.caller().ice_state(), IceState::Gathering);
        assert!(!pair.queue().is_empty());
    }

    #[test]
    fn settle_trickles_candidates_across() {
        let pair = PeerPair::new();
        pair.connect().unwrap();
        pair.settle().unwrap();

        assert_eq!(pair.caller().ice_state(), IceState::Completed);
        assert_eq!(pair.callee().ice_state(), IceState::Completed);
        assert!(pair.link().is_idle());
        // offer, answer, one candidate each way
        assert_eq!(pair.link().messages_sent(), 4);
    }
}
