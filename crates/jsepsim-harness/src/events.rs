//! Recorded peer callbacks.

use std::{cell::RefCell, rc::Rc};

use jsepsim_core::{IceState, PeerHandlers, PeerId, StreamEvent};

/// A callback delivered to a peer's consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerEvent {
    /// `on_open` fired
    Opened {
        /// Receiving peer
        peer: PeerId,
    },
    /// `on_add_stream` fired
    StreamAdded {
        /// Receiving peer
        peer: PeerId,
        /// Slot and stream
        event: StreamEvent,
    },
    /// `on_remove_stream` fired
    StreamRemoved {
        /// Receiving peer
        peer: PeerId,
        /// Slot and stream
        event: StreamEvent,
    },
    /// `on_ice_candidate` fired
    Candidate {
        /// Receiving peer
        peer: PeerId,
        /// Peer's ICE state when the callback ran
        ice_state: IceState,
        /// Whether more candidates were announced
        more_to_follow: bool,
    },
}

impl PeerEvent {
    /// Peer the event was delivered to.
    pub fn peer(&self) -> PeerId {
        match self {
            Self::Opened { peer }
            | Self::StreamAdded { peer, .. }
            | Self::StreamRemoved { peer, .. }
            | Self::Candidate { peer, .. } => *peer,
        }
    }
}

/// Shared, ordered record of delivered events. Clones share the record.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Rc<RefCell<Vec<PeerEvent>>>,
}

impl EventLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event.
    pub fn record(&self, event: PeerEvent) {
        self.events.borrow_mut().push(event);
    }

    /// Copy of every event so far.
    pub fn all(&self) -> Vec<PeerEvent> {
        self.events.borrow().clone()
    }

    /// Remove and return every event so far.
    pub fn take(&self) -> Vec<PeerEvent> {
        std::mem::take(&mut *self.events.borrow_mut())
    }

    /// Events delivered to `peer`, in order.
    pub fn for_peer(&self, peer: PeerId) -> Vec<PeerEvent> {
        self.events.borrow().iter().filter(|e| e.peer() == peer).cloned().collect()
    }

    /// Number of `Opened` events for `peer`.
    pub fn opened(&self, peer: PeerId) -> usize {
        self.events
            .borrow()
            .iter()
            .filter(|e| matches!(e, PeerEvent::Opened { peer: p } if *p == peer))
            .count()
    }

    /// Streams added to `peer`, in delivery order.
    pub fn added(&self, peer: PeerId) -> Vec<StreamEvent> {
        self.events
            .borrow()
            .iter()
            .filter_map(|e| match e {
                PeerEvent::StreamAdded { peer: p, event } if *p == peer => Some(event.clone()),
                _ => None,
            })
            .collect()
    }

    /// Streams removed from `peer`, in delivery order.
    pub fn removed(&self, peer: PeerId) -> Vec<StreamEvent> {
        self.events
            .borrow()
            .iter()
            .filter_map(|e| match e {
                PeerEvent::StreamRemoved { peer: p, event } if *p == peer => Some(event.clone()),
                _ => None,
            })
            .collect()
    }

    /// Handlers that record open and stream callbacks into this log.
    ///
    /// ICE candidates are left to the caller, which usually needs to forward
    /// them as well; see [`EventLog::record_candidate`].
    pub fn handlers(&self) -> PeerHandlers {
        let opened = self.clone();
        let added = self.clone();
        let removed = self.clone();
        PeerHandlers::new()
            .on_open(move |peer| opened.record(PeerEvent::Opened { peer: peer.id() }))
            .on_add_stream(move |peer, event| {
                added.record(PeerEvent::StreamAdded { peer: peer.id(), event });
            })
            .on_remove_stream(move |peer, event| {
                removed.record(PeerEvent::StreamRemoved { peer: peer.id(), event });
            })
    }

    /// Record a candidate callback as seen by `peer`.
    pub fn record_candidate(&self, peer: PeerId, ice_state: IceState, more_to_follow: bool) {
        self.record(PeerEvent::Candidate { peer, ice_state, more_to_follow });
    }
}
