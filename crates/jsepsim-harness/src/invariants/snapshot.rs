//! Observable state snapshots for invariant checking.
//!
//! Invariants run against snapshots rather than live peers so a check never
//! holds a peer borrow and always sees one consistent moment.

use jsepsim_core::{IceState, MediaStream, PeerId, SimulatedPeer};

use crate::events::PeerEvent;

/// Snapshot of a pair simulation.
#[derive(Debug, Clone, Default)]
pub struct PairSnapshot {
    /// Per-peer state.
    pub peers: Vec<PeerSnapshot>,
    /// Every event delivered so far, in delivery order.
    pub events: Vec<PeerEvent>,
    /// Tasks still waiting in the queue.
    pub pending_tasks: usize,
}

impl PairSnapshot {
    /// Snapshot of `peer`, if present.
    pub fn peer(&self, id: PeerId) -> Option<&PeerSnapshot> {
        self.peers.iter().find(|p| p.id == id)
    }

    /// Events delivered to `id`, in order.
    pub fn events_for(&self, id: PeerId) -> impl Iterator<Item = &PeerEvent> {
        self.events.iter().filter(move |e| e.peer() == id)
    }

    /// True when no deferred task is waiting, so every scheduled callback has
    /// been delivered.
    pub fn is_settled(&self) -> bool {
        self.pending_tasks == 0
    }
}

/// Snapshot of one peer's observable state.
#[derive(Debug, Clone)]
pub struct PeerSnapshot {
    /// Peer identifier.
    pub id: PeerId,
    /// ICE gathering state.
    pub ice_state: IceState,
    /// Established remote peer, if paired.
    pub remote_id: Option<PeerId>,
    /// Published stream slots.
    pub local_streams: Vec<Option<MediaStream>>,
    /// Slots last reconciled from the remote peer.
    pub remote_streams: Vec<Option<MediaStream>>,
    /// Whether `close` was called.
    pub closed: bool,
}

impl PeerSnapshot {
    /// Capture `peer`'s current state.
    pub fn capture(peer: &SimulatedPeer) -> Self {
        Self {
            id: peer.id(),
            ice_state: peer.ice_state(),
            remote_id: peer.remote_id(),
            local_streams: peer.local_streams(),
            remote_streams: peer.remote_streams(),
            closed: peer.is_closed(),
        }
    }
}
