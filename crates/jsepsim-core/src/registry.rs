//! Registry of live peers, used to resolve the peer a description came from.
//!
//! Ids are handed out from a per-registry counter starting at 1, so separate
//! tests with separate registries never collide. The registry only holds weak
//! references: dropping the last handle to a peer removes it from lookups.

use std::{
    cell::RefCell,
    collections::HashMap,
    fmt,
    rc::{Rc, Weak},
};

use jsepsim_proto::PeerId;

use crate::peer::PeerInner;

/// Shared registry of peers. Clones refer to the same registry.
#[derive(Clone, Default)]
pub struct PeerRegistry {
    inner: Rc<RefCell<RegistryInner>>,
}

#[derive(Default)]
struct RegistryInner {
    /// Last id handed out (0 = none yet)
    last_id: u64,
    /// Peer id → peer
    peers: HashMap<PeerId, Weak<PeerInner>>,
}

impl PeerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve the next peer id.
    pub(crate) fn allocate_id(&self) -> PeerId {
        let mut inner = self.inner.borrow_mut();
        inner.last_id += 1;
        PeerId::new(inner.last_id)
    }

    /// Make a peer resolvable under `id`.
    pub(crate) fn insert(&self, id: PeerId, peer: Weak<PeerInner>) {
        self.inner.borrow_mut().peers.insert(id, peer);
    }

    /// Resolve a live peer. Dead entries are pruned on the way.
    pub(crate) fn lookup(&self, id: PeerId) -> Option<Rc<PeerInner>> {
        let mut inner = self.inner.borrow_mut();
        let peer = inner.peers.get(&id)?.upgrade();
        if peer.is_none() {
            inner.peers.remove(&id);
        }
        peer
    }

    /// Whether a live peer is registered under `id`.
    pub fn contains(&self, id: PeerId) -> bool {
        self.inner.borrow().peers.get(&id).is_some_and(|peer| peer.strong_count() > 0)
    }

    /// Number of live peers.
    pub fn len(&self) -> usize {
        self.inner.borrow().peers.values().filter(|peer| peer.strong_count() > 0).count()
    }

    /// True when no live peer is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ids of live peers, ascending.
    pub fn ids(&self) -> Vec<PeerId> {
        let inner = self.inner.borrow();
        let mut ids: Vec<PeerId> = inner
            .peers
            .iter()
            .filter(|(_, peer)| peer.strong_count() > 0)
            .map(|(id, _)| *id)
            .collect();
        ids.sort_unstable();
        ids
    }
}

impl fmt::Debug for PeerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PeerRegistry").field("peers", &self.ids()).finish()
    }
}
