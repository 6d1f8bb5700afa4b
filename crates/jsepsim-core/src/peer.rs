//! Simulated peer connection.
//!
//! Fakes the part of a JSEP peer connection a signaling layer talks to:
//! offer/answer creation, local and remote descriptions, ICE gathering and
//! remote stream announcements. Everything observable by the consumer goes
//! through the peer's [`Scheduler`], so no handler ever runs inside the call
//! that caused it.
//!
//! # ICE
//!
//! ```text
//! ┌─────┐ start_ice ┌───────────┐ (deferred) ┌───────────┐
//! │ New │──────────>│ Gathering │───────────>│ Completed │
//! └─────┘           └───────────┘  candidate └───────────┘
//! ```
//!
//! # Stream slots
//!
//! Streams live in positional slots, one per media line. When a remote
//! description is set, each slot of `remote_streams` is compared by identity
//! with the same slot of the remote peer's `local_streams`. A differing slot
//! signals removal of the old stream (if any) and then addition of the new
//! one (if any). Slots are never compacted, so emptied slots stay as holes.

use std::{
    cell::RefCell,
    fmt,
    rc::{Rc, Weak},
};

use jsepsim_proto::{DescriptionKind, IceCandidate, PeerId, SdpAction, SessionDescription};

use crate::{
    config::PeerConfig,
    error::{MismatchReason, PeerError},
    registry::PeerRegistry,
    scheduler::Scheduler,
    stream::MediaStream,
};

/// ICE gathering progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IceState {
    /// Gathering not started
    #[default]
    New,
    /// `start_ice` called, candidate pending
    Gathering,
    /// Candidate produced
    Completed,
}

/// A remote stream appearing in or leaving a slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamEvent {
    /// Slot (media line index) the stream occupies
    pub slot: usize,
    /// The stream
    pub stream: MediaStream,
}

type OpenHandler = Rc<dyn Fn(&SimulatedPeer)>;
type StreamHandler = Rc<dyn Fn(&SimulatedPeer, StreamEvent)>;
type IceHandler = Rc<dyn Fn(&SimulatedPeer, IceCandidate, bool)>;

/// Callbacks a consumer registers when constructing a peer.
///
/// Handlers are fixed at construction, so a task scheduled early can never
/// find its handler missing because the consumer had not assigned it yet.
/// Every handler receives the peer it belongs to.
#[derive(Clone, Default)]
pub struct PeerHandlers {
    on_open: Option<OpenHandler>,
    on_add_stream: Option<StreamHandler>,
    on_remove_stream: Option<StreamHandler>,
    on_ice_candidate: Option<IceHandler>,
}

impl PeerHandlers {
    /// No handlers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Called once, after the first accepted remote description.
    #[must_use]
    pub fn on_open(mut self, handler: impl Fn(&SimulatedPeer) + 'static) -> Self {
        self.on_open = Some(Rc::new(handler));
        self
    }

    /// Called when a remote stream fills a slot.
    #[must_use]
    pub fn on_add_stream(mut self, handler: impl Fn(&SimulatedPeer, StreamEvent) + 'static) -> Self {
        self.on_add_stream = Some(Rc::new(handler));
        self
    }

    /// Called when a remote stream leaves a slot.
    #[must_use]
    pub fn on_remove_stream(
        mut self,
        handler: impl Fn(&SimulatedPeer, StreamEvent) + 'static,
    ) -> Self {
        self.on_remove_stream = Some(Rc::new(handler));
        self
    }

    /// Called with each gathered candidate and whether more will follow.
    #[must_use]
    pub fn on_ice_candidate(
        mut self,
        handler: impl Fn(&SimulatedPeer, IceCandidate, bool) + 'static,
    ) -> Self {
        self.on_ice_candidate = Some(Rc::new(handler));
        self
    }
}

impl fmt::Debug for PeerHandlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PeerHandlers")
            .field("on_open", &self.on_open.is_some())
            .field("on_add_stream", &self.on_add_stream.is_some())
            .field("on_remove_stream", &self.on_remove_stream.is_some())
            .field("on_ice_candidate", &self.on_ice_candidate.is_some())
            .finish()
    }
}

/// Shared peer data. Registry entries and scheduled tasks hold it weakly.
pub(crate) struct PeerInner {
    id: PeerId,
    config: PeerConfig,
    registry: PeerRegistry,
    scheduler: Rc<dyn Scheduler>,
    handlers: PeerHandlers,
    state: RefCell<PeerState>,
}

#[derive(Default)]
struct PeerState {
    ice_state: IceState,
    local_streams: Vec<Option<MediaStream>>,
    remote_streams: Vec<Option<MediaStream>>,
    local_description: Option<SessionDescription>,
    remote_description: Option<SessionDescription>,
    /// Established by the first accepted remote description, never replaced
    remote: Option<(PeerId, Weak<PeerInner>)>,
    closed: bool,
}

/// Slot change found by reconciliation, delivered later.
#[derive(Debug, PartialEq, Eq)]
enum Signal {
    Removed(StreamEvent),
    Added(StreamEvent),
}

/// A simulated JSEP peer.
///
/// Cheap to clone; clones are handles to the same peer. Not `Send`: the
/// simulation is single-threaded.
#[derive(Clone)]
pub struct SimulatedPeer {
    inner: Rc<PeerInner>,
}

impl SimulatedPeer {
    /// Create a peer, assign it the next id from `registry` and register it.
    pub fn new(
        registry: &PeerRegistry,
        config: PeerConfig,
        scheduler: impl Scheduler + 'static,
        handlers: PeerHandlers,
    ) -> Self {
        let id = registry.allocate_id();
        let inner = Rc::new(PeerInner {
            id,
            config,
            registry: registry.clone(),
            scheduler: Rc::new(scheduler),
            handlers,
            state: RefCell::new(PeerState::default()),
        });
        registry.insert(id, Rc::downgrade(&inner));

        tracing::debug!(peer = %id, "constructed simulated peer");
        Self { inner }
    }

    fn from_weak(weak: &Weak<PeerInner>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }

    /// Id assigned by the registry.
    pub fn id(&self) -> PeerId {
        self.inner.id
    }

    /// Configuration the peer was built with.
    pub fn config(&self) -> &PeerConfig {
        &self.inner.config
    }

    /// Current ICE gathering state.
    pub fn ice_state(&self) -> IceState {
        self.inner.state.borrow().ice_state
    }

    /// Local stream slots, holes included.
    pub fn local_streams(&self) -> Vec<Option<MediaStream>> {
        self.inner.state.borrow().local_streams.clone()
    }

    /// Remote stream slots, holes included.
    pub fn remote_streams(&self) -> Vec<Option<MediaStream>> {
        self.inner.state.borrow().remote_streams.clone()
    }

    /// Number of populated local slots.
    pub fn local_stream_count(&self) -> usize {
        self.inner.state.borrow().local_streams.iter().flatten().count()
    }

    /// Number of populated remote slots.
    pub fn remote_stream_count(&self) -> usize {
        self.inner.state.borrow().remote_streams.iter().flatten().count()
    }

    /// Last description passed to `set_local_description`.
    pub fn local_description(&self) -> Option<SessionDescription> {
        self.inner.state.borrow().local_description.clone()
    }

    /// Last description accepted by `set_remote_description`.
    pub fn remote_description(&self) -> Option<SessionDescription> {
        self.inner.state.borrow().remote_description.clone()
    }

    /// Id of the paired peer, once a remote description has been accepted.
    pub fn remote_id(&self) -> Option<PeerId> {
        self.inner.state.borrow().remote.as_ref().map(|(id, _)| *id)
    }

    /// Whether `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.inner.state.borrow().closed
    }

    /// Build an offer naming this peer and its current stream count.
    ///
    /// Has no side effects.
    pub fn create_offer(&self) -> SessionDescription {
        tracing::trace!(peer = %self.id(), "create_offer");
        self.describe(DescriptionKind::Offer)
    }

    /// Build an answer. The offer's content is ignored: nothing is negotiated.
    pub fn create_answer(&self, _offer: &SessionDescription) -> SessionDescription {
        tracing::trace!(peer = %self.id(), "create_answer");
        self.describe(DescriptionKind::Answer)
    }

    fn describe(&self, kind: DescriptionKind) -> SessionDescription {
        SessionDescription::new(kind, self.id(), self.local_stream_count())
    }

    /// Record the local description. `action` is not validated.
    pub fn set_local_description(&self, action: SdpAction, desc: SessionDescription) {
        tracing::debug!(peer = %self.id(), ?action, "set_local_description");
        self.inner.state.borrow_mut().local_description = Some(desc);
    }

    /// Accept a description from the paired peer.
    ///
    /// The first accepted description establishes the pairing and schedules
    /// the open callback. Every accepted description reconciles remote stream
    /// slots against the paired peer's local slots, scheduling one removal
    /// and/or one addition per differing slot.
    ///
    /// # Errors
    ///
    /// - `PeerError::SignalingMismatch` if the description names no peer, or
    ///   a peer that is not in the registry. The peer is left untouched and
    ///   nothing is scheduled.
    pub fn set_remote_description(
        &self,
        action: SdpAction,
        desc: SessionDescription,
    ) -> Result<(), PeerError> {
        let id = self.id();
        tracing::debug!(peer = %id, ?action, "set_remote_description");

        let remote = self.resolve_remote(&desc)?;
        let published = remote.state.borrow().local_streams.clone();

        let (established, signals) = {
            let mut state = self.inner.state.borrow_mut();
            state.remote_description = Some(desc);

            let established = state.remote.is_none();
            if established {
                state.remote = Some((remote.id, Rc::downgrade(&remote)));
            }

            (established, reconcile(&mut state.remote_streams, &published))
        };

        if established {
            tracing::debug!(peer = %id, remote = %remote.id, "paired with remote peer");
            self.schedule_open();
        }

        tracing::trace!(peer = %id, remote_slots = published.len(), "reconciled remote streams");
        for signal in signals {
            self.schedule_signal(signal);
        }

        Ok(())
    }

    /// Peer a remote description refers to.
    ///
    /// Once paired, the established remote is kept even if a later
    /// description names another peer.
    fn resolve_remote(&self, desc: &SessionDescription) -> Result<Rc<PeerInner>, PeerError> {
        let Some(origin) = desc.origin() else {
            return Err(self.mismatch(MismatchReason::MissingOrigin));
        };

        let paired = self.inner.state.borrow().remote.clone();
        match paired {
            Some((remote_id, remote)) => {
                if remote_id != origin {
                    tracing::warn!(
                        peer = %self.id(),
                        remote = %remote_id,
                        %origin,
                        "description names a different peer, keeping established remote"
                    );
                }
                remote.upgrade().ok_or_else(|| self.mismatch(MismatchReason::UnknownPeer(remote_id)))
            },
            None => self
                .inner
                .registry
                .lookup(origin)
                .ok_or_else(|| self.mismatch(MismatchReason::UnknownPeer(origin))),
        }
    }

    fn mismatch(&self, reason: MismatchReason) -> PeerError {
        tracing::error!(peer = %self.id(), %reason, "failed to connect with peer");
        PeerError::SignalingMismatch { peer: self.id(), reason }
    }

    /// Publish a stream in a new slot. The paired peer sees it on its next
    /// reconciliation.
    pub fn add_stream(&self, stream: MediaStream) {
        let mut state = self.inner.state.borrow_mut();
        state.local_streams.push(Some(stream));
        tracing::debug!(peer = %self.id(), slot = state.local_streams.len() - 1, "add_stream");
    }

    /// Put `stream` into an existing slot, returning what was there.
    ///
    /// Out-of-range slots are left alone and return `None`.
    pub fn replace_stream(&self, slot: usize, stream: MediaStream) -> Option<MediaStream> {
        let mut state = self.inner.state.borrow_mut();
        let Some(entry) = state.local_streams.get_mut(slot) else {
            tracing::warn!(peer = %self.id(), slot, "replace_stream: no such slot");
            return None;
        };
        tracing::debug!(peer = %self.id(), slot, "replace_stream");
        entry.replace(stream)
    }

    /// Empty a slot, returning its stream. The slot stays as a hole.
    pub fn remove_stream(&self, slot: usize) -> Option<MediaStream> {
        tracing::debug!(peer = %self.id(), slot, "remove_stream");
        self.inner.state.borrow_mut().local_streams.get_mut(slot)?.take()
    }

    /// Start ICE gathering.
    ///
    /// Moves to `Gathering` now and schedules the move to `Completed` together
    /// with a single candidate callback (`more_to_follow == false`). Only the
    /// first call has an effect.
    pub fn start_ice(&self) {
        {
            let mut state = self.inner.state.borrow_mut();
            if state.ice_state != IceState::New {
                tracing::trace!(peer = %self.id(), state = ?state.ice_state, "start_ice ignored");
                return;
            }
            state.ice_state = IceState::Gathering;
        }
        tracing::debug!(peer = %self.id(), "start_ice");

        let weak = Rc::downgrade(&self.inner);
        self.inner.scheduler.schedule(Box::new(move || {
            let Some(peer) = Self::from_weak(&weak) else {
                return;
            };
            peer.inner.state.borrow_mut().ice_state = IceState::Completed;
            tracing::debug!(peer = %peer.id(), "providing candidate");

            if let Some(handler) = &peer.inner.handlers.on_ice_candidate {
                handler(&peer, peer.inner.config.candidate.clone(), false);
            }
        }));
    }

    /// Accept a candidate from the remote side. Nothing to do without a real
    /// transport.
    pub fn process_ice_message(&self, candidate: &IceCandidate) {
        tracing::trace!(peer = %self.id(), label = candidate.label(), "process_ice_message");
    }

    /// Stop every local stream.
    pub fn close(&self) {
        tracing::debug!(peer = %self.id(), "close");
        let streams = {
            let mut state = self.inner.state.borrow_mut();
            state.closed = true;
            state.local_streams.clone()
        };
        for stream in streams.iter().flatten() {
            stream.stop();
        }
    }

    fn schedule_open(&self) {
        let weak = Rc::downgrade(&self.inner);
        self.inner.scheduler.schedule(Box::new(move || {
            let Some(peer) = Self::from_weak(&weak) else {
                return;
            };
            tracing::debug!(peer = %peer.id(), "signalling open");
            if let Some(handler) = &peer.inner.handlers.on_open {
                handler(&peer);
            }
        }));
    }

    fn schedule_signal(&self, signal: Signal) {
        let weak = Rc::downgrade(&self.inner);
        self.inner.scheduler.schedule(Box::new(move || {
            let Some(peer) = Self::from_weak(&weak) else {
                return;
            };
            let handlers = &peer.inner.handlers;
            match signal {
                Signal::Removed(event) => {
                    tracing::debug!(peer = %peer.id(), slot = event.slot, "signalling remote stream removed");
                    if let Some(handler) = &handlers.on_remove_stream {
                        handler(&peer, event);
                    }
                },
                Signal::Added(event) => {
                    tracing::debug!(peer = %peer.id(), slot = event.slot, "signalling remote stream added");
                    if let Some(handler) = &handlers.on_add_stream {
                        handler(&peer, event);
                    }
                },
            }
        }));
    }
}

impl fmt::Debug for SimulatedPeer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.borrow();
        f.debug_struct("SimulatedPeer")
            .field("id", &self.inner.id)
            .field("ice_state", &state.ice_state)
            .field("local_slots", &state.local_streams.len())
            .field("remote_slots", &state.remote_streams.len())
            .field("remote", &state.remote.as_ref().map(|(id, _)| *id))
            .field("closed", &state.closed)
            .finish()
    }
}

/// Positional diff of `remote_streams` against the remote peer's `published`
/// slots. Updates `remote_streams` in place and returns the signals to
/// deliver, in slot order, removal before addition within a slot.
fn reconcile(
    remote_streams: &mut Vec<Option<MediaStream>>,
    published: &[Option<MediaStream>],
) -> Vec<Signal> {
    let slots = remote_streams.len().max(published.len());
    let mut signals = Vec::new();

    for slot in 0..slots {
        let current = remote_streams.get(slot).cloned().flatten();
        let next = published.get(slot).cloned().flatten();
        if current == next {
            continue;
        }

        if let Some(old) = current {
            remote_streams[slot] = None;
            signals.push(Signal::Removed(StreamEvent { slot, stream: old }));
        }

        if let Some(new) = next {
            if remote_streams.len() <= slot {
                remote_streams.resize(slot + 1, None);
            }
            remote_streams[slot] = Some(new.clone());
            signals.push(Signal::Added(StreamEvent { slot, stream: new }));
        }
    }

    signals
}
