//! Deterministic simulator of a JSEP signaling peer.
//!
//! A [`SimulatedPeer`] fakes the offer/answer exchange, ICE gathering and
//! remote stream announcements of a real peer connection, so the code that
//! drives a peer connection can be tested without a network or a media stack.
//!
//! # Deferred callbacks
//!
//! Nothing a peer reports to its consumer happens inside the call that caused
//! it. Open, stream and ICE notifications are handed to a [`Scheduler`] and run
//! later. Tests use a [`ManualQueue`] and decide exactly when to
//! [`drain`](ManualQueue::drain) it; interactive use picks a
//! [`LiveScheduler`] backed by tokio timers. Both are selected through
//! [`SchedulerConfig`].
//!
//! # Peer lookup
//!
//! Peers find each other through a [`PeerRegistry`] shared by every peer of a
//! test. A remote description names the peer that produced it, and the
//! receiving peer resolves that id in its registry.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod peer;
pub mod registry;
pub mod scheduler;
pub mod stream;

pub use config::PeerConfig;
pub use error::{MismatchReason, PeerError};
pub use jsepsim_proto::{
    DescriptionKind, IceCandidate, PeerId, SdpAction, SessionDescription, SignalingMessage,
};
pub use peer::{IceState, PeerHandlers, SimulatedPeer, StreamEvent};
pub use registry::PeerRegistry;
pub use scheduler::{
    DEFAULT_MIN_DELAY, DeferredQueue, LiveScheduler, ManualQueue, Scheduler, SchedulerConfig,
    Task,
};
pub use stream::MediaStream;
