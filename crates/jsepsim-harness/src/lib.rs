//! Deterministic harness for simulated JSEP peers.
//!
//! [`PeerPair`] builds two peers on one [`ManualQueue`](jsepsim_core::ManualQueue)
//! and connects them through a [`SignalingLink`] that carries CBOR-encoded
//! signaling messages, standing in for the signaling connection a real
//! consumer would own. Every callback either peer raises is recorded in an
//! [`EventLog`].
//!
//! # Invariant Testing
//!
//! The `invariants` module checks properties that must hold after any
//! sequence of operations, not specific scenarios. Use
//! [`InvariantRegistry::standard()`] for the common set.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod events;
pub mod invariants;
pub mod link;
pub mod logging;
pub mod pair;

pub use events::{EventLog, PeerEvent};
pub use invariants::{
    EventsReplayToRemoteSlots, Invariant, InvariantRegistry, InvariantResult, OpenAtMostOnce,
    PairSnapshot, PairingIsSymmetric, PeerSnapshot, SingleCompletedCandidate, Violation,
};
pub use link::{LinkError, Side, SignalingLink};
pub use logging::init_test_tracing;
pub use pair::PeerPair;
