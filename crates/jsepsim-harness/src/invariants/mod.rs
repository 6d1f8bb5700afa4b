//! Invariant checking for peer pair simulations.
//!
//! Invariants are properties that must hold after any sequence of peer
//! operations, queue drains and signaling deliveries. Unlike example-based
//! tests they do not describe a scenario; they describe what no scenario may
//! break.
//!
//! # Architecture
//!
//! [`PairSnapshot`] captures the observable state of both peers, the events
//! they delivered and the number of tasks still queued. Registered
//! [`Invariant`] checks run against that snapshot.
//!
//! # Usage
//!
//! ```ignore
//! let registry = InvariantRegistry::standard();
//! pair.check_invariants(&registry)?;
//! ```

mod checks;
mod snapshot;

pub use checks::{
    EventsReplayToRemoteSlots, OpenAtMostOnce, PairingIsSymmetric, SingleCompletedCandidate,
};
pub use snapshot::{PairSnapshot, PeerSnapshot};

/// Invariant check result.
pub type InvariantResult = Result<(), Violation>;

/// Invariant violation with context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Name of the violated invariant.
    pub invariant: &'static str,
    /// Description of what went wrong.
    pub message: String,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.invariant, self.message)
    }
}

impl std::error::Error for Violation {}

/// A property checked against a [`PairSnapshot`].
pub trait Invariant {
    /// Invariant name for error reporting.
    fn name(&self) -> &'static str;

    /// Check the invariant against a snapshot.
    ///
    /// Returns `Ok(())` if the invariant holds, or a [`Violation`]
    /// describing what went wrong.
    fn check(&self, state: &PairSnapshot) -> InvariantResult;

    /// Build a violation for this invariant.
    fn violation(&self, message: String) -> Violation {
        Violation { invariant: self.name(), message }
    }
}

/// Registry of invariants to check.
pub struct InvariantRegistry {
    invariants: Vec<Box<dyn Invariant>>,
}

impl Default for InvariantRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl InvariantRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self { invariants: Vec::new() }
    }

    /// Create a registry with every standard peer invariant.
    ///
    /// Includes:
    /// - [`OpenAtMostOnce`]: `on_open` fires at most once per peer
    /// - [`SingleCompletedCandidate`]: one final candidate, after completion
    /// - [`PairingIsSymmetric`]: paired peers point at each other
    /// - [`EventsReplayToRemoteSlots`]: delivered stream events rebuild the
    ///   remote slots
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.add(OpenAtMostOnce);
        registry.add(SingleCompletedCandidate);
        registry.add(PairingIsSymmetric);
        registry.add(EventsReplayToRemoteSlots);
        registry
    }

    /// Add an invariant to the registry.
    pub fn add<I: Invariant + 'static>(&mut self, invariant: I) {
        self.invariants.push(Box::new(invariant));
    }

    /// Check all invariants against the given state.
    ///
    /// Returns `Ok(())` if all invariants hold, or every violation found.
    pub fn check_all(&self, state: &PairSnapshot) -> Result<(), Vec<Violation>> {
        let violations: Vec<_> =
            self.invariants.iter().filter_map(|inv| inv.check(state).err()).collect();

        if violations.is_empty() { Ok(()) } else { Err(violations) }
    }

    /// Check all invariants, panicking with every violation found.
    #[allow(clippy::panic)]
    pub fn assert_all(&self, state: &PairSnapshot, context: &str) {
        if let Err(violations) = self.check_all(state) {
            let messages: Vec<_> = violations.iter().map(ToString::to_string).collect();
            panic!("Invariant violation {context}:\n  {}", messages.join("\n  "));
        }
    }

    /// Number of registered invariants.
    pub fn len(&self) -> usize {
        self.invariants.len()
    }

    /// Check if registry is empty.
    pub fn is_empty(&self) -> bool {
        self.invariants.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_registry_has_invariants() {
        let registry = InvariantRegistry::standard();
        assert_eq!(registry.len(), 4);
        assert!(!registry.is_empty());
    }

    #[test]
    fn empty_snapshot_satisfies_standard_invariants() {
        let registry = InvariantRegistry::standard();
        assert!(registry.check_all(&PairSnapshot::default()).is_ok());
    }

    #[test]
    fn violation_display_names_invariant() {
        let violation = Violation { invariant: "open_at_most_once", message: "peer 1".into() };
        assert_eq!(violation.to_string(), "open_at_most_once: peer 1");
    }
}
