//! Standard invariant checks.

use jsepsim_core::{IceState, MediaStream};

use super::{Invariant, InvariantResult, PairSnapshot};
use crate::events::PeerEvent;

/// `on_open` fires at most once per peer, and only for a paired peer.
pub struct OpenAtMostOnce;

impl Invariant for OpenAtMostOnce {
    fn name(&self) -> &'static str {
        "open_at_most_once"
    }

    fn check(&self, state: &PairSnapshot) -> InvariantResult {
        for peer in &state.peers {
            let opens =
                state.events_for(peer.id).filter(|e| matches!(e, PeerEvent::Opened { .. })).count();
            if opens > 1 {
                return Err(self.violation(format!("peer {}: opened {opens} times", peer.id)));
            }
            if opens == 1 && peer.remote_id.is_none() {
                return Err(self.violation(format!("peer {}: opened without a remote", peer.id)));
            }
        }
        Ok(())
    }
}

/// A peer reports exactly one candidate, marked final, and only once its ICE
/// state is `Completed`.
pub struct SingleCompletedCandidate;

impl Invariant for SingleCompletedCandidate {
    fn name(&self) -> &'static str {
        "single_completed_candidate"
    }

    fn check(&self, state: &PairSnapshot) -> InvariantResult {
        for peer in &state.peers {
            let mut seen = 0;
            for event in state.events_for(peer.id) {
                let PeerEvent::Candidate { ice_state, more_to_follow, .. } = event else {
                    continue;
                };
                seen += 1;
                if *ice_state != IceState::Completed || *more_to_follow {
                    return Err(self.violation(format!(
                        "peer {}: candidate reported in {ice_state:?} with more_to_follow={more_to_follow}",
                        peer.id
                    )));
                }
            }
            if seen > 1 {
                return Err(self.violation(format!("peer {}: {seen} candidates", peer.id)));
            }
            if seen == 1 && peer.ice_state != IceState::Completed {
                return Err(self.violation(format!(
                    "peer {}: candidate delivered but state is {:?}",
                    peer.id, peer.ice_state
                )));
            }
        }
        Ok(())
    }
}

/// When both peers of a snapshot are paired, they are paired with each other.
pub struct PairingIsSymmetric;

impl Invariant for PairingIsSymmetric {
    fn name(&self) -> &'static str {
        "pairing_is_symmetric"
    }

    fn check(&self, state: &PairSnapshot) -> InvariantResult {
        for peer in &state.peers {
            let Some(remote_id) = peer.remote_id else {
                continue;
            };
            let Some(remote) = state.peer(remote_id) else {
                continue;
            };
            if let Some(back) = remote.remote_id {
                if back != peer.id {
                    return Err(self.violation(format!(
                        "peer {} paired with {remote_id}, which is paired with {back}",
                        peer.id
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Once the queue is drained, replaying a peer's delivered stream events onto
/// empty slots gives exactly its remote slots.
///
/// Every removal must name the stream currently in its slot and every addition
/// must land in an empty slot.
pub struct EventsReplayToRemoteSlots;

impl Invariant for EventsReplayToRemoteSlots {
    fn name(&self) -> &'static str {
        "events_replay_to_remote_slots"
    }

    fn check(&self, state: &PairSnapshot) -> InvariantResult {
        if !state.is_settled() {
            return Ok(());
        }

        for peer in &state.peers {
            let mut slots: Vec<Option<MediaStream>> = Vec::new();
            for event in state.events_for(peer.id) {
                match event {
                    PeerEvent::StreamRemoved { event, .. } => {
                        let current = slots.get_mut(event.slot).and_then(Option::take);
                        if current.as_ref() != Some(&event.stream) {
                            return Err(self.violation(format!(
                                "peer {}: removal of '{}' from slot {} which held {:?}",
                                peer.id,
                                event.stream.label(),
                                event.slot,
                                current.as_ref().map(MediaStream::label)
                            )));
                        }
                    },
                    PeerEvent::StreamAdded { event, .. } => {
                        if slots.len() <= event.slot {
                            slots.resize(event.slot + 1, None);
                        }
                        if let Some(existing) = slots[event.slot].replace(event.stream.clone()) {
                            return Err(self.violation(format!(
                                "peer {}: addition to slot {} which still held '{}'",
                                peer.id,
                                event.slot,
                                existing.label()
                            )));
                        }
                    },
                    PeerEvent::Opened { .. } | PeerEvent::Candidate { .. } => {},
                }
            }

            let width = slots.len().max(peer.remote_streams.len());
            for slot in 0..width {
                let replayed = slots.get(slot).cloned().flatten();
                let actual = peer.remote_streams.get(slot).cloned().flatten();
                if replayed != actual {
                    return Err(self.violation(format!(
                        "peer {}: slot {slot} replays to {:?} but holds {:?}",
                        peer.id,
                        replayed.as_ref().map(MediaStream::label),
                        actual.as_ref().map(MediaStream::label)
                    )));
                }
            }
        }
        Ok(())
    }
}
