//! Property-based tests for stream slot reconciliation.
//!
//! Arbitrary sequences of local slot edits on one peer, interleaved with
//! renegotiations, must leave the other peer's remote slots mirroring them,
//! and the delivered add/remove signals must replay to the same slots.

use std::{cell::RefCell, rc::Rc};

use jsepsim_core::{
    ManualQueue, MediaStream, PeerConfig, PeerHandlers, PeerRegistry, SdpAction, SimulatedPeer,
    StreamEvent,
};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum SlotOp {
    Add,
    Replace(usize),
    Remove(usize),
    Renegotiate,
}

fn slot_op_strategy() -> impl Strategy<Value = SlotOp> {
    prop_oneof![
        4 => Just(SlotOp::Add),
        2 => (0usize..8).prop_map(SlotOp::Replace),
        2 => (0usize..8).prop_map(SlotOp::Remove),
        2 => Just(SlotOp::Renegotiate),
    ]
}

#[derive(Debug, Clone)]
enum Delivered {
    Added(StreamEvent),
    Removed(StreamEvent),
}

struct Pair {
    queue: ManualQueue,
    delivered: Rc<RefCell<Vec<Delivered>>>,
    sender: SimulatedPeer,
    receiver: SimulatedPeer,
    next_label: usize,
}

impl Pair {
    fn new() -> Self {
        let registry = PeerRegistry::new();
        let queue = ManualQueue::new();
        let delivered = Rc::new(RefCell::new(Vec::new()));

        let added = Rc::clone(&delivered);
        let removed = Rc::clone(&delivered);
        let handlers = PeerHandlers::new()
            .on_add_stream(move |_, event| added.borrow_mut().push(Delivered::Added(event)))
            .on_remove_stream(move |_, event| removed.borrow_mut().push(Delivered::Removed(event)));

        let sender =
            SimulatedPeer::new(&registry, PeerConfig::default(), queue.clone(), PeerHandlers::new());
        let receiver = SimulatedPeer::new(&registry, PeerConfig::default(), queue.clone(), handlers);

        Self { queue, delivered, sender, receiver, next_label: 0 }
    }

    fn fresh_stream(&mut self) -> MediaStream {
        self.next_label += 1;
        MediaStream::new(format!("stream-{}", self.next_label))
    }

    fn apply(&mut self, op: &SlotOp) {
        let slots = self.sender.local_streams().len();
        match op {
            SlotOp::Add => {
                let stream = self.fresh_stream();
                self.sender.add_stream(stream);
            },
            SlotOp::Replace(slot) if slots > 0 => {
                let stream = self.fresh_stream();
                self.sender.replace_stream(slot % slots, stream);
            },
            SlotOp::Remove(slot) if slots > 0 => {
                self.sender.remove_stream(slot % slots);
            },
            SlotOp::Renegotiate => self.renegotiate(),
            SlotOp::Replace(_) | SlotOp::Remove(_) => {},
        }
    }

    fn renegotiate(&self) {
        let offer = self.sender.create_offer();
        self.receiver.set_remote_description(SdpAction::Offer, offer).unwrap();
        self.queue.drain();
    }
}

fn mirrors(remote: &[Option<MediaStream>], local: &[Option<MediaStream>]) -> bool {
    let slots = remote.len().max(local.len());
    (0..slots).all(|i| remote.get(i).cloned().flatten() == local.get(i).cloned().flatten())
}

proptest! {
    /// Streams published before the first exchange each produce exactly one
    /// add signal, in slot order, carrying the published stream.
    #[test]
    fn prop_first_exchange_adds_every_populated_slot(
        ops in prop::collection::vec(slot_op_strategy(), 0..24),
    ) {
        let mut pair = Pair::new();
        for op in ops.iter().filter(|op| !matches!(op, SlotOp::Renegotiate)) {
            pair.apply(op);
        }

        pair.renegotiate();

        let published: Vec<StreamEvent> = pair
            .sender
            .local_streams()
            .into_iter()
            .enumerate()
            .filter_map(|(slot, stream)| stream.map(|stream| StreamEvent { slot, stream }))
            .collect();
        let added: Vec<StreamEvent> = pair
            .delivered
            .borrow()
            .iter()
            .filter_map(|d| match d {
                Delivered::Added(event) => Some(event.clone()),
                Delivered::Removed(_) => None,
            })
            .collect();

        prop_assert_eq!(added, published);
    }

    /// After every renegotiation the receiver's remote slots mirror the
    /// sender's local slots, and replaying the delivered signals onto empty
    /// slots reproduces them.
    #[test]
    fn prop_remote_slots_mirror_local_slots(
        ops in prop::collection::vec(slot_op_strategy(), 0..40),
    ) {
        let mut pair = Pair::new();
        pair.renegotiate();

        for op in &ops {
            pair.apply(op);
            if matches!(op, SlotOp::Renegotiate) {
                prop_assert!(mirrors(&pair.receiver.remote_streams(), &pair.sender.local_streams()));
            }
        }

        let mut replayed: Vec<Option<MediaStream>> = Vec::new();
        for delivered in pair.delivered.borrow().iter() {
            match delivered {
                Delivered::Removed(event) => {
                    prop_assert_eq!(replayed.get(event.slot).cloned().flatten(), Some(event.stream.clone()));
                    replayed[event.slot] = None;
                },
                Delivered::Added(event) => {
                    if replayed.len() <= event.slot {
                        replayed.resize(event.slot + 1, None);
                    }
                    prop_assert_eq!(replayed[event.slot].clone(), None);
                    replayed[event.slot] = Some(event.stream.clone());
                },
            }
        }
        prop_assert!(mirrors(&replayed, &pair.receiver.remote_streams()));
    }
}
