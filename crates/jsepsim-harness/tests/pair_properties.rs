//! Property-based tests: arbitrary interleavings of stream edits, signaling,
//! ICE and queue drains never break the standard invariants.

use jsepsim_core::MediaStream;
use jsepsim_harness::{InvariantRegistry, PeerPair, Side};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Add(Side),
    Replace(Side, usize),
    Remove(Side, usize),
    Offer(Side),
    DeliverOne(Side),
    StartIce(Side),
    Drain,
    RunOne,
}

fn side_strategy() -> impl Strategy<Value = Side> {
    prop_oneof![Just(Side::Caller), Just(Side::Callee)]
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => side_strategy().prop_map(Op::Add),
        1 => (side_strategy(), 0usize..6).prop_map(|(s, i)| Op::Replace(s, i)),
        1 => (side_strategy(), 0usize..6).prop_map(|(s, i)| Op::Remove(s, i)),
        2 => side_strategy().prop_map(Op::Offer),
        3 => side_strategy().prop_map(Op::DeliverOne),
        1 => side_strategy().prop_map(Op::StartIce),
        2 => Just(Op::Drain),
        2 => Just(Op::RunOne),
    ]
}

fn apply(pair: &PeerPair, op: &Op, next_label: &mut usize) {
    let mut fresh = || {
        *next_label += 1;
        MediaStream::new(format!("s{next_label}"))
    };
    match op {
        Op::Add(side) => pair.peer(*side).add_stream(fresh()),
        Op::Replace(side, slot) => {
            let peer = pair.peer(*side);
            let slots = peer.local_streams().len();
            if slots > 0 {
                peer.replace_stream(slot % slots, fresh());
            }
        },
        Op::Remove(side, slot) => {
            let peer = pair.peer(*side);
            let slots = peer.local_streams().len();
            if slots > 0 {
                peer.remove_stream(slot % slots);
            }
        },
        Op::Offer(side) => {
            pair.offer_from(*side).unwrap();
        },
        Op::DeliverOne(side) => {
            pair.deliver_next(*side).unwrap();
        },
        Op::StartIce(side) => pair.peer(*side).start_ice(),
        Op::Drain => {
            pair.drain();
        },
        Op::RunOne => {
            pair.queue().run_next();
        },
    }
}

proptest! {
    /// Invariants hold after every single step.
    #[test]
    fn prop_invariants_hold_at_every_step(ops in prop::collection::vec(op_strategy(), 0..60)) {
        let pair = PeerPair::new();
        let invariants = InvariantRegistry::standard();
        let mut next_label = 0;

        for op in &ops {
            apply(&pair, op, &mut next_label);
            let result = pair.check_invariants(&invariants);
            prop_assert!(result.is_ok(), "after {:?}: {:?}", op, result);
        }

        pair.settle().unwrap();
        pair.check_invariants(&invariants).unwrap();
    }

    /// A final exchange after any history leaves each side's remote slots
    /// equal to the other side's local slots.
    #[test]
    fn prop_final_exchange_mirrors_both_sides(ops in prop::collection::vec(op_strategy(), 0..60)) {
        let pair = PeerPair::new();
        let mut next_label = 0;
        for op in &ops {
            apply(&pair, op, &mut next_label);
        }
        pair.settle().unwrap();

        pair.renegotiate().unwrap();
        pair.settle().unwrap();

        for (local, remote) in [(Side::Caller, Side::Callee), (Side::Callee, Side::Caller)] {
            let published = pair.peer(local).local_streams();
            let received = pair.peer(remote).remote_streams();
            let width = published.len().max(received.len());
            for slot in 0..width {
                prop_assert_eq!(
                    published.get(slot).cloned().flatten(),
                    received.get(slot).cloned().flatten()
                );
            }
        }
        pair.check_invariants(&InvariantRegistry::standard()).unwrap();
    }
}
