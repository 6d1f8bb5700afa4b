//! Live scheduler tests.
//!
//! The live scheduler runs on tokio timers inside a `LocalSet`. Timing is not
//! asserted, only ordering and the fact that nothing runs synchronously.

use std::{
    cell::{Cell, RefCell},
    rc::Rc,
    time::Duration,
};

use jsepsim_core::{
    IceState, PeerConfig, PeerHandlers, PeerRegistry, Scheduler, SchedulerConfig, SdpAction,
    SimulatedPeer,
};
use tokio::task::LocalSet;

const WAIT_LIMIT: Duration = Duration::from_secs(5);

async fn wait_until(condition: impl Fn() -> bool) {
    tokio::time::timeout(WAIT_LIMIT, async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn live_scheduler_preserves_order() {
    LocalSet::new()
        .run_until(async {
            let scheduler = SchedulerConfig::live().build();
            assert!(scheduler.as_manual().is_none());

            let order = Rc::new(RefCell::new(Vec::new()));
            for i in 0..10 {
                let order = Rc::clone(&order);
                scheduler.schedule(Box::new(move || order.borrow_mut().push(i)));
            }
            assert!(order.borrow().is_empty());

            wait_until(|| order.borrow().len() == 10).await;
            assert_eq!(*order.borrow(), (0..10).collect::<Vec<_>>());
        })
        .await;
}

#[tokio::test]
async fn live_handshake_opens_both_peers() {
    LocalSet::new()
        .run_until(async {
            let scheduler = SchedulerConfig::Live { min_delay: Duration::from_millis(2) }.build();
            let registry = PeerRegistry::new();
            let opens = Rc::new(Cell::new(0));

            let handlers = {
                let opens = Rc::clone(&opens);
                PeerHandlers::new().on_open(move |_| opens.set(opens.get() + 1))
            };
            let pc1 = SimulatedPeer::new(
                &registry,
                PeerConfig::default(),
                scheduler.clone(),
                handlers.clone(),
            );
            let pc2 =
                SimulatedPeer::new(&registry, PeerConfig::default(), scheduler.clone(), handlers);

            let offer = pc1.create_offer();
            pc2.set_remote_description(SdpAction::Offer, offer.clone()).unwrap();
            pc1.set_remote_description(SdpAction::Answer, pc2.create_answer(&offer)).unwrap();
            pc1.start_ice();
            pc2.start_ice();
            assert_eq!(opens.get(), 0);

            wait_until(|| {
                opens.get() == 2
                    && pc1.ice_state() == IceState::Completed
                    && pc2.ice_state() == IceState::Completed
            })
            .await;
        })
        .await;
}
