//! Simulated JSEP handshake binary.
//!
//! Builds two peers on the live scheduler, publishes streams on both, runs an
//! offer/answer exchange and ICE, then waits for every callback to arrive.
//!
//! # Usage
//!
//! ```bash
//! # Two streams per side, 5 ms between callbacks
//! jsepsim --streams 2 --delay-ms 5
//!
//! # Watch every peer operation
//! jsepsim --log-level jsepsim_core=trace
//! ```

use std::{
    cell::{Cell, RefCell},
    rc::Rc,
    time::Duration,
};

use clap::Parser;
use jsepsim_core::{
    DeferredQueue, IceCandidate, MediaStream, PeerConfig, PeerError, PeerHandlers, PeerId,
    PeerRegistry, SchedulerConfig, SdpAction, SimulatedPeer,
};
use thiserror::Error;
use tokio::task::LocalSet;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Simulated JSEP handshake
#[derive(Parser, Debug)]
#[command(name = "jsepsim")]
#[command(about = "Run a simulated offer/answer and ICE exchange between two peers")]
#[command(version)]
struct Args {
    /// Streams each peer publishes before connecting
    #[arg(short, long, default_value = "1")]
    streams: usize,

    /// Minimum delay before each deferred callback, in milliseconds
    #[arg(short, long, default_value = "1")]
    delay_ms: u64,

    /// Give up if callbacks have not all arrived after this many milliseconds
    #[arg(long, default_value = "5000")]
    timeout_ms: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[derive(Error, Debug)]
enum CliError {
    #[error(transparent)]
    Peer(#[from] PeerError),

    #[error("handshake did not finish within {0:?}")]
    Timeout(Duration),
}

/// Callback counters shared by both peers' handlers.
#[derive(Default)]
struct Progress {
    opened: Cell<usize>,
    added: Cell<usize>,
    candidates: RefCell<Vec<(PeerId, IceCandidate)>>,
}

impl Progress {
    fn handlers(self: &Rc<Self>, role: &'static str) -> PeerHandlers {
        let opened = Rc::clone(self);
        let added = Rc::clone(self);
        let candidates = Rc::clone(self);
        PeerHandlers::new()
            .on_open(move |peer| {
                tracing::info!(role, peer = %peer.id(), "open");
                opened.opened.set(opened.opened.get() + 1);
            })
            .on_add_stream(move |peer, event| {
                tracing::info!(role, peer = %peer.id(), slot = event.slot, label = event.stream.label(), "remote stream added");
                added.added.set(added.added.get() + 1);
            })
            .on_remove_stream(move |peer, event| {
                tracing::info!(role, peer = %peer.id(), slot = event.slot, label = event.stream.label(), "remote stream removed");
            })
            .on_ice_candidate(move |peer, candidate, more_to_follow| {
                tracing::info!(role, peer = %peer.id(), sdp = candidate.to_sdp(), more_to_follow, "candidate");
                candidates.candidates.borrow_mut().push((peer.id(), candidate));
            })
    }

    fn is_complete(&self, expected_adds: usize) -> bool {
        self.opened.get() == 2 && self.added.get() == expected_adds && self.candidates.borrow().len() == 2
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    tracing::info!(streams = args.streams, delay_ms = args.delay_ms, "jsepsim starting");

    LocalSet::new().run_until(run(&args)).await?;

    tracing::info!("handshake complete");
    Ok(())
}

async fn run(args: &Args) -> Result<(), CliError> {
    let delay = Duration::from_millis(args.delay_ms);
    let scheduler = SchedulerConfig::Live { min_delay: delay }.build();
    let registry = PeerRegistry::new();
    let progress = Rc::new(Progress::default());

    let caller = peer(&registry, &scheduler, progress.handlers("caller"));
    let callee = peer(&registry, &scheduler, progress.handlers("callee"));
    for i in 0..args.streams {
        caller.add_stream(MediaStream::new(format!("caller-{i}")));
        callee.add_stream(MediaStream::new(format!("callee-{i}")));
    }

    let offer = caller.create_offer();
    caller.set_local_description(SdpAction::Offer, offer.clone());
    callee.set_remote_description(SdpAction::Offer, offer.clone())?;

    let answer = callee.create_answer(&offer);
    callee.set_local_description(SdpAction::Answer, answer.clone());
    caller.set_remote_description(SdpAction::Answer, answer)?;

    caller.start_ice();
    callee.start_ice();

    let limit = Duration::from_millis(args.timeout_ms);
    let expected_adds = args.streams * 2;
    tokio::time::timeout(limit, async {
        while !progress.is_complete(expected_adds) {
            tokio::time::sleep(delay.max(Duration::from_millis(1))).await;
        }
    })
    .await
    .map_err(|_| CliError::Timeout(limit))?;

    // Trickle each side's candidate to the other.
    for (from, candidate) in progress.candidates.borrow().iter() {
        let to = if *from == caller.id() { &callee } else { &caller };
        to.process_ice_message(candidate);
    }

    tracing::info!(
        caller = %caller.id(),
        callee = %callee.id(),
        caller_remote = caller.remote_stream_count(),
        callee_remote = callee.remote_stream_count(),
        "peers connected"
    );

    caller.close();
    callee.close();
    Ok(())
}

fn peer(registry: &PeerRegistry, scheduler: &DeferredQueue, handlers: PeerHandlers) -> SimulatedPeer {
    SimulatedPeer::new(registry, PeerConfig::default(), scheduler.clone(), handlers)
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn args_are_well_formed() {
        Args::command().debug_assert();
    }

    #[test]
    fn defaults_run_one_stream_per_side() {
        let args = Args::parse_from(["jsepsim"]);
        assert_eq!(args.streams, 1);
        assert_eq!(args.delay_ms, 1);
        assert_eq!(args.log_level, "info");
    }

    #[tokio::test(flavor = "current_thread")]
    async fn handshake_completes_on_live_scheduler() {
        let args = Args::parse_from(["jsepsim", "--streams", "3", "--delay-ms", "0"]);
        LocalSet::new().run_until(run(&args)).await.unwrap();
    }
}
