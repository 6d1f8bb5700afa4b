//! Deferred execution abstraction.
//!
//! Decouples when a peer's callbacks run from the peer logic itself. A
//! [`ManualQueue`] holds tasks until a test drains it, which makes every
//! interleaving reproducible. A [`LiveScheduler`] runs them shortly after the
//! current turn on a tokio local task, for interactive use.
//!
//! # Invariants
//!
//! - A scheduled task never runs before `schedule` returns.
//! - Tasks scheduled on one scheduler run in the order they were scheduled.
//! - There is no cancellation: a scheduled task either runs or is dropped
//!   with its scheduler.

use std::{cell::RefCell, collections::VecDeque, fmt, rc::Rc, time::Duration};

use tokio::sync::mpsc;

/// A deferred callback.
pub type Task = Box<dyn FnOnce() + 'static>;

/// Minimum delay a [`LiveScheduler`] waits before running a task.
pub const DEFAULT_MIN_DELAY: Duration = Duration::from_millis(1);

/// Defers a callback until after the current call stack has unwound.
pub trait Scheduler {
    /// Queue `task` to run later.
    fn schedule(&self, task: Task);
}

/// Test scheduler that only runs tasks when told to.
///
/// Clones share the same queue.
#[derive(Clone, Default)]
pub struct ManualQueue {
    tasks: Rc<RefCell<VecDeque<Task>>>,
}

impl ManualQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tasks waiting.
    pub fn len(&self) -> usize {
        self.tasks.borrow().len()
    }

    /// True when no task is waiting.
    pub fn is_empty(&self) -> bool {
        self.tasks.borrow().is_empty()
    }

    /// Run the oldest task, if any. Returns whether a task ran.
    pub fn run_next(&self) -> bool {
        // The borrow ends before the task runs so the task may schedule more.
        let next = self.tasks.borrow_mut().pop_front();
        match next {
            Some(task) => {
                task();
                true
            },
            None => false,
        }
    }

    /// Run tasks until the queue is observed empty, including tasks scheduled
    /// by tasks run during this drain. Returns how many ran.
    pub fn drain(&self) -> usize {
        let mut ran = 0;
        while self.run_next() {
            ran += 1;
        }
        if ran > 0 {
            tracing::trace!(ran, "drained manual queue");
        }
        ran
    }
}

impl Scheduler for ManualQueue {
    fn schedule(&self, task: Task) {
        self.tasks.borrow_mut().push_back(task);
    }
}

impl fmt::Debug for ManualQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualQueue").field("pending", &self.len()).finish()
    }
}

/// Timer-backed scheduler for interactive use.
///
/// Tasks go through a channel to a single pump running on the current
/// [`tokio::task::LocalSet`], which sleeps for the minimum delay before each
/// task. One pump keeps tasks in FIFO order; exact timing is not guaranteed.
#[derive(Clone, Debug)]
pub struct LiveScheduler {
    tx: mpsc::UnboundedSender<Task>,
}

impl LiveScheduler {
    /// Start the pump and return a handle to it.
    ///
    /// Must be called from inside a `LocalSet`, since tasks are not `Send`.
    /// The pump stops once every handle is dropped and the backlog is run.
    pub fn spawn(min_delay: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::task::spawn_local(pump(rx, min_delay));
        Self { tx }
    }
}

async fn pump(mut rx: mpsc::UnboundedReceiver<Task>, min_delay: Duration) {
    while let Some(task) = rx.recv().await {
        tokio::time::sleep(min_delay).await;
        task();
    }
}

impl Scheduler for LiveScheduler {
    fn schedule(&self, task: Task) {
        if self.tx.send(task).is_err() {
            tracing::warn!("live scheduler pump has stopped, dropping task");
        }
    }
}

/// Which scheduler a simulation uses. Chosen once, at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SchedulerConfig {
    /// Hold tasks until drained
    #[default]
    Manual,
    /// Run tasks on tokio timers
    Live {
        /// Delay before each task runs
        min_delay: Duration,
    },
}

impl SchedulerConfig {
    /// Live scheduling with [`DEFAULT_MIN_DELAY`].
    pub fn live() -> Self {
        Self::Live { min_delay: DEFAULT_MIN_DELAY }
    }

    /// Build the configured scheduler.
    ///
    /// The live variant must be built inside a `LocalSet`.
    pub fn build(self) -> DeferredQueue {
        match self {
            Self::Manual => DeferredQueue::Manual(ManualQueue::new()),
            Self::Live { min_delay } => DeferredQueue::Live(LiveScheduler::spawn(min_delay)),
        }
    }
}

/// A scheduler selected by [`SchedulerConfig`].
#[derive(Clone, Debug)]
pub enum DeferredQueue {
    /// Test-driven queue
    Manual(ManualQueue),
    /// Timer-driven queue
    Live(LiveScheduler),
}

impl DeferredQueue {
    /// The manual queue, so a test can drain it. `None` for live scheduling.
    pub fn as_manual(&self) -> Option<&ManualQueue> {
        match self {
            Self::Manual(queue) => Some(queue),
            Self::Live(_) => None,
        }
    }
}

impl Scheduler for DeferredQueue {
    fn schedule(&self, task: Task) {
        match self {
            Self::Manual(queue) => queue.schedule(task),
            Self::Live(live) => live.schedule(task),
        }
    }
}
