//! Deferred callbacks.
//!
//! The registry never sleeps. Jittered handshake replies and the grace
//! period before a channel closes are handed to a [`Scheduler`], which is
//! either backed by tokio timers or by a virtual clock the caller advances.

use std::sync::Mutex;
use std::time::Duration;
use tokio::runtime::{Handle, TryCurrentError};

use crate::lifecycle::Shutdown;

/// A unit of deferred work.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Runs a task once after a delay.
pub trait Scheduler: Send + Sync {
    fn schedule(&self, delay: Duration, task: Task);
}

/// Scheduler backed by tokio timers.
///
/// Every task is a spawned sleep racing the shutdown signal, so triggering
/// [`Shutdown`] drops whatever has not fired yet. Tasks scheduled after the
/// trigger are dropped without spawning.
pub struct TokioScheduler {
    handle: Handle,
    shutdown: Shutdown,
}

impl TokioScheduler {
    /// Bind to the runtime of the calling task.
    pub fn new(shutdown: Shutdown) -> Result<Self, TryCurrentError> {
        Ok(Self {
            handle: Handle::try_current()?,
            shutdown,
        })
    }

    /// Bind to an explicit runtime handle.
    pub fn with_handle(handle: Handle, shutdown: Shutdown) -> Self {
        Self { handle, shutdown }
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&self, delay: Duration, task: Task) {
        // Subscribe before checking so a concurrent trigger is not missed.
        let mut shutdown = self.shutdown.subscribe();
        if self.shutdown.is_triggered() {
            tracing::trace!(delay = ?delay, "Scheduled task dropped after shutdown");
            return;
        }
        self.handle.spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(delay) => task(),
                _ = shutdown.recv() => {
                    tracing::trace!(delay = ?delay, "Scheduled task dropped on shutdown");
                }
            }
        });
    }
}

struct Pending {
    due: Duration,
    seq: u64,
    task: Task,
}

#[derive(Default)]
struct VirtualTime {
    now: Duration,
    seq: u64,
    pending: Vec<Pending>,
}

/// Scheduler driven by virtual time.
///
/// Nothing runs until [`advance`](ManualScheduler::advance) is called; tasks
/// then fire in due-time order, ties broken by scheduling order. Tasks that
/// schedule more work inside the advanced window run in the same call.
#[derive(Default)]
pub struct ManualScheduler {
    time: Mutex<VirtualTime>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Virtual time elapsed so far.
    pub fn now(&self) -> Duration {
        self.time.lock().expect("scheduler mutex poisoned").now
    }

    /// Number of tasks waiting to fire.
    pub fn pending(&self) -> usize {
        self.time.lock().expect("scheduler mutex poisoned").pending.len()
    }

    /// Move virtual time forward, running every task that falls due.
    /// Returns the number of tasks run.
    pub fn advance(&self, by: Duration) -> usize {
        let target = self.now() + by;
        let mut ran = 0;

        loop {
            let next = {
                let mut time = self.time.lock().expect("scheduler mutex poisoned");
                let index = time
                    .pending
                    .iter()
                    .enumerate()
                    .filter(|(_, p)| p.due <= target)
                    .min_by_key(|(_, p)| (p.due, p.seq))
                    .map(|(i, _)| i);

                match index {
                    Some(i) => {
                        let pending = time.pending.swap_remove(i);
                        time.now = pending.due.max(time.now);
                        Some(pending.task)
                    }
                    None => {
                        time.now = target;
                        None
                    }
                }
            };

            match next {
                Some(task) => {
                    task();
                    ran += 1;
                }
                None => return ran,
            }
        }
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, delay: Duration, task: Task) {
        let mut time = self.time.lock().expect("scheduler mutex poisoned");
        let due = time.now + delay;
        let seq = time.seq;
        time.seq += 1;
        time.pending.push(Pending { due, seq, task });
    }
}
