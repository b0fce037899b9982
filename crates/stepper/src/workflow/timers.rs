use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::{runtime::Handle, task::JoinHandle, time::Instant};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    LockRelease,
    AutoAdvance,
}

struct ActiveTimer {
    kind: TimerKind,
    handle: JoinHandle<()>,
}

#[derive(Default)]
struct Timers {
    active: Vec<ActiveTimer>,
    closed: bool,
}

/// Single-shot timers owned by one controller.
///
/// Timers never repeat. Everything still pending is aborted by
/// [`TimerSet::cancel_all`], [`TimerSet::close`] or when the set is dropped.
/// Once closed, the set refuses new timers.
#[derive(Default)]
pub struct TimerSet {
    timers: Mutex<Timers>,
}

impl TimerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `task` once after `delay` on `runtime`. Returns false, without
    /// spawning anything, when the set is closed.
    pub fn schedule<F>(&self, runtime: &Handle, kind: TimerKind, delay: Duration, task: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut timers = self.timers();
        if timers.closed {
            debug!("Refusing {:?} timer on closed timer set", kind);
            return false;
        }

        // The deadline counts from scheduling, not from the task's first poll.
        let deadline = Instant::now() + delay;
        let handle = runtime.spawn(async move {
            tokio::time::sleep_until(deadline).await;
            task.await;
        });

        timers.active.retain(|timer| !timer.handle.is_finished());
        timers.active.push(ActiveTimer { kind, handle });
        true
    }

    /// Abort every pending timer, returning how many were still pending.
    pub fn cancel_all(&self) -> usize {
        abort_all(&mut self.timers().active)
    }

    /// Abort every pending timer and refuse all later ones.
    pub fn close(&self) -> usize {
        let mut timers = self.timers();
        timers.closed = true;
        abort_all(&mut timers.active)
    }

    pub fn is_closed(&self) -> bool {
        self.timers().closed
    }

    pub fn pending(&self) -> usize {
        self.timers()
            .active
            .iter()
            .filter(|timer| !timer.handle.is_finished())
            .count()
    }

    pub fn pending_of(&self, kind: TimerKind) -> usize {
        self.timers()
            .active
            .iter()
            .filter(|timer| timer.kind == kind && !timer.handle.is_finished())
            .count()
    }

    fn timers(&self) -> MutexGuard<'_, Timers> {
        self.timers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn abort_all(active: &mut Vec<ActiveTimer>) -> usize {
    let mut cancelled = 0;
    for timer in active.drain(..) {
        if !timer.handle.is_finished() {
            debug!("Cancelling pending {:?} timer", timer.kind);
            cancelled += 1;
        }
        timer.handle.abort();
    }
    cancelled
}

impl Drop for TimerSet {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for TimerSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerSet")
            .field("pending", &self.pending())
            .finish()
    }
}
