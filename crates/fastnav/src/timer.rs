//! Cancellable delays.
//!
//! The prefetch debounce is expressed against the [`Timer`] trait so tests
//! can drive time by hand with [`ManualTimer`] instead of sleeping.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::task::AbortHandle;

/// Something that can run a future after a delay.
pub trait Timer: Send + Sync {
    /// Run `task` once `delay` has elapsed unless the returned handle is
    /// cancelled first.
    fn schedule_after(&self, delay: Duration, task: BoxFuture<'static, ()>) -> TimerHandle;
}

/// Cancels a scheduled task. Dropping the handle does *not* cancel.
#[derive(Debug, Clone)]
pub struct TimerHandle {
    cancelled: Arc<AtomicBool>,
    abort: Option<AbortHandle>,
}

impl TimerHandle {
    fn new(cancelled: Arc<AtomicBool>, abort: Option<AbortHandle>) -> Self {
        Self { cancelled, abort }
    }

    /// Prevent the task from running. No effect once it has started.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        if let Some(abort) = &self.abort {
            abort.abort();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Real-time timer on the ambient tokio runtime.
///
/// `schedule_after` must be called from within a runtime context.
#[derive(Debug, Default, Clone)]
pub struct TokioTimer;

impl Timer for TokioTimer {
    fn schedule_after(&self, delay: Duration, task: BoxFuture<'static, ()>) -> TimerHandle {
        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = cancelled.clone();
        let join = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if !flag.load(Ordering::SeqCst) {
                task.await;
            }
        });
        TimerHandle::new(cancelled, Some(join.abort_handle()))
    }
}

struct Pending {
    deadline: Duration,
    seq: u64,
    cancelled: Arc<AtomicBool>,
    task: BoxFuture<'static, ()>,
}

#[derive(Default)]
struct ManualState {
    now: Duration,
    seq: u64,
    pending: Vec<Pending>,
}

/// Fake clock: tasks run only when [`ManualTimer::advance`] moves time past
/// their deadline.
#[derive(Default, Clone)]
pub struct ManualTimer {
    state: Arc<Mutex<ManualState>>,
}

impl ManualTimer {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, ManualState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Current fake time since creation.
    pub fn now(&self) -> Duration {
        self.state().now
    }

    /// Tasks scheduled and not yet run or cancelled.
    pub fn pending(&self) -> usize {
        self.state()
            .pending
            .iter()
            .filter(|p| !p.cancelled.load(Ordering::SeqCst))
            .count()
    }

    /// Move time forward and run every due task in deadline order.
    ///
    /// Tasks scheduled by a running task are picked up if they also fall
    /// due within the new time.
    pub async fn advance(&self, by: Duration) {
        let target = {
            let mut state = self.state();
            state.now += by;
            state.now
        };

        loop {
            let next = {
                let mut state = self.state();
                state.pending.retain(|p| !p.cancelled.load(Ordering::SeqCst));
                let due = state
                    .pending
                    .iter()
                    .enumerate()
                    .filter(|(_, p)| p.deadline <= target)
                    .min_by_key(|(_, p)| (p.deadline, p.seq))
                    .map(|(i, _)| i);
                due.map(|i| state.pending.swap_remove(i))
            };
            match next {
                Some(pending) => pending.task.await,
                None => break,
            }
        }
    }
}

impl Timer for ManualTimer {
    fn schedule_after(&self, delay: Duration, task: BoxFuture<'static, ()>) -> TimerHandle {
        let cancelled = Arc::new(AtomicBool::new(false));
        let mut state = self.state();
        state.seq += 1;
        let pending = Pending {
            deadline: state.now + delay,
            seq: state.seq,
            cancelled: cancelled.clone(),
            task,
        };
        state.pending.push(pending);
        TimerHandle::new(cancelled, None)
    }
}
