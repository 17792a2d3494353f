//! Deferred-callback schedulers used by the debouncer
//!
//! A scheduler runs a task once after a delay and can cancel it before it
//! fires. [`TokioScheduler`] does this on a tokio runtime;
//! [`ManualScheduler`] keeps a virtual clock that only moves when told to.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::error::{Error, Result};

/// Work handed to a scheduler
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Schedule-after-delay / cancel-scheduled capability
pub trait Scheduler {
    /// Identifies one scheduled task
    type Handle: Send + 'static;

    /// Run `task` once after `delay`
    fn schedule(&self, delay: Duration, task: Task) -> Self::Handle;

    /// Prevent a scheduled task from running. Cancelling a task that has
    /// already run is a no-op.
    fn cancel(&self, handle: Self::Handle);
}

/// Runs tasks on a tokio runtime after `tokio::time::sleep`
#[derive(Clone, Debug)]
pub struct TokioScheduler {
    runtime: Handle,
}

impl TokioScheduler {
    /// Bind to the runtime the caller is running on
    pub fn current() -> Result<Self> {
        Handle::try_current()
            .map(Self::from_handle)
            .map_err(|e| Error::invalid(format!("No tokio runtime available: {}", e)))
    }

    pub fn from_handle(runtime: Handle) -> Self {
        Self { runtime }
    }
}

impl Scheduler for TokioScheduler {
    type Handle = JoinHandle<()>;

    fn schedule(&self, delay: Duration, task: Task) -> Self::Handle {
        log::trace!("Scheduling task in {:?}", delay);
        self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            task();
        })
    }

    fn cancel(&self, handle: Self::Handle) {
        handle.abort();
    }
}

/// Handle returned by [`ManualScheduler`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ManualHandle {
    due: Duration,
    id: u64,
}

#[derive(Default)]
struct ManualState {
    now: Duration,
    next_id: u64,
    // keyed by (due time, scheduling order)
    tasks: BTreeMap<(Duration, u64), Task>,
}

/// Virtual-clock scheduler
///
/// Nothing fires until [`ManualScheduler::advance`] moves the clock. Clones
/// share the same clock and task queue.
#[derive(Clone, Default)]
pub struct ManualScheduler {
    state: Arc<Mutex<ManualState>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, ManualState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Virtual time elapsed since creation
    pub fn now(&self) -> Duration {
        self.lock().now
    }

    /// Number of tasks still waiting to fire
    pub fn pending(&self) -> usize {
        self.lock().tasks.len()
    }

    /// Move the clock forward by `by`, running every task that becomes due
    /// in due order. Returns how many tasks ran.
    ///
    /// The clock saturates at `Duration::MAX`.
    ///
    /// Tasks run without the internal lock held, so a task may schedule
    /// more work; anything it schedules inside the window also runs.
    pub fn advance(&self, by: Duration) -> usize {
        let target = self.now().saturating_add(by);
        let mut fired = 0;

        loop {
            let next = {
                let mut state = self.lock();
                match state.tasks.keys().next().copied() {
                    Some(key) if key.0 <= target => {
                        state.now = key.0;
                        state.tasks.remove(&key)
                    }
                    _ => {
                        state.now = target;
                        None
                    }
                }
            };

            match next {
                Some(task) => {
                    task();
                    fired += 1;
                }
                None => break,
            }
        }

        fired
    }
}

impl Scheduler for ManualScheduler {
    type Handle = ManualHandle;

    fn schedule(&self, delay: Duration, task: Task) -> Self::Handle {
        let mut state = self.lock();
        let handle = ManualHandle {
            due: state.now.saturating_add(delay),
            id: state.next_id,
        };
        state.next_id += 1;
        state.tasks.insert((handle.due, handle.id), task);
        log::trace!("Scheduled manual task {} due at {:?}", handle.id, handle.due);
        handle
    }

    fn cancel(&self, handle: Self::Handle) {
        self.lock().tasks.remove(&(handle.due, handle.id));
    }
}
