//! Trailing-edge debounce over an injectable scheduler
//!
//! Every call resets the timer; only the last call in a burst reaches the
//! wrapped function, once `wait` has passed with no further calls.
//!
//! # Example
//! ```
//! use std::time::Duration;
//! use utilkit::utils::debounce::debounce;
//! use utilkit::utils::scheduler::ManualScheduler;
//!
//! let scheduler = ManualScheduler::new();
//! let save = debounce(|doc: String| println!("saving {doc}"), Duration::from_millis(300), scheduler.clone()).unwrap();
//!
//! save.call("draft 1".to_string());
//! save.call("draft 2".to_string()); // replaces draft 1
//! scheduler.advance(Duration::from_millis(300)); // prints "saving draft 2"
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::utils::scheduler::Scheduler;

/// Wait used when the caller has no preference
pub const DEFAULT_WAIT: Duration = Duration::from_millis(300);

struct Pending<A, H> {
    handle: H,
    args: A,
}

/// Idle when `pending` is empty. `pending` always belongs to `generation`,
/// the number of the latest call.
struct DebounceState<A, H> {
    generation: u64,
    pending: Option<Pending<A, H>>,
}

struct Shared<A, H> {
    func: Box<dyn Fn(A) + Send + Sync>,
    state: Mutex<DebounceState<A, H>>,
}

impl<A, H> Shared<A, H> {
    fn state(&self) -> MutexGuard<'_, DebounceState<A, H>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Called by the scheduler; runs `func` only if `generation` is still
    /// the latest call.
    fn fire(&self, generation: u64) {
        let args = {
            let mut state = self.state();
            if state.generation != generation {
                // superseded by a later call
                return;
            }
            match state.pending.take() {
                Some(pending) => pending.args,
                None => return,
            }
        };

        log::debug!("Debounce window elapsed, running call {}", generation);
        (self.func)(args);
    }
}

/// A debounced wrapper around a function taking `A`
///
/// Use a tuple for `A` when the wrapped function needs several arguments.
/// Clones share one pending timer.
pub struct Debounced<A, S: Scheduler> {
    shared: Arc<Shared<A, S::Handle>>,
    scheduler: S,
    wait: Duration,
}

/// Wrap `func` so bursts of calls collapse into one trailing call
///
/// Fails with [`Error::InvalidArgument`] when `wait` is zero.
pub fn debounce<A, F, S>(func: F, wait: Duration, scheduler: S) -> Result<Debounced<A, S>>
where
    A: Send + 'static,
    F: Fn(A) + Send + Sync + 'static,
    S: Scheduler,
{
    if wait.is_zero() {
        return Err(Error::invalid("wait must be a positive number."));
    }

    Ok(Debounced {
        shared: Arc::new(Shared {
            func: Box::new(func),
            state: Mutex::new(DebounceState {
                generation: 0,
                pending: None,
            }),
        }),
        scheduler,
        wait,
    })
}

/// [`debounce`] with the wait given in milliseconds
pub fn debounce_ms<A, F, S>(func: F, wait_ms: u64, scheduler: S) -> Result<Debounced<A, S>>
where
    A: Send + 'static,
    F: Fn(A) + Send + Sync + 'static,
    S: Scheduler,
{
    debounce(func, Duration::from_millis(wait_ms), scheduler)
}

impl<A, S> Debounced<A, S>
where
    A: Send + 'static,
    S: Scheduler,
{
    /// Record `args` as the latest call and restart the wait
    ///
    /// Any call still waiting is dropped without running.
    pub fn call(&self, args: A) {
        let mut state = self.shared.state();
        state.generation += 1;
        let generation = state.generation;

        if let Some(previous) = state.pending.take() {
            log::debug!("Debounce reset, dropping pending call");
            self.scheduler.cancel(previous.handle);
        }

        let shared = Arc::clone(&self.shared);
        let handle = self
            .scheduler
            .schedule(self.wait, Box::new(move || shared.fire(generation)));

        state.pending = Some(Pending { handle, args });
        log::debug!("Debounced call {} scheduled in {:?}", generation, self.wait);
    }

    /// Whether a call is waiting for the window to elapse
    pub fn is_pending(&self) -> bool {
        self.shared.state().pending.is_some()
    }

    pub fn wait(&self) -> Duration {
        self.wait
    }
}

impl<A, S: Scheduler + Clone> Clone for Debounced<A, S> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            scheduler: self.scheduler.clone(),
            wait: self.wait,
        }
    }
}
