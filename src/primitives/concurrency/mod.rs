//! Cooperative cancellation, worker configuration and per-search counters.
//!
//! Searches never consult ambient globals: every entry point receives a
//! [`SearchContext`] holding the worker count, the cancellation token and an
//! optional seed. The only shared mutable state is the token itself, an atomic
//! flag that workers poll at every search node.

use std::ops::AddAssign;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tracing::{debug, warn};

use crate::types::{DejavuError, Result};

/// Shared cooperative cancellation flag.
///
/// Cloning yields another handle to the same flag. A cancelled token stays
/// cancelled until [`CancelToken::reset`] is called; callers must reset it
/// before starting a new top-level search.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Creates a token in the "not cancelled" state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation of every search observing this token.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    /// Clears a previous cancellation request.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::Release);
    }

    /// Returns `true` once [`CancelToken::cancel`] has been called.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

/// Settings read at the start of every search call.
#[derive(Clone, Debug)]
pub struct SearchContext {
    threads: usize,
    cancel: CancelToken,
    seed: Option<u64>,
}

impl Default for SearchContext {
    fn default() -> Self {
        Self {
            threads: 1,
            cancel: CancelToken::new(),
            seed: None,
        }
    }
}

impl SearchContext {
    /// Creates a single-threaded, unseeded context with a fresh token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of worker threads. Zero is rejected.
    pub fn with_threads(mut self, threads: usize) -> Result<Self> {
        if threads == 0 {
            return Err(DejavuError::invalid("worker count must be at least 1"));
        }
        self.threads = threads;
        Ok(self)
    }

    /// Shares an existing cancellation token.
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Fixes the random seed so randomized searches are reproducible.
    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    /// Number of worker threads.
    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Cancellation token polled by the search loops.
    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Configured seed, if any.
    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// Returns `true` if the search should unwind.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolves the base seed for one call: the configured seed or fresh entropy.
    pub(crate) fn base_seed(&self) -> u64 {
        self.seed.unwrap_or_else(rand::random)
    }

    /// Runs `op` with access to the worker pool.
    ///
    /// With a single worker `op` runs inline on the calling thread; otherwise it
    /// runs inside a dedicated rayon pool so `par_iter` calls inside `op` fan out
    /// to exactly `threads` workers.
    pub(crate) fn install<R, F>(&self, op: F) -> R
    where
        F: FnOnce() -> R + Send,
        R: Send,
    {
        if self.threads <= 1 {
            return op();
        }
        match rayon::ThreadPoolBuilder::new()
            .num_threads(self.threads)
            .thread_name(|idx| format!("dejavu-worker-{idx}"))
            .build()
        {
            Ok(pool) => pool.install(op),
            Err(err) => {
                warn!(error = %err, "worker pool unavailable; running inline");
                op()
            }
        }
    }
}

/// Counters accumulated by one search call.
///
/// Each worker keeps its own instance; instances are merged with `+=` once the
/// workers finish, so no counter is shared between threads.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SearchStats {
    /// Search-tree nodes refined.
    pub nodes: u64,
    /// Vertices moved while splitting cells during refinement.
    pub color_cost: u64,
    /// Leaves compared against a reference leaf.
    pub leaves: u64,
    /// Random walks started.
    pub probes: u64,
}

impl AddAssign for SearchStats {
    fn add_assign(&mut self, rhs: Self) {
        self.nodes += rhs.nodes;
        self.color_cost += rhs.color_cost;
        self.leaves += rhs.leaves;
        self.probes += rhs.probes;
    }
}

/// Timer that cancels a token once a wall-clock budget is exhausted.
///
/// The watchdog runs on its own thread, independent of the search. Disarming
/// (or dropping) it wakes the timer thread and joins it.
pub struct Watchdog {
    inner: Arc<WatchdogInner>,
    thread: Option<JoinHandle<()>>,
}

struct WatchdogInner {
    disarmed: Mutex<bool>,
    wake: Condvar,
    fired: AtomicBool,
}

impl Watchdog {
    /// Starts a timer that cancels `token` after `timeout`.
    pub fn arm(token: CancelToken, timeout: Duration) -> Result<Self> {
        let inner = Arc::new(WatchdogInner {
            disarmed: Mutex::new(false),
            wake: Condvar::new(),
            fired: AtomicBool::new(false),
        });
        let timer = Arc::clone(&inner);
        let thread = thread::Builder::new()
            .name("dejavu-watchdog".into())
            .spawn(move || {
                let deadline = Instant::now() + timeout;
                let mut disarmed = timer.disarmed.lock();
                while !*disarmed {
                    if timer.wake.wait_until(&mut disarmed, deadline).timed_out() {
                        if !*disarmed {
                            warn!(timeout_ms = timeout.as_millis() as u64, "search timed out");
                            timer.fired.store(true, Ordering::Release);
                            token.cancel();
                        }
                        break;
                    }
                }
            })?;
        Ok(Self {
            inner,
            thread: Some(thread),
        })
    }

    /// Returns `true` if the timeout elapsed and the token was cancelled.
    pub fn fired(&self) -> bool {
        self.inner.fired.load(Ordering::Acquire)
    }

    /// Stops the timer without cancelling. Returns whether it had already fired.
    pub fn disarm(mut self) -> bool {
        self.stop();
        self.fired()
    }

    fn stop(&mut self) {
        {
            let mut disarmed = self.inner.disarmed.lock();
            *disarmed = true;
        }
        self.inner.wake.notify_all();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                debug!("watchdog thread panicked");
            }
        }
    }
}

impl Drop for Watchdog {
    fn drop(&mut self) {
        self.stop();
    }
}
