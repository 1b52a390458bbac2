//! Sleeping between attempts.
//!
//! The blocking executor never calls `std::thread::sleep` directly; it goes
//! through a [`Sleeper`], so tests and dry runs can observe the backoff
//! schedule without waiting for it.

use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Something that can wait for a duration.
pub trait Sleeper {
    /// Block the calling context for `delay`.
    fn sleep(&self, delay: Duration);
}

impl<S: Sleeper + ?Sized> Sleeper for &S {
    fn sleep(&self, delay: Duration) {
        (**self).sleep(delay)
    }
}

impl<S: Sleeper + ?Sized> Sleeper for Arc<S> {
    fn sleep(&self, delay: Duration) {
        (**self).sleep(delay)
    }
}

/// Sleeps on the calling thread. Other threads are unaffected.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, delay: Duration) {
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
    }
}

/// Adapts a closure into a [`Sleeper`].
///
/// # Examples
///
/// ```rust
/// use stillwater_retry::{FnSleeper, RetryExecutor, RetryPolicy};
/// use std::time::Duration;
///
/// let executor = RetryExecutor::new().with_sleeper(FnSleeper(|d: Duration| {
///     println!("would sleep for {:?}", d);
/// }));
///
/// let policy = RetryPolicy::<&str>::new(2).unwrap();
/// let mut calls = 0;
/// let result = executor.run(&policy, || {
///     calls += 1;
///     if calls == 1 { Err("flaky") } else { Ok(calls) }
/// });
/// assert_eq!(result, Ok(2));
/// ```
#[derive(Clone, Copy)]
pub struct FnSleeper<F>(pub F);

impl<F: Fn(Duration)> Sleeper for FnSleeper<F> {
    fn sleep(&self, delay: Duration) {
        (self.0)(delay)
    }
}

impl<F> std::fmt::Debug for FnSleeper<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("FnSleeper").field(&"<fn>").finish()
    }
}

/// Records every requested delay instead of sleeping.
///
/// Clones share the same record, so keep one clone and hand the other to the
/// executor.
///
/// # Examples
///
/// ```rust
/// use stillwater_retry::{RecordingSleeper, RetryExecutor, RetryPolicy};
/// use std::time::Duration;
///
/// let sleeper = RecordingSleeper::new();
/// let executor = RetryExecutor::new().with_sleeper(sleeper.clone());
/// let policy = RetryPolicy::<&str>::new(3)
///     .unwrap()
///     .with_initial_delay(Duration::from_secs(1))
///     .with_backoff_multiplier(2.0)
///     .unwrap();
///
/// let result: Result<(), _> = executor.run(&policy, || Err("down"));
///
/// assert_eq!(result, Err("down"));
/// assert_eq!(
///     sleeper.delays(),
///     vec![Duration::from_secs(1), Duration::from_secs(2)]
/// );
/// ```
#[derive(Debug, Clone, Default)]
pub struct RecordingSleeper {
    delays: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingSleeper {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// All delays requested so far, in order.
    pub fn delays(&self) -> Vec<Duration> {
        self.lock().clone()
    }

    /// Sum of all delays requested so far.
    pub fn total(&self) -> Duration {
        self.lock()
            .iter()
            .fold(Duration::ZERO, |acc, d| acc.saturating_add(*d))
    }

    /// Forget recorded delays.
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Duration>> {
        self.delays.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, delay: Duration) {
        self.lock().push(delay);
    }
}
