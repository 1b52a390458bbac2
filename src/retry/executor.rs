//! The retry loop.

use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::policy::{RetryEvent, RetryPolicy};
use super::sleep::{Sleeper, ThreadSleeper};

/// Runs fallible operations under a [`RetryPolicy`].
///
/// The executor holds only its collaborators: a [`Sleeper`] used by the
/// blocking [`run`](Self::run), and an optional seed for the jitter
/// generator. Each run owns its own attempt counter and delay, so one
/// executor can serve any number of concurrent runs.
///
/// # Examples
///
/// ```rust
/// use stillwater_retry::{RetryExecutor, RetryPolicy};
/// use std::time::Duration;
///
/// let policy = RetryPolicy::new(3)?
///     .with_initial_delay(Duration::from_millis(1));
///
/// let mut attempts = 0;
/// let result = RetryExecutor::new().run(&policy, || {
///     attempts += 1;
///     if attempts < 3 { Err("not yet") } else { Ok("done") }
/// });
///
/// assert_eq!(result, Ok("done"));
/// assert_eq!(attempts, 3);
/// # Ok::<(), stillwater_retry::PolicyError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct RetryExecutor<S = ThreadSleeper> {
    sleeper: S,
    seed: Option<u64>,
}

impl RetryExecutor {
    /// Create an executor that sleeps on the calling thread and seeds jitter
    /// from the operating system.
    pub fn new() -> Self {
        Self::default()
    }
}

impl<S> RetryExecutor<S> {
    /// Replace the sleeper used by [`run`](Self::run).
    pub fn with_sleeper<S2: Sleeper>(self, sleeper: S2) -> RetryExecutor<S2> {
        RetryExecutor {
            sleeper,
            seed: self.seed,
        }
    }

    /// Seed the jitter generator.
    ///
    /// Every run starts a fresh generator from this seed, so two runs with
    /// the same policy and the same failures sleep for the same delays.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// The sleeper used between blocking attempts.
    pub fn sleeper(&self) -> &S {
        &self.sleeper
    }

    fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        }
    }
}

impl<S: Sleeper> RetryExecutor<S> {
    /// Call `operation` until it succeeds, fails with a non-retryable error,
    /// or runs out of attempts.
    ///
    /// Returns the first success, or the failure that ended the run. The
    /// failure is never wrapped: on exhaustion it is the error from the final
    /// attempt, and a non-retryable error is returned as soon as it occurs.
    pub fn run<T, E, F>(&self, policy: &RetryPolicy<E>, operation: F) -> Result<T, E>
    where
        F: FnMut() -> Result<T, E>,
    {
        let mut rng = self.rng();
        self.run_with_rng(policy, operation, &mut rng)
    }

    /// Like [`run`](Self::run), drawing jitter from a caller-owned generator.
    pub fn run_with_rng<T, E, F, R>(
        &self,
        policy: &RetryPolicy<E>,
        mut operation: F,
        rng: &mut R,
    ) -> Result<T, E>
    where
        F: FnMut() -> Result<T, E>,
        R: Rng,
    {
        let start = Instant::now();
        let mut state = RetryState::new(policy);

        loop {
            let error = match operation() {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };

            match state.on_failure(policy, &error, start.elapsed(), rng) {
                Some(delay) => self.sleeper.sleep(delay),
                None => return Err(error),
            }
        }
    }
}

/// Run `operation` under `policy` with a default [`RetryExecutor`].
///
/// # Examples
///
/// ```rust
/// use stillwater_retry::{retry, RetryPolicy};
///
/// let policy = RetryPolicy::new(1)?;
/// let result: Result<(), _> = retry(&policy, || Err("no second chance"));
///
/// assert_eq!(result, Err("no second chance"));
/// # Ok::<(), stillwater_retry::PolicyError>(())
/// ```
pub fn retry<T, E, F>(policy: &RetryPolicy<E>, operation: F) -> Result<T, E>
where
    F: FnMut() -> Result<T, E>,
{
    RetryExecutor::new().run(policy, operation)
}

#[cfg(feature = "async")]
mod async_impl {
    use std::future::Future;

    use futures::future::{self, Either};
    use tokio::time::Instant;

    use super::*;
    use crate::retry::error::Interrupted;

    impl<S> RetryExecutor<S> {
        /// Async version of [`run`](RetryExecutor::run).
        ///
        /// `make_attempt` is called once per attempt to produce a fresh
        /// future. Backoff uses `tokio::time::sleep`, suspending only the
        /// calling task; the executor's [`Sleeper`] is not used.
        /// [`RetryEvent::elapsed`] is measured on tokio's clock, so it
        /// follows a paused or advanced test runtime.
        ///
        /// # Examples
        ///
        /// ```rust
        /// use stillwater_retry::{RetryExecutor, RetryPolicy};
        /// use std::sync::atomic::{AtomicU32, Ordering};
        /// use std::time::Duration;
        ///
        /// # tokio_test::block_on(async {
        /// let policy = RetryPolicy::new(3)
        ///     .unwrap()
        ///     .with_initial_delay(Duration::from_millis(1));
        /// let attempts = AtomicU32::new(0);
        /// let attempts = &attempts;
        ///
        /// let result = RetryExecutor::new()
        ///     .run_async(&policy, move || async move {
        ///         if attempts.fetch_add(1, Ordering::SeqCst) == 0 {
        ///             Err("cold start")
        ///         } else {
        ///             Ok(42)
        ///         }
        ///     })
        ///     .await;
        ///
        /// assert_eq!(result, Ok(42));
        /// # });
        /// ```
        pub async fn run_async<T, E, F, Fut>(
            &self,
            policy: &RetryPolicy<E>,
            mut make_attempt: F,
        ) -> Result<T, E>
        where
            F: FnMut() -> Fut,
            Fut: Future<Output = Result<T, E>>,
        {
            let start = Instant::now();
            let mut rng = self.rng();
            let mut state = RetryState::new(policy);

            loop {
                let error = match make_attempt().await {
                    Ok(value) => return Ok(value),
                    Err(error) => error,
                };

                match state.on_failure(policy, &error, start.elapsed(), &mut rng) {
                    Some(delay) => tokio::time::sleep(delay).await,
                    None => return Err(error),
                }
            }
        }

        /// Like [`run_async`](RetryExecutor::run_async), abandoning the loop
        /// if `cancel` completes while waiting between attempts.
        ///
        /// Cancellation is only observed during backoff sleeps; an attempt
        /// in flight always runs to completion.
        ///
        /// # Errors
        ///
        /// - [`Interrupted::Failed`] with the failure that ended the run.
        /// - [`Interrupted::Cancelled`] if `cancel` fired during a sleep.
        pub async fn run_async_until<T, E, F, Fut, C>(
            &self,
            policy: &RetryPolicy<E>,
            mut make_attempt: F,
            cancel: C,
        ) -> Result<T, Interrupted<E>>
        where
            F: FnMut() -> Fut,
            Fut: Future<Output = Result<T, E>>,
            C: Future<Output = ()>,
        {
            let mut cancel = std::pin::pin!(cancel);
            let start = Instant::now();
            let mut rng = self.rng();
            let mut state = RetryState::new(policy);

            loop {
                let error = match make_attempt().await {
                    Ok(value) => return Ok(value),
                    Err(error) => error,
                };

                let Some(delay) = state.on_failure(policy, &error, start.elapsed(), &mut rng)
                else {
                    return Err(Interrupted::Failed(error));
                };

                let sleep = std::pin::pin!(tokio::time::sleep(delay));
                if let Either::Right(_) = future::select(sleep, cancel.as_mut()).await {
                    let attempts = state.attempt - 1;
                    #[cfg(feature = "tracing")]
                    tracing::debug!(attempts, "retry cancelled during backoff");
                    return Err(Interrupted::Cancelled { attempts });
                }
            }
        }
    }

    /// Run `make_attempt` under `policy` with a default [`RetryExecutor`].
    pub async fn retry_async<T, E, F, Fut>(policy: &RetryPolicy<E>, make_attempt: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        RetryExecutor::new().run_async(policy, make_attempt).await
    }
}

#[cfg(feature = "async")]
pub use async_impl::retry_async;

/// Per-run bookkeeping: which attempt just ran and the next base delay.
///
/// The run's clock belongs to the caller: `std::time::Instant` for blocking
/// runs, `tokio::time::Instant` for async ones.
struct RetryState {
    attempt: u32,
    current_delay: Duration,
}

impl RetryState {
    fn new<E>(policy: &RetryPolicy<E>) -> Self {
        Self {
            attempt: 1,
            current_delay: policy.config().initial_delay,
        }
    }

    /// Decide what to do after attempt `self.attempt` failed with `error`,
    /// `elapsed` after the run started.
    ///
    /// Returns the delay to sleep before the next attempt, or `None` if the
    /// error should be returned to the caller.
    fn on_failure<E, R: Rng>(
        &mut self,
        policy: &RetryPolicy<E>,
        error: &E,
        elapsed: Duration,
        rng: &mut R,
    ) -> Option<Duration> {
        let config = policy.config();

        if self.attempt >= config.max_attempts {
            #[cfg(feature = "tracing")]
            tracing::debug!(attempt = self.attempt, "retry attempts exhausted");
            return None;
        }
        if !policy.is_retryable(error) {
            #[cfg(feature = "tracing")]
            tracing::debug!(attempt = self.attempt, "non-retryable failure");
            return None;
        }

        let delay = config.jittered(self.current_delay, rng);

        #[cfg(feature = "tracing")]
        tracing::debug!(
            attempt = self.attempt,
            max_attempts = config.max_attempts,
            delay = ?delay,
            "attempt failed, retrying"
        );

        policy.notify(&RetryEvent {
            attempt: self.attempt,
            error,
            next_delay: delay,
            elapsed,
        });

        self.current_delay = config.grow(self.current_delay);
        self.attempt += 1;
        Some(delay)
    }
}
