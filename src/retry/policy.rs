//! Retry policy types.

use std::sync::Arc;
use std::time::Duration;

use super::config::RetryConfig;
use super::error::PolicyError;

type Classifier<E> = Arc<dyn Fn(&E) -> bool + Send + Sync>;
type Observer<E> = Arc<dyn Fn(&RetryEvent<'_, E>) + Send + Sync>;

/// A retry policy describing how to retry failed operations.
///
/// A policy combines a validated [`RetryConfig`] with two optional pieces of
/// behavior: a classifier deciding which failures are worth retrying, and an
/// observer called before each retry. Once built, a policy is immutable and
/// can be shared across threads and reused for any number of runs.
///
/// Construction validates the config, so holding a `RetryPolicy` means
/// `max_attempts >= 1` and the multiplier is finite and non-negative.
///
/// # Examples
///
/// ```rust
/// use stillwater_retry::{RetryPolicy, RetryEvent};
/// use std::time::Duration;
///
/// #[derive(Debug)]
/// enum FetchError {
///     Timeout,
///     NotFound,
/// }
///
/// let policy = RetryPolicy::new(5)?
///     .with_initial_delay(Duration::from_millis(100))
///     .with_backoff_multiplier(2.0)?
///     .with_max_delay(Duration::from_secs(2))
///     .retry_if(|e: &FetchError| matches!(e, FetchError::Timeout))
///     .on_retry(|event: &RetryEvent<'_, FetchError>| {
///         eprintln!("attempt {} failed: {:?}", event.attempt, event.error);
///     });
///
/// assert_eq!(policy.max_attempts(), 5);
/// assert!(policy.is_retryable(&FetchError::Timeout));
/// assert!(!policy.is_retryable(&FetchError::NotFound));
/// # Ok::<(), stillwater_retry::PolicyError>(())
/// ```
pub struct RetryPolicy<E> {
    config: RetryConfig,
    retryable: Option<Classifier<E>>,
    on_retry: Option<Observer<E>>,
}

/// Information about a failed attempt, passed to the `on_retry` observer.
///
/// The observer only sees failures that are about to be retried; the final
/// failure of a run is returned to the caller instead.
#[derive(Debug, Clone)]
pub struct RetryEvent<'a, E> {
    /// Which attempt just failed (1-indexed).
    pub attempt: u32,
    /// The error from the failed attempt.
    pub error: &'a E,
    /// Delay before the next attempt.
    pub next_delay: Duration,
    /// Total elapsed time since the first attempt started.
    pub elapsed: Duration,
}

impl<E> RetryPolicy<E> {
    /// Create a policy allowing `max_attempts` total attempts.
    ///
    /// All other settings take the [`RetryConfig::new`] defaults and every
    /// failure is considered retryable.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::ZeroAttempts`] if `max_attempts` is zero.
    pub fn new(max_attempts: u32) -> Result<Self, PolicyError> {
        Self::from_config(RetryConfig::new(max_attempts))
    }

    /// Build a policy from configuration data.
    ///
    /// # Errors
    ///
    /// Returns the first problem found by [`RetryConfig::validate`].
    pub fn from_config(config: RetryConfig) -> Result<Self, PolicyError> {
        config.validate()?;
        Ok(Self {
            config,
            retryable: None,
            on_retry: None,
        })
    }

    /// Set the delay before the second attempt.
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.config.initial_delay = delay;
        self
    }

    /// Set the factor applied to the delay after each failed attempt.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::InvalidMultiplier`] for negative, NaN or
    /// infinite values.
    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Result<Self, PolicyError> {
        self.config.backoff_multiplier = multiplier;
        self.config.validate()?;
        Ok(self)
    }

    /// Set the cap on any single delay.
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.config.max_delay = delay;
        self
    }

    /// Add a random extra delay in `[0, jitter)` to each wait.
    pub fn with_jitter(mut self, jitter: Duration) -> Self {
        self.config.jitter = jitter;
        self
    }

    /// Only retry failures for which `predicate` returns true.
    ///
    /// Any other failure is returned immediately, without consuming the
    /// remaining attempts.
    pub fn retry_if<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.retryable = Some(Arc::new(predicate));
        self
    }

    /// Call `observer` after each retried failure, before sleeping.
    ///
    /// The observer cannot influence the retry loop. If it panics, the panic
    /// unwinds out of the executor and the loop is abandoned.
    pub fn on_retry<H>(mut self, observer: H) -> Self
    where
        H: Fn(&RetryEvent<'_, E>) + Send + Sync + 'static,
    {
        self.on_retry = Some(Arc::new(observer));
        self
    }

    /// The configuration data behind this policy.
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Total number of attempts allowed.
    pub fn max_attempts(&self) -> u32 {
        self.config.max_attempts
    }

    /// Whether `error` should trigger another attempt.
    pub fn is_retryable(&self, error: &E) -> bool {
        self.retryable.as_ref().is_none_or(|p| p(error))
    }

    /// Returns true if an observer is installed.
    pub fn has_observer(&self) -> bool {
        self.on_retry.is_some()
    }

    pub(crate) fn notify(&self, event: &RetryEvent<'_, E>) {
        if let Some(observer) = &self.on_retry {
            observer(event);
        }
    }
}

impl<E> Clone for RetryPolicy<E> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            retryable: self.retryable.clone(),
            on_retry: self.on_retry.clone(),
        }
    }
}

impl<E> std::fmt::Debug for RetryPolicy<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("config", &self.config)
            .field("retry_if", &self.retryable.is_some())
            .field("on_retry", &self.on_retry.is_some())
            .finish_non_exhaustive()
    }
}
