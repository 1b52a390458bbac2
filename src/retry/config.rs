//! Retry configuration data.

use std::time::Duration;

use super::error::PolicyError;

/// Default growth factor: constant delay.
pub const DEFAULT_BACKOFF_MULTIPLIER: f64 = 1.0;

/// Default cap on a single delay: 30 minutes.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(30 * 60);

/// The data half of a retry policy.
///
/// `RetryConfig` holds only plain values, so it can be compared, cloned,
/// and (with the `serde` feature) loaded from configuration files. Behavior
/// such as the retry classifier and the observer hook lives on
/// [`RetryPolicy`](super::RetryPolicy), which is built from a config.
///
/// # Examples
///
/// ```rust
/// use stillwater_retry::RetryConfig;
/// use std::time::Duration;
///
/// let config = RetryConfig::new(4)
///     .with_initial_delay(Duration::from_millis(100))
///     .with_backoff_multiplier(2.0)
///     .with_max_delay(Duration::from_millis(300));
///
/// assert!(config.validate().is_ok());
///
/// // Delays before attempts 2, 3 and 4, ignoring jitter
/// let delays: Vec<_> = config.delays().collect();
/// assert_eq!(
///     delays,
///     vec![
///         Duration::from_millis(100),
///         Duration::from_millis(200),
///         Duration::from_millis(300), // capped
///     ]
/// );
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Total number of attempts, including the first one. Must be at least 1.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub initial_delay: Duration,
    /// Factor applied to the delay after each failed attempt.
    pub backoff_multiplier: f64,
    /// Upper bound on any single delay, applied after jitter.
    pub max_delay: Duration,
    /// Upper bound (exclusive) of the random extra delay added to each wait.
    pub jitter: Duration,
}

impl RetryConfig {
    /// Create a config with `max_attempts` total attempts and default timing.
    ///
    /// Defaults: no initial delay, multiplier `1.0`, 30 minute cap, no jitter.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_delay: Duration::ZERO,
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
            max_delay: DEFAULT_MAX_DELAY,
            jitter: Duration::ZERO,
        }
    }

    /// Set the delay before the second attempt.
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Set the backoff multiplier.
    ///
    /// `1.0` keeps the delay constant. `0.0` drops it to zero after the first
    /// retry.
    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Set the cap on a single delay.
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Set the jitter bound.
    pub fn with_jitter(mut self, jitter: Duration) -> Self {
        self.jitter = jitter;
        self
    }

    /// Check that the config describes a usable policy.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use stillwater_retry::{PolicyError, RetryConfig};
    ///
    /// assert_eq!(RetryConfig::new(0).validate(), Err(PolicyError::ZeroAttempts));
    /// assert_eq!(
    ///     RetryConfig::new(3).with_backoff_multiplier(-1.0).validate(),
    ///     Err(PolicyError::InvalidMultiplier(-1.0))
    /// );
    /// ```
    pub fn validate(&self) -> Result<(), PolicyError> {
        if self.max_attempts == 0 {
            return Err(PolicyError::ZeroAttempts);
        }
        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 0.0 {
            return Err(PolicyError::InvalidMultiplier(self.backoff_multiplier));
        }
        Ok(())
    }

    /// The jitter-free delay schedule: one entry per retry.
    ///
    /// Yields `max_attempts - 1` delays, each already capped by `max_delay`.
    pub fn delays(&self) -> impl Iterator<Item = Duration> + '_ {
        (1..self.max_attempts).scan(self.initial_delay, move |current, _| {
            let delay = (*current).min(self.max_delay);
            *current = self.grow(*current);
            Some(delay)
        })
    }

    /// Apply the backoff multiplier to a delay, saturating at `Duration::MAX`.
    pub(crate) fn grow(&self, delay: Duration) -> Duration {
        scale(delay, self.backoff_multiplier)
    }

    /// Add jitter to `current` and cap the result.
    pub(crate) fn jittered<R: rand::Rng>(&self, current: Duration, rng: &mut R) -> Duration {
        let delay = if self.jitter.is_zero() {
            current
        } else {
            // Whole nanoseconds keep the upper bound exclusive.
            let bound = u64::try_from(self.jitter.as_nanos()).unwrap_or(u64::MAX);
            current.saturating_add(Duration::from_nanos(rng.random_range(0..bound)))
        };
        delay.min(self.max_delay)
    }
}

fn scale(delay: Duration, factor: f64) -> Duration {
    // Integral factors stay exact.
    if factor.fract() == 0.0 && factor <= f64::from(u32::MAX) {
        return delay.checked_mul(factor as u32).unwrap_or(Duration::MAX);
    }
    Duration::try_from_secs_f64(delay.as_secs_f64() * factor).unwrap_or(Duration::MAX)
}
