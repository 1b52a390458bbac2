//! Error types for retry operations.
//!
//! Operation failures are never wrapped by the blocking executor: the final
//! failure is returned to the caller as-is. The types here cover the two
//! cases that are not operation failures: an invalid policy, and an async
//! retry loop that was cancelled while waiting.

/// Error returned when a retry policy is misconfigured.
///
/// Policies are validated when they are built, so an executor never sees an
/// invalid policy and never invokes an operation under one.
///
/// # Examples
///
/// ```rust
/// use stillwater_retry::{PolicyError, RetryPolicy};
///
/// let err = RetryPolicy::<String>::new(0).unwrap_err();
/// assert_eq!(err, PolicyError::ZeroAttempts);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PolicyError {
    /// `max_attempts` was zero. At least one attempt is required.
    ZeroAttempts,
    /// The backoff multiplier was negative, NaN or infinite.
    InvalidMultiplier(f64),
}

impl std::fmt::Display for PolicyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ZeroAttempts => write!(f, "max_attempts must be at least 1"),
            Self::InvalidMultiplier(m) => write!(
                f,
                "backoff_multiplier must be finite and non-negative, got {}",
                m
            ),
        }
    }
}

impl std::error::Error for PolicyError {}

/// Error returned by a cancellable retry loop.
///
/// Either the operation failed (and that failure is carried verbatim), or the
/// loop was cancelled while sleeping between attempts.
///
/// # Examples
///
/// ```rust
/// use stillwater_retry::Interrupted;
///
/// let err: Interrupted<&str> = Interrupted::Cancelled { attempts: 2 };
/// assert!(err.is_cancelled());
/// assert_eq!(err.into_failure(), None);
///
/// let err = Interrupted::Failed("boom");
/// assert_eq!(err.into_failure(), Some("boom"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interrupted<E> {
    /// The retry loop was cancelled during a backoff sleep.
    Cancelled {
        /// Attempts made before cancellation.
        attempts: u32,
    },
    /// The operation failed and the failure was not retried.
    Failed(E),
}

impl<E> Interrupted<E> {
    /// Returns true if the loop was cancelled.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// Returns true if this carries an operation failure.
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// Get the operation failure if present.
    pub fn into_failure(self) -> Option<E> {
        match self {
            Self::Failed(e) => Some(e),
            Self::Cancelled { .. } => None,
        }
    }
}

impl<E: std::fmt::Display> std::fmt::Display for Interrupted<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cancelled { attempts } => {
                write!(f, "retry cancelled after {} attempts", attempts)
            }
            Self::Failed(e) => write!(f, "{}", e),
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for Interrupted<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Cancelled { .. } => None,
            Self::Failed(e) => Some(e),
        }
    }
}
