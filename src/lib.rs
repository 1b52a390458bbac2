//! # Stillwater Retry
//!
//! > *"Still waters run pure"*
//!
//! Retry policies for fallible operations: bounded attempts, multiplicative
//! backoff, delay caps, jitter, retry classifiers and observer hooks.
//!
//! ## Philosophy
//!
//! A retry policy is **data**. It describes how many times to try, how long
//! to wait, and which failures are worth another attempt. The
//! [`RetryExecutor`] is the only piece that acts on it: it calls the
//! operation, sleeps, and returns either the first success or the failure
//! that ended the run, unwrapped.
//!
//! ## Quick Example
//!
//! ```rust
//! use stillwater_retry::{RecordingSleeper, RetryExecutor, RetryPolicy};
//! use std::time::Duration;
//!
//! #[derive(Debug, PartialEq)]
//! enum HttpError {
//!     Unavailable,
//!     BadRequest,
//! }
//!
//! let policy = RetryPolicy::new(5)?
//!     .with_initial_delay(Duration::from_millis(100))
//!     .with_backoff_multiplier(2.0)?
//!     .retry_if(|e: &HttpError| *e == HttpError::Unavailable);
//!
//! let sleeper = RecordingSleeper::new();
//! let executor = RetryExecutor::new().with_sleeper(sleeper.clone());
//!
//! // Permanent failures are returned immediately
//! let mut calls = 0;
//! let result: Result<(), _> = executor.run(&policy, || {
//!     calls += 1;
//!     if calls == 1 { Err(HttpError::Unavailable) } else { Err(HttpError::BadRequest) }
//! });
//!
//! assert_eq!(result, Err(HttpError::BadRequest));
//! assert_eq!(calls, 2);
//! assert_eq!(sleeper.delays(), vec![Duration::from_millis(100)]);
//! # Ok::<(), stillwater_retry::PolicyError>(())
//! ```
//!
//! ## Features
//!
//! - `async`: [`RetryExecutor::run_async`] and cancellable
//!   [`RetryExecutor::run_async_until`] on tokio
//! - `tracing`: debug events for every retry decision
//! - `serde`: load [`RetryConfig`] from configuration files

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod retry;

// Re-exports
#[cfg(feature = "async")]
pub use retry::retry_async;
pub use retry::{
    retry, FnSleeper, Interrupted, PolicyError, RecordingSleeper, RetryConfig, RetryEvent,
    RetryExecutor, RetryPolicy, Sleeper, ThreadSleeper,
};

/// Prelude module for convenient imports
pub mod prelude {
    #[cfg(feature = "async")]
    pub use crate::retry::retry_async;
    pub use crate::retry::{
        retry, Interrupted, PolicyError, RetryConfig, RetryEvent, RetryExecutor, RetryPolicy,
        Sleeper,
    };
}
