//! Retry policies and the executor that applies them.
//!
//! This module follows the "pure core, imperative shell" split:
//!
//! - **Pure Core**: [`RetryConfig`] and [`RetryPolicy`] are just data and
//!   predicates. No side effects, easily tested and shared.
//! - **Imperative Shell**: [`RetryExecutor`] calls the operation, sleeps,
//!   and draws jitter, through injectable [`Sleeper`] and `rand::Rng`
//!   collaborators.
//!
//! # Quick Start
//!
//! ```rust
//! use stillwater_retry::{RetryExecutor, RetryPolicy};
//! use std::time::Duration;
//!
//! let policy = RetryPolicy::new(4)?
//!     .with_initial_delay(Duration::from_millis(1))
//!     .with_backoff_multiplier(2.0)?
//!     .with_max_delay(Duration::from_millis(10));
//!
//! let mut calls = 0;
//! let value = RetryExecutor::new().run(&policy, || {
//!     calls += 1;
//!     if calls < 3 { Err("flaky") } else { Ok(calls) }
//! });
//!
//! assert_eq!(value, Ok(3));
//! # Ok::<(), stillwater_retry::PolicyError>(())
//! ```
//!
//! # Delay Schedule
//!
//! Before attempt `n + 1` the executor sleeps for
//! `min(current + uniform[0, jitter), max_delay)`, where `current` starts at
//! `initial_delay` and is multiplied by `backoff_multiplier` after every
//! retry. A multiplier of `1.0` gives a constant delay; `0.0` gives one
//! delay and then none.
//!
//! The final attempt is never followed by a delay, and its failure is
//! returned without being passed to the observer.
//!
//! # Error Types
//!
//! - [`PolicyError`]: returned when building an invalid policy
//! - [`Interrupted`]: returned by cancellable async runs

mod config;
mod error;
mod executor;
mod policy;
#[cfg(feature = "serde")]
mod serde_impl;
mod sleep;

pub use config::{RetryConfig, DEFAULT_BACKOFF_MULTIPLIER, DEFAULT_MAX_DELAY};
pub use error::{Interrupted, PolicyError};
#[cfg(feature = "async")]
pub use executor::retry_async;
pub use executor::{retry, RetryExecutor};
pub use policy::{RetryEvent, RetryPolicy};
pub use sleep::{FnSleeper, RecordingSleeper, Sleeper, ThreadSleeper};

#[cfg(test)]
mod tests;
