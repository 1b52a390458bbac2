//! Demonstrates tracing output from the retry executor
//!
//! Run with: cargo run --example tracing_demo --features tracing

use std::time::Duration;

use stillwater_retry::{RetryExecutor, RetryPolicy};

#[derive(Debug)]
enum FetchError {
    Timeout,
    NotFound,
}

fn main() -> Result<(), stillwater_retry::PolicyError> {
    // Set up tracing subscriber
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    tracing::info!("Starting tracing demo");

    let policy = RetryPolicy::new(4)?
        .with_initial_delay(Duration::from_millis(20))
        .with_backoff_multiplier(2.0)?
        .retry_if(|e: &FetchError| matches!(e, FetchError::Timeout));
    let executor = RetryExecutor::new();

    // Transient failures, then success
    let mut calls = 0;
    let result = executor.run(&policy, || {
        calls += 1;
        if calls < 3 {
            Err(FetchError::Timeout)
        } else {
            Ok(calls)
        }
    });
    tracing::info!("Flaky fetch result: {:?}", result);

    // Permanent failure is not retried
    let result: Result<(), _> = executor.run(&policy, || Err(FetchError::NotFound));
    tracing::info!("Missing fetch result: {:?}", result);

    // Every attempt times out
    let result: Result<(), _> = executor.run(&policy, || Err(FetchError::Timeout));
    match result {
        Ok(()) => tracing::info!("Unexpected success"),
        Err(e) => tracing::error!("Gave up: {:?}", e),
    }

    Ok(())
}
