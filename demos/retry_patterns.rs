//! Retry Patterns Example
//!
//! Demonstrates retry policies for fallible operations.
//! Shows practical patterns including:
//! - Basic retry with exponential backoff
//! - Conditional retry (retry_if)
//! - Retry with observability hooks
//! - Jitter and delay caps
//! - Async retry with cancellation
//!
//! Run with: cargo run --example retry_patterns --features async

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use stillwater_retry::prelude::*;
use stillwater_retry::RecordingSleeper;

// ==================== Basic Retry ====================

/// Example 1: Basic retry with exponential backoff
///
/// Demonstrates retrying an operation that fails transiently.
fn example_basic_retry() -> Result<(), PolicyError> {
    println!("\n=== Example 1: Basic Retry ===");

    let policy = RetryPolicy::new(5)?
        .with_initial_delay(Duration::from_millis(50))
        .with_backoff_multiplier(2.0)?;

    let mut attempts = 0;
    let result = RetryExecutor::new().run(&policy, || {
        attempts += 1;
        println!("  Attempt {}", attempts);
        if attempts < 3 {
            Err("transient failure")
        } else {
            Ok("success!")
        }
    });

    match result {
        Ok(value) => println!("Success after {} attempts: {}", attempts, value),
        Err(e) => println!("Failed after {} attempts: {}", attempts, e),
    }
    Ok(())
}

// ==================== Delay Schedules ====================

/// Example 2: Comparing delay schedules
///
/// Shows how the multiplier and cap shape the delays, without sleeping.
fn example_schedules() {
    println!("\n=== Example 2: Delay Schedules ===");

    let schedules = [
        ("constant", RetryConfig::new(6).with_initial_delay(Duration::from_millis(100))),
        (
            "exponential",
            RetryConfig::new(6)
                .with_initial_delay(Duration::from_millis(100))
                .with_backoff_multiplier(2.0),
        ),
        (
            "capped",
            RetryConfig::new(6)
                .with_initial_delay(Duration::from_millis(100))
                .with_backoff_multiplier(3.0)
                .with_max_delay(Duration::from_millis(500)),
        ),
        (
            "collapsing",
            RetryConfig::new(6)
                .with_initial_delay(Duration::from_millis(100))
                .with_backoff_multiplier(0.0),
        ),
    ];

    for (name, config) in &schedules {
        let delays: Vec<_> = config.delays().collect();
        println!("  {:<12} {:?}", name, delays);
    }
}

// ==================== Conditional Retry ====================

#[derive(Debug, Clone, PartialEq)]
enum ApiError {
    RateLimited,
    Unauthorized,
}

/// Example 3: Only retry transient errors
///
/// Permanent errors are returned at once, without using up attempts.
fn example_retry_if() -> Result<(), PolicyError> {
    println!("\n=== Example 3: Conditional Retry ===");

    let policy = RetryPolicy::new(5)?
        .with_initial_delay(Duration::from_millis(10))
        .retry_if(|e: &ApiError| *e == ApiError::RateLimited);

    let mut attempts = 0;
    let result: Result<(), _> = RetryExecutor::new().run(&policy, || {
        attempts += 1;
        if attempts == 1 {
            Err(ApiError::RateLimited)
        } else {
            Err(ApiError::Unauthorized)
        }
    });

    println!("  Result: {:?} after {} attempts", result, attempts);
    Ok(())
}

// ==================== Observability ====================

/// Example 4: Observing retries and jitter
///
/// The hook sees every retried failure and the delay about to be slept.
fn example_hooks() -> Result<(), PolicyError> {
    println!("\n=== Example 4: Retry Hooks ===");

    let policy = RetryPolicy::new(4)?
        .with_initial_delay(Duration::from_millis(100))
        .with_backoff_multiplier(2.0)?
        .with_jitter(Duration::from_millis(25))
        .on_retry(|event: &RetryEvent<'_, String>| {
            println!(
                "  Attempt {} failed: {}, retrying in {:?}",
                event.attempt, event.error, event.next_delay
            );
        });

    // Record the delays instead of waiting for them
    let sleeper = RecordingSleeper::new();
    let executor = RetryExecutor::new().with_sleeper(sleeper.clone());

    let result: Result<(), _> =
        executor.run(&policy, || Err("connection refused".to_string()));

    println!("  Final: {:?}", result);
    println!("  Total backoff: {:?}", sleeper.total());
    Ok(())
}

// ==================== Async ====================

/// Example 5: Async retry with a cancellation signal
async fn example_async() -> Result<(), PolicyError> {
    println!("\n=== Example 5: Async Retry ===");

    let policy = RetryPolicy::new(10)?.with_initial_delay(Duration::from_millis(200));
    let attempts = AtomicU32::new(0);
    let attempts = &attempts;

    let result: Result<(), _> = RetryExecutor::new()
        .run_async_until(
            &policy,
            move || async move {
                let n = attempts.fetch_add(1, Ordering::SeqCst) + 1;
                println!("  Async attempt {}", n);
                Err("service unavailable")
            },
            tokio::time::sleep(Duration::from_millis(500)),
        )
        .await;

    match result {
        Err(Interrupted::Cancelled { attempts }) => {
            println!("  Cancelled after {} attempts", attempts)
        }
        other => println!("  Result: {:?}", other),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), PolicyError> {
    println!("Retry Patterns Examples");
    println!("=======================");

    example_basic_retry()?;
    example_schedules();
    example_retry_if()?;
    example_hooks()?;
    example_async().await?;

    println!("\n=== All examples completed ===");
    Ok(())
}
