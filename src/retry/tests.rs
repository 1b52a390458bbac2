//! Integration tests for the retry executor.

use super::*;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn recording_executor() -> (RetryExecutor<RecordingSleeper>, RecordingSleeper) {
    let sleeper = RecordingSleeper::new();
    let executor = RetryExecutor::new().with_sleeper(sleeper.clone()).with_seed(7);
    (executor, sleeper)
}

/// Collects `(attempt, error)` pairs passed to the observer.
fn observed<E: Clone + Send + 'static>(
    policy: RetryPolicy<E>,
) -> (RetryPolicy<E>, Arc<Mutex<Vec<(u32, E)>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let policy = policy.on_retry({
        let seen = seen.clone();
        move |event: &RetryEvent<'_, E>| {
            seen.lock().unwrap().push((event.attempt, event.error.clone()));
        }
    });
    (policy, seen)
}

#[test]
fn test_immediate_success() {
    let (executor, sleeper) = recording_executor();
    let (policy, seen) = observed(RetryPolicy::<String>::new(5).unwrap());
    let mut calls = 0;

    let result = executor.run(&policy, || {
        calls += 1;
        Ok::<_, String>(42)
    });

    assert_eq!(result, Ok(42));
    assert_eq!(calls, 1);
    assert!(sleeper.delays().is_empty());
    assert!(seen.lock().unwrap().is_empty());
}

#[test]
fn test_succeeds_within_budget() {
    let (executor, sleeper) = recording_executor();
    let policy = RetryPolicy::new(5).unwrap();
    let mut calls = 0;

    let result = executor.run(&policy, || {
        calls += 1;
        if calls <= 3 {
            Err("transient failure")
        } else {
            Ok("success")
        }
    });

    assert_eq!(result, Ok("success"));
    assert_eq!(calls, 4);
    assert_eq!(sleeper.delays().len(), 3);
}

#[test]
fn test_exhaustion_returns_final_error() {
    let (executor, sleeper) = recording_executor();
    let (policy, seen) = observed(RetryPolicy::new(4).unwrap());
    let mut calls = 0;

    let result: Result<(), _> = executor.run(&policy, || {
        calls += 1;
        Err(format!("failure #{}", calls))
    });

    assert_eq!(result, Err("failure #4".to_string()));
    assert_eq!(calls, 4);
    // No delay and no observer call after the final attempt
    assert_eq!(sleeper.delays().len(), 3);
    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            (1, "failure #1".to_string()),
            (2, "failure #2".to_string()),
            (3, "failure #3".to_string()),
        ]
    );
}

#[test]
fn test_classifier_short_circuits() {
    #[derive(Debug, PartialEq, Clone)]
    enum TestError {
        Transient(u32),
        Permanent(u32),
    }

    let (executor, sleeper) = recording_executor();
    let (policy, seen) = observed(
        RetryPolicy::new(5)
            .unwrap()
            .retry_if(|err: &TestError| matches!(err, TestError::Transient(_))),
    );
    let mut calls = 0;

    let result: Result<(), _> = executor.run(&policy, || {
        calls += 1;
        if calls == 1 {
            Err(TestError::Transient(calls))
        } else {
            Err(TestError::Permanent(calls))
        }
    });

    assert_eq!(result, Err(TestError::Permanent(2)));
    assert_eq!(calls, 2);
    assert_eq!(sleeper.delays().len(), 1);
    // The non-retryable failure is not observed
    assert_eq!(*seen.lock().unwrap(), vec![(1, TestError::Transient(1))]);
}

#[test]
fn test_non_retryable_first_failure() {
    let (executor, sleeper) = recording_executor();
    let policy = RetryPolicy::new(3).unwrap().retry_if(|code: &u16| *code >= 500);
    let mut calls = 0;

    let result: Result<(), _> = executor.run(&policy, || {
        calls += 1;
        Err(404)
    });

    assert_eq!(result, Err(404));
    assert_eq!(calls, 1);
    assert!(sleeper.delays().is_empty());
}

#[test]
fn test_backoff_arithmetic_without_jitter() {
    let (executor, sleeper) = recording_executor();
    let policy = RetryPolicy::new(3)
        .unwrap()
        .with_initial_delay(Duration::from_secs(1))
        .with_backoff_multiplier(2.0)
        .unwrap()
        .with_max_delay(Duration::from_secs(1000));
    let mut calls = 0;

    let result = executor.run(&policy, || {
        calls += 1;
        if calls < 3 {
            Err("retry")
        } else {
            Ok("ok")
        }
    });

    assert_eq!(result, Ok("ok"));
    assert_eq!(calls, 3);
    assert_eq!(
        sleeper.delays(),
        vec![Duration::from_secs(1), Duration::from_secs(2)]
    );
}

#[test]
fn test_delay_cap_holds_under_growth() {
    let (executor, sleeper) = recording_executor();
    let policy = RetryPolicy::new(50)
        .unwrap()
        .with_initial_delay(Duration::from_secs(1))
        .with_backoff_multiplier(3.0)
        .unwrap()
        .with_max_delay(Duration::from_secs(5))
        .with_jitter(Duration::from_secs(2));

    let result: Result<(), _> = executor.run(&policy, || Err("always"));

    assert_eq!(result, Err("always"));
    let delays = sleeper.delays();
    assert_eq!(delays.len(), 49);
    assert!(delays.iter().all(|d| *d <= Duration::from_secs(5)));
    assert_eq!(delays.last(), Some(&Duration::from_secs(5)));
}

#[test]
fn test_single_attempt() {
    let (executor, sleeper) = recording_executor();
    let (policy, seen) = observed(
        RetryPolicy::new(1)
            .unwrap()
            .with_initial_delay(Duration::from_secs(10)),
    );
    let mut calls = 0;

    let result: Result<(), _> = executor.run(&policy, || {
        calls += 1;
        Err("only once")
    });

    assert_eq!(result, Err("only once"));
    assert_eq!(calls, 1);
    assert!(sleeper.delays().is_empty());
    assert!(seen.lock().unwrap().is_empty());
}

#[test]
fn test_zero_multiplier_collapses_delay() {
    let (executor, sleeper) = recording_executor();
    let policy = RetryPolicy::new(4)
        .unwrap()
        .with_initial_delay(Duration::from_millis(500))
        .with_backoff_multiplier(0.0)
        .unwrap();

    let result: Result<(), _> = executor.run(&policy, || Err("down"));

    assert_eq!(result, Err("down"));
    assert_eq!(
        sleeper.delays(),
        vec![Duration::from_millis(500), Duration::ZERO, Duration::ZERO]
    );
}

#[test]
fn test_observer_sees_delay_before_sleep() {
    let (executor, sleeper) = recording_executor();
    let observed_delays = Arc::new(Mutex::new(Vec::new()));
    let policy = RetryPolicy::new(3)
        .unwrap()
        .with_initial_delay(Duration::from_millis(10))
        .with_jitter(Duration::from_millis(10))
        .on_retry({
            let observed_delays = observed_delays.clone();
            let sleeper = sleeper.clone();
            move |event: &RetryEvent<'_, &str>| {
                // Called before the sleeper records this delay
                assert_eq!(sleeper.delays().len() as u32, event.attempt - 1);
                observed_delays.lock().unwrap().push(event.next_delay);
            }
        });

    let result: Result<(), _> = executor.run(&policy, || Err("down"));

    assert!(result.is_err());
    assert_eq!(*observed_delays.lock().unwrap(), sleeper.delays());
}

#[test]
fn test_jitter_stays_within_bounds() {
    let (executor, sleeper) = recording_executor();
    let policy = RetryPolicy::new(20)
        .unwrap()
        .with_initial_delay(Duration::from_millis(100))
        .with_jitter(Duration::from_millis(50));

    let _: Result<(), _> = executor.run(&policy, || Err("down"));

    for delay in sleeper.delays() {
        assert!(delay >= Duration::from_millis(100));
        assert!(delay < Duration::from_millis(150));
    }
}

#[test]
fn test_seeded_executor_is_deterministic() {
    let policy = RetryPolicy::new(10)
        .unwrap()
        .with_initial_delay(Duration::from_millis(10))
        .with_jitter(Duration::from_millis(100));

    let first = RecordingSleeper::new();
    let second = RecordingSleeper::new();
    let _: Result<(), _> = RetryExecutor::new()
        .with_sleeper(first.clone())
        .with_seed(99)
        .run(&policy, || Err("down"));
    let _: Result<(), _> = RetryExecutor::new()
        .with_sleeper(second.clone())
        .with_seed(99)
        .run(&policy, || Err("down"));

    assert_eq!(first.delays(), second.delays());
}

#[test]
fn test_run_with_caller_rng() {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    let (executor, sleeper) = recording_executor();
    let policy = RetryPolicy::new(3)
        .unwrap()
        .with_jitter(Duration::from_millis(10));
    let mut rng = StdRng::seed_from_u64(1);

    let result: Result<(), _> = executor.run_with_rng(&policy, || Err("down"), &mut rng);

    assert_eq!(result, Err("down"));
    assert_eq!(sleeper.delays().len(), 2);
    assert!(sleeper
        .delays()
        .iter()
        .all(|d| *d < Duration::from_millis(10)));
}

#[test]
fn test_policy_reused_across_threads() {
    let policy = RetryPolicy::new(3).unwrap();
    let total_calls = AtomicU32::new(0);

    std::thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                let (executor, sleeper) = recording_executor();
                let mut calls = 0;
                let result = executor.run(&policy, || {
                    calls += 1;
                    total_calls.fetch_add(1, Ordering::SeqCst);
                    if calls < 2 {
                        Err("flaky")
                    } else {
                        Ok(calls)
                    }
                });
                assert_eq!(result, Ok(2));
                assert_eq!(sleeper.delays().len(), 1);
            });
        }
    });

    assert_eq!(total_calls.load(Ordering::SeqCst), 8);
}

#[test]
#[should_panic(expected = "observer failed")]
fn test_panicking_observer_abandons_loop() {
    let (executor, _sleeper) = recording_executor();
    let policy = RetryPolicy::new(3)
        .unwrap()
        .on_retry(|_: &RetryEvent<'_, &str>| panic!("observer failed"));

    let _: Result<(), _> = executor.run(&policy, || Err("down"));
}

#[test]
fn test_retry_free_function() {
    let policy = RetryPolicy::new(2).unwrap();
    let mut calls = 0;

    let result = retry(&policy, || {
        calls += 1;
        if calls == 1 {
            Err("first")
        } else {
            Ok("second")
        }
    });

    assert_eq!(result, Ok("second"));
}

#[test]
fn test_thread_sleeper_actually_waits() {
    use std::time::Instant;

    let policy = RetryPolicy::new(3)
        .unwrap()
        .with_initial_delay(Duration::from_millis(10))
        .with_backoff_multiplier(2.0)
        .unwrap();
    let start = Instant::now();

    let result: Result<(), _> = RetryExecutor::new().run(&policy, || Err("down"));

    assert!(result.is_err());
    // 10ms + 20ms
    assert!(
        start.elapsed() >= Duration::from_millis(30),
        "Expected at least 30ms, got {:?}",
        start.elapsed()
    );
}

#[cfg(feature = "tracing")]
mod tracing_tests {
    use super::*;
    use tracing_test::traced_test;

    #[traced_test]
    #[test]
    fn test_logs_retry_decisions() {
        let (executor, _sleeper) = recording_executor();
        let policy = RetryPolicy::new(2).unwrap();

        let _: Result<(), _> = executor.run(&policy, || Err("down"));

        assert!(logs_contain("attempt failed, retrying"));
        assert!(logs_contain("retry attempts exhausted"));
    }

    #[traced_test]
    #[test]
    fn test_logs_non_retryable_failure() {
        let (executor, _sleeper) = recording_executor();
        let policy = RetryPolicy::new(3).unwrap().retry_if(|_: &&str| false);

        let _: Result<(), _> = executor.run(&policy, || Err("fatal"));

        assert!(logs_contain("non-retryable failure"));
    }
}

#[cfg(feature = "async")]
mod async_tests {
    use super::*;

    #[tokio::test]
    async fn test_run_async_succeeds_on_third_attempt() {
        let attempts = AtomicU32::new(0);
        let attempts = &attempts;
        let policy = RetryPolicy::new(5)
            .unwrap()
            .with_initial_delay(Duration::from_millis(1));

        let result = RetryExecutor::new()
            .run_async(&policy, move || async move {
                let n = attempts.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err("transient failure")
                } else {
                    Ok("success")
                }
            })
            .await;

        assert_eq!(result, Ok("success"));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_async_exhaustion_and_backoff_timing() {
        let attempts = AtomicU32::new(0);
        let attempts = &attempts;
        let policy = RetryPolicy::new(4)
            .unwrap()
            .with_initial_delay(Duration::from_secs(1))
            .with_backoff_multiplier(2.0)
            .unwrap();
        let start = tokio::time::Instant::now();

        let result: Result<(), _> = RetryExecutor::new()
            .run_async(&policy, move || async move {
                let n = attempts.fetch_add(1, Ordering::SeqCst);
                Err(n + 1)
            })
            .await;

        assert_eq!(result, Err(4));
        // 1s + 2s + 4s
        assert_eq!(start.elapsed(), Duration::from_secs(7));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_async_elapsed_follows_paused_clock() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let recorder = Arc::clone(&seen);
        let policy = RetryPolicy::new(3)
            .unwrap()
            .with_initial_delay(Duration::from_secs(1))
            .with_backoff_multiplier(2.0)
            .unwrap()
            .on_retry(move |event: &RetryEvent<'_, &'static str>| {
                recorder.lock().unwrap().push(event.elapsed);
            });

        let result: Result<(), _> = RetryExecutor::new()
            .run_async(&policy, || async { Err("down") })
            .await;

        assert_eq!(result, Err("down"));
        assert_eq!(
            *seen.lock().unwrap(),
            vec![Duration::ZERO, Duration::from_secs(1)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_async_until_elapsed_follows_paused_clock() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let recorder = Arc::clone(&seen);
        let policy = RetryPolicy::new(3)
            .unwrap()
            .with_initial_delay(Duration::from_secs(5))
            .on_retry(move |event: &RetryEvent<'_, &'static str>| {
                recorder.lock().unwrap().push(event.elapsed);
            });

        let result: Result<(), _> = RetryExecutor::new()
            .run_async_until(
                &policy,
                || async { Err("down") },
                std::future::pending::<()>(),
            )
            .await;

        assert!(matches!(result, Err(Interrupted::Failed("down"))));
        assert_eq!(
            *seen.lock().unwrap(),
            vec![Duration::ZERO, Duration::from_secs(5)]
        );
    }

    #[tokio::test]
    async fn test_retry_async_classifier() {
        let policy = RetryPolicy::new(5).unwrap().retry_if(|e: &&str| *e != "fatal");
        let attempts = AtomicU32::new(0);
        let attempts = &attempts;

        let result: Result<(), _> = retry_async(&policy, move || async move {
            attempts.fetch_add(1, Ordering::SeqCst);
            Err("fatal")
        })
        .await;

        assert_eq!(result, Err("fatal"));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_async_until_cancels_during_backoff() {
        let attempts = AtomicU32::new(0);
        let attempts = &attempts;
        let policy = RetryPolicy::new(5)
            .unwrap()
            .with_initial_delay(Duration::from_secs(60));

        let result: Result<(), _> = RetryExecutor::new()
            .run_async_until(
                &policy,
                move || async move {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    Err("down")
                },
                tokio::time::sleep(Duration::from_secs(1)),
            )
            .await;

        assert_eq!(result, Err(Interrupted::Cancelled { attempts: 1 }));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_async_until_passes_through_failure() {
        let policy = RetryPolicy::new(3)
            .unwrap()
            .with_initial_delay(Duration::from_millis(10));

        let result: Result<(), _> = RetryExecutor::new()
            .run_async_until(
                &policy,
                || async { Err("down") },
                tokio::time::sleep(Duration::from_secs(3600)),
            )
            .await;

        assert_eq!(result, Err(Interrupted::Failed("down")));
    }

    #[tokio::test]
    async fn test_run_async_until_success() {
        let policy = RetryPolicy::<&str>::new(3).unwrap();

        let result = RetryExecutor::new()
            .run_async_until(&policy, || async { Ok(7) }, std::future::pending())
            .await;

        assert_eq!(result, Ok(7));
    }
}
