/// Integration tests for resilience library
use resilience::{
    presets,
    retry::{with_retry, RetryConfig, RetryError},
    timeout::{with_timeout, with_timeout_result, TimeoutError},
};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};

// ==================== Retry Tests ====================

#[tokio::test]
async fn test_retry_returns_last_error_after_budget() {
    let counter = Arc::new(AtomicU32::new(0));
    let counter_clone = counter.clone();

    let result = with_retry(RetryConfig::fixed(3, Duration::from_millis(1)), move || {
        let n = counter_clone.fetch_add(1, Ordering::SeqCst);
        async move { Err::<(), _>(format!("failure #{}", n)) }
    })
    .await;

    let err = assert_err!(result).into_inner();
    assert_eq!(err, "failure #2");
    assert_eq!(counter.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_retry_recovers_within_budget() {
    let counter = Arc::new(AtomicU32::new(0));
    let counter_clone = counter.clone();

    let result = with_retry(
        RetryConfig::exponential(3, Duration::from_millis(1), 2.0),
        move || {
            let n = counter_clone.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err("connection refused")
                } else {
                    Ok("connected")
                }
            }
        },
    )
    .await;

    assert_eq!(assert_ok!(result), "connected");
    assert_eq!(counter.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_single_attempt_budget_never_sleeps() {
    let start = std::time::Instant::now();
    let result = with_retry(RetryConfig::fixed(1, Duration::from_secs(10)), || async {
        Err::<(), _>("down")
    })
    .await;

    assert!(matches!(
        result,
        Err(RetryError::Exhausted { attempts: 1, .. })
    ));
    assert!(start.elapsed() < Duration::from_secs(1));
}

// ==================== Timeout Tests ====================

#[tokio::test]
async fn test_deadline_elapses_on_slow_operation() {
    let result = with_timeout_result(Duration::from_millis(20), async {
        tokio::time::sleep(Duration::from_secs(1)).await;
        Ok::<_, String>(())
    })
    .await;

    assert!(matches!(result, Err(TimeoutError::Elapsed(_))));
}

#[tokio::test]
async fn test_deadline_passes_through_fast_operation() {
    let value = assert_ok!(with_timeout(Duration::from_secs(1), async { 42 }).await);
    assert_eq!(value, 42);

    let result = with_timeout_result(Duration::from_secs(1), async {
        Err::<(), _>("rejected".to_string())
    })
    .await;
    assert!(matches!(result, Err(TimeoutError::OperationFailed(ref e)) if e == "rejected"));
}

// ==================== Preset Tests ====================

#[test]
fn test_presets_match_gateway_policies() {
    assert_eq!(presets::object_storage_connect().max_attempts, 5);
    assert_eq!(presets::database_connect().max_attempts, 10);
    assert_eq!(presets::metadata_write().max_attempts, 3);
    assert_eq!(
        presets::bus_publish_timeout().duration,
        Duration::from_secs(30)
    );
}
