//! Exponential backoff with full jitter over a classified-transient error.
//! Grounded on `original_source/src/salvo/execution/retry.py`.

use std::future::Future;
use std::time::Duration;

use rand::Rng;

const BASE_SECONDS: f64 = 1.0;
const CAP_SECONDS: f64 = 30.0;
const DEFAULT_MAX_RETRIES: u32 = 3;

/// The outcome of a successful retried call: the result plus how many
/// retries were consumed and which transient-error-type names were seen
/// along the way.
pub struct RetryOutcome<T> {
    pub result: T,
    pub retries_used: u32,
    pub transient_errors_seen: Vec<&'static str>,
}

/// Runs `thunk` up to `max_retries + 1` times, sleeping `U(0, min(base *
/// 2^attempt, cap))` seconds between attempts when the previous error
/// classifies as transient. Re-raises the last error immediately on a
/// non-transient classification or once retries are exhausted.
pub async fn retry_with_backoff<T, E, F, Fut>(
    mut thunk: F,
    max_retries: Option<u32>,
    is_transient: impl Fn(&E) -> bool,
    transient_type_name: impl Fn(&E) -> &'static str,
) -> Result<RetryOutcome<T>, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let max_retries = max_retries.unwrap_or(DEFAULT_MAX_RETRIES);
    let mut retries_used = 0;
    let mut transient_errors_seen = Vec::new();

    loop {
        match thunk().await {
            Ok(result) => {
                return Ok(RetryOutcome {
                    result,
                    retries_used,
                    transient_errors_seen,
                })
            }
            Err(err) => {
                if !is_transient(&err) || retries_used >= max_retries {
                    return Err(err);
                }

                transient_errors_seen.push(transient_type_name(&err));

                let delay = (BASE_SECONDS * 2f64.powi(retries_used as i32)).min(CAP_SECONDS);
                let jittered = rand::thread_rng().gen_range(0.0..=delay);
                tokio::time::sleep(Duration::from_secs_f64(jittered)).await;

                retries_used += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug)]
    struct Transient;
    #[derive(Debug)]
    struct Permanent;

    #[tokio::test]
    async fn succeeds_without_retry_on_first_try() {
        let outcome = retry_with_backoff(
            || async { Ok::<_, Transient>(42) },
            Some(3),
            |_| true,
            |_| "timeout",
        )
        .await
        .unwrap();
        assert_eq!(outcome.result, 42);
        assert_eq!(outcome.retries_used, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_transient_then_succeeds() {
        let attempts = AtomicU32::new(0);
        let outcome = retry_with_backoff(
            || {
                let n = attempts.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(Transient)
                    } else {
                        Ok(7)
                    }
                }
            },
            Some(3),
            |_| true,
            |_| "timeout",
        )
        .await
        .unwrap();
        assert_eq!(outcome.result, 7);
        assert_eq!(outcome.retries_used, 2);
    }

    #[tokio::test]
    async fn propagates_non_transient_immediately() {
        let attempts = AtomicU32::new(0);
        let result = retry_with_backoff(
            || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err::<i32, _>(Permanent) }
            },
            Some(3),
            |_| false,
            |_| "other",
        )
        .await;
        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausts_retries_and_propagates() {
        let attempts = AtomicU32::new(0);
        let result = retry_with_backoff(
            || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err::<i32, _>(Transient) }
            },
            Some(2),
            |_| true,
            |_| "timeout",
        )
        .await;
        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }
}
