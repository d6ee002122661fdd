//! Retry loop: run a closure until success or policy says stop.

use super::classify;
use super::policy::{RetryDecision, RetryPolicy};
use crate::error::DownloadError;

/// Runs a transfer closure until it succeeds or the retry policy says to stop.
/// On retryable failure, sleeps for the backoff duration then tries again.
pub fn run_with_retry<T, F>(policy: &RetryPolicy, mut f: F) -> Result<T, DownloadError>
where
    F: FnMut() -> Result<T, DownloadError>,
{
    let mut attempt = 1u32;
    loop {
        match f() {
            Ok(v) => return Ok(v),
            Err(e) => {
                let kind = classify::classify(&e);
                match policy.decide(attempt, kind) {
                    RetryDecision::NoRetry => return Err(e),
                    RetryDecision::RetryAfter(d) => {
                        tracing::debug!(attempt, ?kind, delay_ms = d.as_millis() as u64, "retrying transfer: {}", e);
                        std::thread::sleep(d);
                        attempt += 1;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::time::Duration;

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
        }
    }

    #[test]
    fn retries_throttling_until_success() {
        let calls = Cell::new(0);
        let out = run_with_retry(&fast_policy(5), || {
            calls.set(calls.get() + 1);
            if calls.get() < 3 {
                Err(DownloadError::Http(503))
            } else {
                Ok(7)
            }
        })
        .unwrap();
        assert_eq!(out, 7);
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn does_not_retry_not_found() {
        let calls = Cell::new(0);
        let err = run_with_retry(&fast_policy(5), || -> Result<(), _> {
            calls.set(calls.get() + 1);
            Err(DownloadError::Http(404))
        })
        .unwrap_err();
        assert!(matches!(err, DownloadError::Http(404)));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn gives_up_after_max_attempts() {
        let calls = Cell::new(0);
        let err = run_with_retry(&fast_policy(2), || -> Result<(), _> {
            calls.set(calls.get() + 1);
            Err(DownloadError::Http(500))
        })
        .unwrap_err();
        assert!(matches!(err, DownloadError::Http(500)));
        assert_eq!(calls.get(), 2);
    }
}
