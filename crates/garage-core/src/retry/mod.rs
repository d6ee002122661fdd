//! Retry and backoff policy for the curl transport.
//!
//! Classifies transfer failures (timeouts, throttling, connection
//! failures) and decides exponential backoff, so the downloader can retry
//! transient errors before the cache sees a failure.

mod classify;
mod policy;
mod run;

pub use classify::{classify, classify_curl_error, classify_http_status};
pub use policy::{ErrorKind, RetryDecision, RetryPolicy};
pub use run::run_with_retry;
