//! Retry and backoff policy.
//!
//! Error classification (timeouts, throttling, connection failures) and the
//! linear backoff decision live here so the range fetcher and the size probe
//! share one policy.

mod classify;
mod error;
mod policy;
mod run;

pub use classify::{classify, classify_curl_error, classify_http_status};
pub use error::FetchError;
pub use policy::{ErrorKind, RetryDecision, RetryPolicy};
pub use run::{run_with_retry, RetryExhausted, Sleeper, ThreadSleeper};

#[cfg(test)]
pub(crate) use run::testing;
