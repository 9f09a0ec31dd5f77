//! Retry loop: run a closure until success or policy says stop.

use std::fmt;
use std::time::Duration;

use super::classify::classify;
use super::error::FetchError;
use super::policy::{RetryDecision, RetryPolicy};
use crate::cancel::CancelToken;

/// Waits out a backoff delay. Implementations must return early when `cancel` fires.
pub trait Sleeper: Send + Sync {
    /// Returns `false` if the wait was interrupted by cancellation.
    fn sleep(&self, delay: Duration, cancel: &CancelToken) -> bool;
}

/// Real sleeper: blocks the calling worker thread on the cancel token.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, delay: Duration, cancel: &CancelToken) -> bool {
        !cancel.wait_timeout(delay)
    }
}

/// The last error after the retry budget ran out (or a non-retryable error).
#[derive(Debug)]
pub struct RetryExhausted {
    /// Attempts made, including the one that produced `last`.
    pub attempts: u32,
    pub last: FetchError,
}

impl fmt::Display for RetryExhausted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (after {} attempt(s))", self.last, self.attempts)
    }
}

impl std::error::Error for RetryExhausted {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.last)
    }
}

/// Runs `f` until it succeeds or the retry policy says to stop.
///
/// `f` receives the 1-based attempt number. On a retryable failure the
/// `sleeper` waits for the backoff; cancellation ends the loop with
/// `FetchError::Cancelled`.
pub fn run_with_retry<T, F>(
    policy: &RetryPolicy,
    sleeper: &dyn Sleeper,
    cancel: &CancelToken,
    mut f: F,
) -> Result<T, RetryExhausted>
where
    F: FnMut(u32) -> Result<T, FetchError>,
{
    let mut attempt = 1u32;
    loop {
        if cancel.is_cancelled() {
            return Err(RetryExhausted {
                attempts: attempt - 1,
                last: FetchError::Cancelled,
            });
        }
        match f(attempt) {
            Ok(v) => return Ok(v),
            Err(e) => {
                if e.is_cancelled() {
                    return Err(RetryExhausted { attempts: attempt, last: e });
                }
                let kind = classify(&e);
                match policy.decide(attempt, kind) {
                    RetryDecision::NoRetry => {
                        return Err(RetryExhausted { attempts: attempt, last: e });
                    }
                    RetryDecision::RetryAfter(d) => {
                        tracing::warn!(attempt, ?kind, delay_ms = d.as_millis() as u64, error = %e, "retrying");
                        if !sleeper.sleep(d, cancel) {
                            return Err(RetryExhausted {
                                attempts: attempt,
                                last: FetchError::Cancelled,
                            });
                        }
                        attempt += 1;
                    }
                }
            }
        }
    }
}
