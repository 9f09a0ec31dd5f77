//! Range fetcher: one segment, one Range GET per attempt, retried with backoff.
//!
//! Each attempt opens a fresh store slot (so a retry overwrites rather than
//! appends), streams the body into it and commits only when the byte count
//! matches the segment length.

#[cfg(test)]
pub(crate) mod fake;
mod transport;

use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;

use crate::cancel::CancelToken;
use crate::retry::{run_with_retry, FetchError, RetryExhausted, RetryPolicy, Sleeper, ThreadSleeper};
use crate::segmenter::Segment;
use crate::store::SegmentStore;

pub use transport::{
    BodySink, CurlOptions, CurlTransport, RangeRequest, Transport, DEFAULT_READ_INCREMENT,
    DEFAULT_REQUEST_TIMEOUT, LOW_SPEED_LIMIT, TRANSFER_SAFETY_TIMEOUT,
};
pub(crate) use transport::{header_list, parse_status_line};

/// Statuses whose body is segment data.
fn is_content_status(code: u32) -> bool {
    code == 200 || code == 206
}

pub struct RangeFetcher {
    transport: Arc<dyn Transport>,
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl RangeFetcher {
    pub fn new(transport: Arc<dyn Transport>, policy: RetryPolicy) -> Self {
        Self {
            transport,
            policy,
            sleeper: Arc::new(ThreadSleeper),
        }
    }

    /// Replace the backoff sleeper (tests use one that records instead of sleeping).
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Fetch `segment` into `store`, retrying transient failures.
    /// Returns the number of bytes committed.
    pub fn fetch(
        &self,
        url: &str,
        headers: &HashMap<String, String>,
        segment: &Segment,
        store: &dyn SegmentStore,
        cancel: &CancelToken,
    ) -> Result<u64, RetryExhausted> {
        run_with_retry(&self.policy, self.sleeper.as_ref(), cancel, |attempt| {
            tracing::debug!(
                segment = segment.index,
                attempt,
                range = %segment.range_header_value(),
                "fetching segment"
            );
            self.attempt(url, headers, segment, store, cancel)
        })
    }

    fn attempt(
        &self,
        url: &str,
        headers: &HashMap<String, String>,
        segment: &Segment,
        store: &dyn SegmentStore,
        cancel: &CancelToken,
    ) -> Result<u64, FetchError> {
        let mut slot = store.put(segment.index).map_err(FetchError::Storage)?;
        let expected = segment.len();
        let mut received = 0u64;
        let request = RangeRequest {
            url,
            headers,
            segment,
        };

        let status = self.transport.get_range(
            &request,
            &mut |status: u32, data: &[u8]| {
                if !is_content_status(status) {
                    // error page body; the status decides the outcome below
                    return Ok(());
                }
                let next = received + data.len() as u64;
                if next > expected {
                    return Err(FetchError::UnexpectedFullContent { expected, status });
                }
                slot.write_all(data).map_err(FetchError::Storage)?;
                received = next;
                Ok(())
            },
            cancel,
        )?;

        if !is_content_status(status) {
            return Err(FetchError::Http(status));
        }
        if received != expected {
            return Err(FetchError::PartialTransfer { expected, received });
        }
        let committed = slot.commit().map_err(FetchError::Storage)?;
        tracing::debug!(segment = segment.index, bytes = committed, status, "segment done");
        Ok(committed)
    }
}
