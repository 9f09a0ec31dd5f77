//! HTTP transport for single Range GETs.
//!
//! `Transport` is the seam between the fetcher's retry/commit logic and the
//! wire. `CurlTransport` is the libcurl implementation; tests swap in a fake.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::str;
use std::time::Duration;

use crate::cancel::CancelToken;
use crate::retry::FetchError;
use crate::segmenter::Segment;

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Default bytes per streaming read.
pub const DEFAULT_READ_INCREMENT: usize = 8 * 1024;

/// One Range GET to issue.
#[derive(Debug, Clone, Copy)]
pub struct RangeRequest<'a> {
    pub url: &'a str,
    pub headers: &'a HashMap<String, String>,
    pub segment: &'a Segment,
}

/// Receives body bytes as they arrive, together with the response status
/// they belong to. Returning an error aborts the transfer with that error.
pub type BodySink<'s> = dyn FnMut(u32, &[u8]) -> Result<(), FetchError> + 's;

pub trait Transport: Send + Sync {
    /// Perform one Range GET, streaming the body into `sink`. Returns the
    /// final HTTP status. Must stop promptly once `cancel` fires.
    fn get_range(
        &self,
        request: &RangeRequest<'_>,
        sink: &mut BodySink<'_>,
        cancel: &CancelToken,
    ) -> Result<u32, FetchError>;
}

/// libcurl tuning shared by the range GET and the size probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurlOptions {
    /// Connect timeout, and how long a segment transfer may stall below
    /// `LOW_SPEED_LIMIT` before it is aborted. Hard limit for the size probe.
    /// Exceeding it is a retryable timeout.
    pub request_timeout: Duration,
    /// Receive buffer size; bounds how much body one write callback sees.
    pub read_increment: usize,
}

impl Default for CurlOptions {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            read_increment: DEFAULT_READ_INCREMENT,
        }
    }
}

/// Bytes per second below which a segment transfer counts as stalled.
pub const LOW_SPEED_LIMIT: u32 = 1024;

/// Wall-clock cap on one segment transfer so a trickling connection eventually fails.
pub const TRANSFER_SAFETY_TIMEOUT: Duration = Duration::from_secs(3600);

impl CurlOptions {
    /// Segment GET: stall detection instead of a wall-clock limit, so large
    /// segments on slow but steady links complete.
    pub(crate) fn apply_transfer(&self, easy: &mut curl::easy::Easy) -> Result<(), curl::Error> {
        easy.follow_location(true)?;
        easy.connect_timeout(self.request_timeout)?;
        easy.low_speed_limit(LOW_SPEED_LIMIT)?;
        easy.low_speed_time(self.request_timeout)?;
        easy.timeout(TRANSFER_SAFETY_TIMEOUT)?;
        easy.buffer_size(self.read_increment)?;
        Ok(())
    }

    /// HEAD probe: no body, so the whole request is bounded by `request_timeout`.
    pub(crate) fn apply_probe(&self, easy: &mut curl::easy::Easy) -> Result<(), curl::Error> {
        easy.follow_location(true)?;
        easy.connect_timeout(self.request_timeout)?;
        easy.timeout(self.request_timeout)?;
        Ok(())
    }
}

/// Builds the custom header list. `Range` is owned by the transport and skipped.
pub(crate) fn header_list(headers: &HashMap<String, String>) -> Result<curl::easy::List, curl::Error> {
    let mut list = curl::easy::List::new();
    for (k, v) in headers {
        let name = k.trim();
        if name.eq_ignore_ascii_case("range") {
            continue;
        }
        list.append(&format!("{}: {}", name, v.trim()))?;
    }
    Ok(list)
}

/// Status code from a response status line (`HTTP/1.1 206 Partial Content`).
pub(crate) fn parse_status_line(line: &[u8]) -> Option<u32> {
    let line = str::from_utf8(line).ok()?;
    if !line.starts_with("HTTP/") {
        return None;
    }
    line.split_whitespace().nth(1)?.parse().ok()
}

#[derive(Debug, Clone, Default)]
pub struct CurlTransport {
    options: CurlOptions,
}

impl CurlTransport {
    pub fn new(options: CurlOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &CurlOptions {
        &self.options
    }
}

impl Transport for CurlTransport {
    fn get_range(
        &self,
        request: &RangeRequest<'_>,
        sink: &mut BodySink<'_>,
        cancel: &CancelToken,
    ) -> Result<u32, FetchError> {
        let status = Cell::new(0u32);
        let sink_error: RefCell<Option<FetchError>> = RefCell::new(None);

        let mut easy = curl::easy::Easy::new();
        easy.url(request.url).map_err(FetchError::Curl)?;
        self.options.apply_transfer(&mut easy).map_err(FetchError::Curl)?;
        easy.range(&request.segment.curl_range())
            .map_err(FetchError::Curl)?;
        easy.progress(true).map_err(FetchError::Curl)?;
        if !request.headers.is_empty() {
            easy.http_headers(header_list(request.headers).map_err(FetchError::Curl)?)
                .map_err(FetchError::Curl)?;
        }

        {
            let mut transfer = easy.transfer();
            transfer
                .header_function(|line| {
                    if let Some(code) = parse_status_line(line) {
                        status.set(code);
                    }
                    true
                })
                .map_err(FetchError::Curl)?;
            transfer
                .write_function(|data| {
                    if cancel.is_cancelled() {
                        sink_error.replace(Some(FetchError::Cancelled));
                        return Ok(0);
                    }
                    match sink(status.get(), data) {
                        Ok(()) => Ok(data.len()),
                        Err(e) => {
                            sink_error.replace(Some(e));
                            Ok(0)
                        }
                    }
                })
                .map_err(FetchError::Curl)?;
            transfer
                .progress_function(|_, _, _, _| !cancel.is_cancelled())
                .map_err(FetchError::Curl)?;

            if let Err(e) = transfer.perform() {
                if let Some(err) = sink_error.borrow_mut().take() {
                    return Err(err);
                }
                if cancel.is_cancelled() {
                    return Err(FetchError::Cancelled);
                }
                return Err(FetchError::Curl(e));
            }
        }

        easy.response_code().map_err(FetchError::Curl)
    }
}
