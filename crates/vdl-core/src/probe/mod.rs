//! Size probe: a HEAD request that confirms `Content-Length` and range support
//! before a download is planned.

mod parse;

use std::collections::HashMap;
use std::str;

use crate::cancel::CancelToken;
use crate::error::DownloadError;
use crate::fetcher::{header_list, parse_status_line, CurlOptions};
use crate::retry::{run_with_retry, FetchError, RetryExhausted, RetryPolicy, ThreadSleeper};

/// Response metadata needed to plan a segmented download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadResult {
    /// Total size in bytes, if `Content-Length` is present.
    pub content_length: Option<u64>,
    /// True if the server sent `Accept-Ranges: bytes`.
    pub accept_ranges: bool,
}

/// Performs a HEAD request and returns parsed metadata.
///
/// Follows redirects; only the final response's headers are parsed. Any
/// non-2xx final status is `FetchError::Http`. Blocks the current thread.
pub fn probe(
    url: &str,
    headers: &HashMap<String, String>,
    options: &CurlOptions,
) -> Result<HeadResult, FetchError> {
    let mut lines: Vec<String> = Vec::new();

    let mut easy = curl::easy::Easy::new();
    easy.url(url).map_err(FetchError::Curl)?;
    easy.nobody(true).map_err(FetchError::Curl)?;
    options.apply_probe(&mut easy).map_err(FetchError::Curl)?;
    if !headers.is_empty() {
        easy.http_headers(header_list(headers).map_err(FetchError::Curl)?)
            .map_err(FetchError::Curl)?;
    }

    {
        let mut transfer = easy.transfer();
        transfer
            .header_function(|data| {
                // each redirect hop starts a fresh header block
                if parse_status_line(data).is_some() {
                    lines.clear();
                }
                if let Ok(s) = str::from_utf8(data) {
                    lines.push(s.trim_end().to_string());
                }
                true
            })
            .map_err(FetchError::Curl)?;
        transfer.perform().map_err(FetchError::Curl)?;
    }

    let code = easy.response_code().map_err(FetchError::Curl)?;
    if !(200..300).contains(&code) {
        return Err(FetchError::Http(code));
    }
    let head = parse::parse_headers(&lines);
    tracing::debug!(
        url,
        content_length = ?head.content_length,
        accept_ranges = head.accept_ranges,
        "probed resource"
    );
    Ok(head)
}

/// `probe` under `policy`: throttling and network errors are retried with
/// backoff, other statuses fail at once.
pub fn probe_with_retry(
    url: &str,
    headers: &HashMap<String, String>,
    options: &CurlOptions,
    policy: &RetryPolicy,
    cancel: &CancelToken,
) -> Result<HeadResult, RetryExhausted> {
    run_with_retry(policy, &ThreadSleeper, cancel, |attempt| {
        tracing::debug!(url, attempt, "probing size");
        probe(url, headers, options)
    })
}

/// The usable total size from a probe, or `InvalidPlan` when the server did
/// not report a positive length.
pub fn require_total_size(head: &HeadResult) -> Result<u64, DownloadError> {
    match head.content_length {
        Some(n) if n > 0 => Ok(n),
        Some(_) => Err(DownloadError::InvalidPlan(
            "server reported an empty resource".to_string(),
        )),
        None => Err(DownloadError::InvalidPlan(
            "server did not report Content-Length".to_string(),
        )),
    }
}
