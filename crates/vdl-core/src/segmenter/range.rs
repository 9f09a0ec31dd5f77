//! Download plan, segment type and range planning.

use std::collections::HashMap;

use crate::error::DownloadError;

/// Default bytes per segment (8 MiB).
pub const DEFAULT_SEGMENT_SIZE: u64 = 8 * 1024 * 1024;

/// Everything the scheduler needs to fetch one resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadPlan {
    /// Directly fetchable resource URL.
    pub resource_url: String,
    /// Authoritative byte length of the resource.
    pub total_size: u64,
    /// Bytes per segment; the last segment may be shorter.
    pub segment_size: u64,
    /// Request headers required by the origin. Opaque to the engine.
    pub headers: HashMap<String, String>,
}

impl DownloadPlan {
    pub fn new(
        resource_url: impl Into<String>,
        total_size: u64,
        segment_size: u64,
        headers: HashMap<String, String>,
    ) -> Self {
        Self {
            resource_url: resource_url.into(),
            total_size,
            segment_size,
            headers,
        }
    }

    /// Number of segments: `ceil(total_size / segment_size)`, 0 for an empty resource.
    pub fn segment_count(&self) -> usize {
        if self.total_size == 0 || self.segment_size == 0 {
            return 0;
        }
        self.total_size.div_ceil(self.segment_size) as usize
    }

    /// Checks the plan can be scheduled and returns its segment count.
    pub fn validate(&self) -> Result<usize, DownloadError> {
        if self.segment_size == 0 {
            return Err(DownloadError::InvalidPlan(
                "segment size must be positive".to_string(),
            ));
        }
        if self.total_size == 0 {
            return Err(DownloadError::InvalidPlan(
                "total size is zero or unknown".to_string(),
            ));
        }
        Ok(self.segment_count())
    }

    /// All segments of this plan in index order.
    pub fn segments(&self) -> Vec<Segment> {
        plan_segments(self.total_size, self.segment_size)
    }
}

/// A single segment: inclusive byte range `[start, end]` of the resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub index: usize,
    /// First byte offset (inclusive).
    pub start: u64,
    /// Last byte offset (inclusive).
    pub end: u64,
}

impl Segment {
    /// Length of this segment in bytes.
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// HTTP Range header value: `bytes=start-end`.
    pub fn range_header_value(&self) -> String {
        format!("bytes={}", self.curl_range())
    }

    /// Range in the form libcurl expects (`start-end`, no unit prefix).
    pub fn curl_range(&self) -> String {
        format!("{}-{}", self.start, self.end)
    }
}

/// Builds the segment list for `total_size` bytes cut into `segment_size` pieces.
///
/// Returns an empty vec if either argument is 0.
pub fn plan_segments(total_size: u64, segment_size: u64) -> Vec<Segment> {
    if total_size == 0 || segment_size == 0 {
        return Vec::new();
    }

    let count = total_size.div_ceil(segment_size) as usize;
    let mut out = Vec::with_capacity(count);
    for index in 0..count {
        let start = index as u64 * segment_size;
        let end = start.saturating_add(segment_size - 1).min(total_size - 1);
        out.push(Segment { index, start, end });
    }
    out
}
