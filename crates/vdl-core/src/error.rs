//! Terminal errors of a download run.

use std::path::PathBuf;

use crate::retry::FetchError;

/// Why a download did not produce its output file.
///
/// Fetch-side and write-side failures are distinct variants so callers can
/// tell "could not fetch" from "could not write".
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    /// Nothing to schedule: zero/unknown total size or zero segment size.
    #[error("invalid download plan: {0}")]
    InvalidPlan(String),

    /// A segment failed terminally; the whole run was cancelled.
    #[error("segment {index} failed after {attempts} attempt(s): {cause}")]
    SegmentFetchFailed {
        index: usize,
        attempts: u32,
        #[source]
        cause: FetchError,
    },

    /// A segment reported done has no data in the store at reassembly time.
    #[error("segment {index} missing from scratch store")]
    MissingSegment { index: usize },

    /// Writing the output artifact failed.
    #[error("failed to write output {}: {source}", path.display())]
    ReassemblyIoFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The scratch store could not be set up.
    #[error("failed to prepare scratch store at {}: {source}", path.display())]
    Scratch {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The caller cancelled the run.
    #[error("download cancelled")]
    Cancelled,
}

impl DownloadError {
    /// True for failures that happened while fetching, as opposed to writing.
    pub fn is_fetch_failure(&self) -> bool {
        matches!(self, DownloadError::SegmentFetchFailed { .. })
    }
}
