//! Per-request error type for retry classification.

use std::fmt;

/// Error returned by a single HTTP attempt (segment GET or size probe).
/// Kept separate from `DownloadError` so it can be classified before the
/// retry loop decides whether to try again.
#[derive(Debug)]
pub enum FetchError {
    /// Curl reported an error (timeout, connection, etc.).
    Curl(curl::Error),
    /// Final response status was not acceptable.
    Http(u32),
    /// Transfer completed but fewer bytes arrived than the segment length
    /// (e.g. server closed early).
    PartialTransfer { expected: u64, received: u64 },
    /// Response body was larger than the requested range; the origin most
    /// likely ignored the Range header and sent the whole resource.
    UnexpectedFullContent { expected: u64, status: u32 },
    /// Scratch store write failed (disk full, permission denied). Not retried.
    Storage(std::io::Error),
    /// The run was cancelled while this attempt was waiting or transferring.
    Cancelled,
}

impl FetchError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, FetchError::Cancelled)
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Curl(e) => write!(f, "network error: {}", e),
            FetchError::Http(code) => write!(f, "HTTP {}", code),
            FetchError::PartialTransfer { expected, received } => {
                write!(f, "partial transfer: expected {} bytes, got {}", expected, received)
            }
            FetchError::UnexpectedFullContent { expected, status } => write!(
                f,
                "HTTP {} body exceeds the requested {} bytes (Range ignored by origin?)",
                status, expected
            ),
            FetchError::Storage(e) => write!(f, "scratch write: {}", e),
            FetchError::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl std::error::Error for FetchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FetchError::Curl(e) => Some(e),
            FetchError::Storage(e) => Some(e),
            FetchError::Http(_)
            | FetchError::PartialTransfer { .. }
            | FetchError::UnexpectedFullContent { .. }
            | FetchError::Cancelled => None,
        }
    }
}
