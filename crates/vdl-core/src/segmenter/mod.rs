//! Range math and segment planning.
//!
//! Splits a download into fixed-size segments, computes HTTP Range header
//! bounds, and tracks each segment's state while the scheduler runs.

mod range;
mod state;

pub use range::{plan_segments, DownloadPlan, Segment, DEFAULT_SEGMENT_SIZE};
pub use state::{SegmentState, SegmentStates};
