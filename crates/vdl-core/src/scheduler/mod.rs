//! Chunk scheduler.
//!
//! Turns a `DownloadPlan` into segments, fetches them on a bounded worker
//! pool into the scratch store and tracks each segment's state. The first
//! segment to fail terminally cancels everything else; the run then fails as
//! a whole and the store is emptied.

mod pool;
mod progress;

use std::time::{Duration, Instant};

use crate::cancel::CancelToken;
use crate::error::DownloadError;
use crate::fetcher::RangeFetcher;
use crate::segmenter::{DownloadPlan, SegmentState};
use crate::store::SegmentStore;

pub use progress::{Phase, ProgressFn, ProgressStats};

/// Default number of concurrent segment fetches.
pub const DEFAULT_MAX_WORKERS: usize = 8;

/// Outcome of a fully successful fetch phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleReport {
    pub segment_count: usize,
    pub bytes_fetched: u64,
    pub elapsed: Duration,
}

/// Fetch every segment of `plan` into `store` with at most `max_workers`
/// fetches in flight.
///
/// Fails with `InvalidPlan` before any request when the plan is empty. On the
/// first terminal segment failure `cancel` is triggered, the pool is joined,
/// `store` is cleared and that segment's error is returned. If `cancel` is
/// triggered by the caller instead, the result is `DownloadError::Cancelled`.
pub fn schedule(
    plan: &DownloadPlan,
    max_workers: usize,
    fetcher: &RangeFetcher,
    store: &dyn SegmentStore,
    cancel: &CancelToken,
    progress: Option<ProgressFn<'_>>,
) -> Result<ScheduleReport, DownloadError> {
    let segment_count = plan.validate()?;
    let segments = plan.segments();
    let started = Instant::now();
    tracing::info!(
        url = %plan.resource_url,
        total_size = plan.total_size,
        segment_size = plan.segment_size,
        segment_count,
        max_workers,
        "scheduling segments"
    );

    let outcome = pool::run_pool(
        plan,
        segments,
        max_workers,
        fetcher,
        store,
        cancel,
        &mut |states, bytes_fetched| {
            if let Some(report) = progress {
                report(&ProgressStats {
                    phase: Phase::Fetching,
                    bytes_done: bytes_fetched,
                    bytes_written: 0,
                    total_bytes: plan.total_size,
                    elapsed_secs: started.elapsed().as_secs_f64(),
                    segments_done: states.count(SegmentState::Done),
                    segment_count,
                });
            }
        },
    );

    if let Some((index, failure)) = outcome.first_failure {
        discard(store);
        return Err(DownloadError::SegmentFetchFailed {
            index,
            attempts: failure.attempts,
            cause: failure.last,
        });
    }
    if !outcome.states.all_done() {
        tracing::info!(
            incomplete = outcome.states.incomplete().len(),
            "download cancelled"
        );
        discard(store);
        return Err(DownloadError::Cancelled);
    }

    let elapsed = started.elapsed();
    tracing::info!(
        segment_count,
        bytes = outcome.bytes_fetched,
        elapsed_ms = elapsed.as_millis() as u64,
        "all segments fetched"
    );
    Ok(ScheduleReport {
        segment_count,
        bytes_fetched: outcome.bytes_fetched,
        elapsed,
    })
}

/// Drop whatever partial state the failed run left in the store.
fn discard(store: &dyn SegmentStore) {
    if let Err(e) = store.clear() {
        tracing::warn!(error = %e, "could not discard scratch segments");
    }
}
