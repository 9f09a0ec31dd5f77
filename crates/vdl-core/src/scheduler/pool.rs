//! Bounded worker pool for segment fetches.

use std::collections::VecDeque;
use std::sync::mpsc;
use std::sync::{Mutex, PoisonError};
use std::thread;

use crate::cancel::CancelToken;
use crate::fetcher::RangeFetcher;
use crate::retry::RetryExhausted;
use crate::segmenter::{DownloadPlan, Segment, SegmentState, SegmentStates};
use crate::store::SegmentStore;

/// Message from a worker to the result loop.
enum WorkerEvent {
    Started(usize),
    Finished(usize, Result<u64, RetryExhausted>),
}

pub(super) struct PoolOutcome {
    pub(super) states: SegmentStates,
    pub(super) bytes_fetched: u64,
    /// The segment whose failure ended the run, if any.
    pub(super) first_failure: Option<(usize, RetryExhausted)>,
}

/// Run `segments` with at most `max_workers` fetches in flight. Workers pull
/// indices from a shared queue; results are processed on the calling thread
/// as they arrive, and `on_done` is called after each segment reaches `Done`.
///
/// A worker whose segment fails terminally cancels `cancel` before reporting,
/// so no worker picks up new work after the first failure.
pub(super) fn run_pool(
    plan: &DownloadPlan,
    segments: Vec<Segment>,
    max_workers: usize,
    fetcher: &RangeFetcher,
    store: &dyn SegmentStore,
    cancel: &CancelToken,
    on_done: &mut dyn FnMut(&SegmentStates, u64),
) -> PoolOutcome {
    let count = segments.len();
    let work: Mutex<VecDeque<Segment>> = Mutex::new(segments.into_iter().collect());
    let num_workers = max_workers.clamp(1, count.max(1));
    let mut states = SegmentStates::new(count);
    let mut bytes_fetched = 0u64;
    let mut first_failure: Option<(usize, RetryExhausted)> = None;

    thread::scope(|s| {
        let (tx, rx) = mpsc::channel();
        for worker in 0..num_workers {
            let tx = tx.clone();
            let work = &work;
            s.spawn(move || loop {
                if cancel.is_cancelled() {
                    break;
                }
                let next = work
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .pop_front();
                let Some(segment) = next else {
                    break;
                };
                if tx.send(WorkerEvent::Started(segment.index)).is_err() {
                    break;
                }
                let res = fetcher.fetch(
                    &plan.resource_url,
                    &plan.headers,
                    &segment,
                    store,
                    cancel,
                );
                let failed = matches!(&res, Err(f) if !f.last.is_cancelled());
                if failed {
                    tracing::debug!(worker, segment = segment.index, "segment failed, cancelling run");
                    cancel.cancel();
                }
                if tx.send(WorkerEvent::Finished(segment.index, res)).is_err() || failed {
                    break;
                }
            });
        }
        drop(tx);

        for event in rx {
            match event {
                WorkerEvent::Started(index) => states.set(index, SegmentState::InFlight),
                WorkerEvent::Finished(index, Ok(bytes)) => {
                    states.set(index, SegmentState::Done);
                    bytes_fetched += bytes;
                    on_done(&states, bytes_fetched);
                }
                WorkerEvent::Finished(index, Err(failure)) if failure.last.is_cancelled() => {
                    // interrupted by cancellation, not a failure of its own
                    states.set(index, SegmentState::Pending);
                }
                WorkerEvent::Finished(index, Err(failure)) => {
                    states.set(index, SegmentState::Failed);
                    if first_failure.is_some() {
                        tracing::debug!(segment = index, error = %failure, "secondary segment failure");
                        continue;
                    }
                    tracing::error!(segment = index, error = %failure, "segment failed");
                    let dropped = {
                        let mut queue = work.lock().unwrap_or_else(PoisonError::into_inner);
                        let n = queue.len();
                        queue.clear();
                        n
                    };
                    if dropped > 0 {
                        tracing::debug!(dropped, "dropped queued segments");
                    }
                    first_failure = Some((index, failure));
                }
            }
        }
    });

    PoolOutcome {
        states,
        bytes_fetched,
        first_failure,
    }
}
