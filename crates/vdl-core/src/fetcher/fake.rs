//! In-process transport for engine tests: serves ranges of a fixed body and
//! plays back scripted failures per segment index.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use super::transport::{BodySink, RangeRequest, Transport};
use crate::cancel::CancelToken;
use crate::retry::FetchError;

const CHUNK: usize = 8 * 1024;

#[derive(Debug, Clone)]
pub(crate) enum Step {
    /// Respond with this status and a short error body.
    Status(u32),
    /// Stream half the range, then fail with this curl error code.
    NetworkError(u32),
    /// Stream only the first `n` bytes of the range, then end the response.
    Truncate(usize),
}

#[derive(Default)]
pub(crate) struct FakeTransport {
    body: Vec<u8>,
    scripts: Mutex<HashMap<usize, VecDeque<Step>>>,
    persistent: HashMap<usize, u32>,
    delays: HashMap<usize, Duration>,
    ignore_ranges: bool,
    calls: AtomicUsize,
}

impl FakeTransport {
    pub(crate) fn new(body: Vec<u8>) -> Self {
        Self {
            body,
            ..Self::default()
        }
    }

    /// Steps consumed one per request for segment `index`, before normal service.
    pub(crate) fn script(self, index: usize, steps: Vec<Step>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(index, steps.into_iter().collect());
        self
    }

    /// Every request for segment `index` answers with `status`.
    pub(crate) fn persistent(mut self, index: usize, status: u32) -> Self {
        self.persistent.insert(index, status);
        self
    }

    /// Hold the response for segment `index` for `delay`.
    pub(crate) fn delay(mut self, index: usize, delay: Duration) -> Self {
        self.delays.insert(index, delay);
        self
    }

    /// Answer every request with `200` and the whole body.
    pub(crate) fn ignore_ranges(mut self) -> Self {
        self.ignore_ranges = true;
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn stream(
        &self,
        status: u32,
        data: &[u8],
        sink: &mut BodySink<'_>,
        cancel: &CancelToken,
    ) -> Result<u32, FetchError> {
        for chunk in data.chunks(CHUNK) {
            if cancel.is_cancelled() {
                return Err(FetchError::Cancelled);
            }
            sink(status, chunk)?;
        }
        Ok(status)
    }
}

impl Transport for FakeTransport {
    fn get_range(
        &self,
        request: &RangeRequest<'_>,
        sink: &mut BodySink<'_>,
        cancel: &CancelToken,
    ) -> Result<u32, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let segment = request.segment;
        if let Some(delay) = self.delays.get(&segment.index) {
            if cancel.wait_timeout(*delay) {
                return Err(FetchError::Cancelled);
            }
        }
        let range = &self.body[segment.start as usize..=segment.end as usize];

        let step = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(&segment.index)
            .and_then(VecDeque::pop_front);
        match step {
            Some(Step::Status(code)) => return self.stream(code, b"error page", sink, cancel),
            Some(Step::NetworkError(code)) => {
                self.stream(206, &range[..range.len() / 2], sink, cancel)?;
                return Err(FetchError::Curl(curl::Error::new(code)));
            }
            Some(Step::Truncate(n)) => return self.stream(206, &range[..n.min(range.len())], sink, cancel),
            None => {}
        }
        if let Some(code) = self.persistent.get(&segment.index) {
            return self.stream(*code, b"error page", sink, cancel);
        }
        if self.ignore_ranges {
            return self.stream(200, &self.body, sink, cancel);
        }
        self.stream(206, range, sink, cancel)
    }
}
