//! Per-segment state table used by the scheduler.

/// Lifecycle of one segment during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SegmentState {
    #[default]
    Pending,
    InFlight,
    Done,
    Failed,
}

/// One state per segment index. Owned by the scheduler's result loop, so
/// transitions are applied from a single thread.
#[derive(Debug, Clone, Default)]
pub struct SegmentStates {
    states: Vec<SegmentState>,
}

impl SegmentStates {
    /// All `segment_count` segments start as `Pending`.
    pub fn new(segment_count: usize) -> Self {
        SegmentStates {
            states: vec![SegmentState::Pending; segment_count],
        }
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// State of segment `index`; out-of-range indices read as `Pending`.
    pub fn get(&self, index: usize) -> SegmentState {
        self.states.get(index).copied().unwrap_or_default()
    }

    /// Apply a transition. `Done` is terminal: a done segment never changes again.
    pub fn set(&mut self, index: usize, state: SegmentState) {
        if let Some(slot) = self.states.get_mut(index) {
            if *slot != SegmentState::Done {
                *slot = state;
            }
        }
    }

    /// Number of segments currently in `state`.
    pub fn count(&self, state: SegmentState) -> usize {
        self.states.iter().filter(|s| **s == state).count()
    }

    /// True if every segment is `Done` (vacuously true for zero segments).
    pub fn all_done(&self) -> bool {
        self.states.iter().all(|s| *s == SegmentState::Done)
    }

    /// Indices that are not `Done`, ascending.
    pub fn incomplete(&self) -> Vec<usize> {
        self.states
            .iter()
            .enumerate()
            .filter(|(_, s)| **s != SegmentState::Done)
            .map(|(i, _)| i)
            .collect()
    }
}
