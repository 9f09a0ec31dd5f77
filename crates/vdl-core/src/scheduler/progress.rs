//! Progress reporting for downloads (bytes done, ETA, rate).
//!
//! The scheduler reports after every finished segment and the reassembler
//! after every appended segment; consumers render `ProgressStats` however
//! they like. Values are for display only and never drive control flow.

/// Which half of the run a snapshot belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Segments are being fetched into the scratch store.
    Fetching,
    /// Segments are being appended to the output file.
    Reassembling,
}

/// Snapshot of download progress (CLI-friendly).
#[derive(Debug, Clone)]
pub struct ProgressStats {
    pub phase: Phase,
    /// Cumulative bytes fetched. Never decreases over a run; equals
    /// `total_bytes` throughout reassembly.
    pub bytes_done: u64,
    /// Bytes appended to the output file (0 while fetching).
    pub bytes_written: u64,
    /// Total resource size in bytes.
    pub total_bytes: u64,
    /// Elapsed time since the phase started (seconds).
    pub elapsed_secs: f64,
    /// Number of segments completed in this phase.
    pub segments_done: usize,
    /// Total number of segments.
    pub segment_count: usize,
}

/// Callback receiving progress snapshots.
pub type ProgressFn<'a> = &'a dyn Fn(&ProgressStats);

impl ProgressStats {
    /// Bytes done in the current phase: fetched while fetching, written while reassembling.
    pub fn phase_bytes(&self) -> u64 {
        match self.phase {
            Phase::Fetching => self.bytes_done,
            Phase::Reassembling => self.bytes_written,
        }
    }

    /// Current phase rate in bytes per second (0 if elapsed is 0).
    pub fn bytes_per_sec(&self) -> f64 {
        if self.elapsed_secs <= 0.0 {
            return 0.0;
        }
        self.phase_bytes() as f64 / self.elapsed_secs
    }

    /// Estimated seconds remaining (None if rate is 0).
    pub fn eta_secs(&self) -> Option<f64> {
        let remaining = self.total_bytes.saturating_sub(self.phase_bytes());
        if remaining == 0 {
            return Some(0.0);
        }
        let rate = self.bytes_per_sec();
        if rate <= 0.0 {
            return None;
        }
        Some(remaining as f64 / rate)
    }

    /// Fraction of the current phase complete, in [0.0, 1.0].
    pub fn fraction(&self) -> f64 {
        if self.total_bytes == 0 {
            return 1.0;
        }
        (self.phase_bytes() as f64 / self.total_bytes as f64).min(1.0)
    }

    pub fn is_complete(&self) -> bool {
        self.phase_bytes() >= self.total_bytes
    }
}
