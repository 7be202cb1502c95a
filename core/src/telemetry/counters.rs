//! telemetry/counters.rs
//! Mutable counters collected while a pipeline runs.
//!
//! Converted into an immutable `TelemetrySnapshot` at pipeline end.
use std::ops::AddAssign;

use serde::{Deserialize, Serialize};

/// Deterministic counters collected during a compression run
#[derive(Default, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TelemetryCounters {
    /// Segments compressed by workers.
    pub segments_compressed: u64,
    /// Segments flushed to the destination by the writer.
    pub segments_written: u64,
    /// Units dropped by the writer after an abort.
    pub segments_discarded: u64,
    pub bytes_raw: u64,
    pub bytes_compressed: u64,
    pub bytes_written: u64,
}

impl TelemetryCounters {
    /// Record one compressed segment (worker side).
    pub fn add_compressed(&mut self, raw_len: usize, compressed_len: usize) {
        self.segments_compressed += 1;
        self.bytes_raw += raw_len as u64;
        self.bytes_compressed += compressed_len as u64;
    }

    /// Record one unit appended to the destination (writer side).
    pub fn add_written(&mut self, len: usize) {
        self.segments_written += 1;
        self.bytes_written += len as u64;
    }

    /// Record units dropped without being written.
    pub fn add_discarded(&mut self, count: usize) {
        self.segments_discarded += count as u64;
    }

    // Merge per-thread counters after join. This avoids:
    // * locks inside workers
    // * atomics
    // * false sharing
    pub fn merge(&mut self, other: &TelemetryCounters) {
        self.segments_compressed += other.segments_compressed;
        self.segments_written += other.segments_written;
        self.segments_discarded += other.segments_discarded;

        self.bytes_raw += other.bytes_raw;
        self.bytes_compressed += other.bytes_compressed;
        self.bytes_written += other.bytes_written;
    }
}

impl AddAssign for TelemetryCounters {
    fn add_assign(&mut self, rhs: Self) {
        self.merge(&rhs);
    }
}
