//! telemetry/snapshot.rs
//!
//! Immutable view of a finished run: counters, ratio, throughput, stage timings.

use std::time::Duration;
use serde::{Deserialize, Serialize};

use crate::telemetry::counters::TelemetryCounters;
use crate::telemetry::timers::{Stage, StageTimes, TelemetryTimer};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    pub segments_total: u64,
    pub segments_compressed: u64,
    pub segments_written: u64,
    pub segments_discarded: u64,
    pub bytes_raw: u64,
    pub bytes_compressed: u64,
    pub bytes_written: u64,
    /// `bytes_compressed / bytes_raw`; above 1.0 for incompressible input.
    pub compression_ratio: f64,
    pub throughput_raw_bytes_per_sec: f64,
    pub workers: usize,
    pub elapsed: Duration,
    pub stage_times: StageTimes,
}

impl TelemetrySnapshot {
    pub fn from(
        counters: &TelemetryCounters,
        timer: &TelemetryTimer,
        segments_total: u64,
        workers: usize,
    ) -> Self {
        let elapsed = timer.elapsed();

        let compression_ratio = if counters.bytes_raw > 0 {
            counters.bytes_compressed as f64 / counters.bytes_raw as f64
        } else {
            0.0
        };

        let throughput = if elapsed.as_secs_f64() > 0.0 {
            counters.bytes_raw as f64 / elapsed.as_secs_f64()
        } else {
            0.0
        };

        Self {
            segments_total,
            segments_compressed: counters.segments_compressed,
            segments_written: counters.segments_written,
            segments_discarded: counters.segments_discarded,
            bytes_raw: counters.bytes_raw,
            bytes_compressed: counters.bytes_compressed,
            bytes_written: counters.bytes_written,
            compression_ratio,
            throughput_raw_bytes_per_sec: throughput,
            workers,
            elapsed,
            stage_times: timer.stage_times.clone(),
        }
    }

    pub fn stage_ms(&self, stage: Stage) -> f64 {
        self.stage_times.get_ms(stage)
    }

    /// Invariants of a successful run: every segment compressed and written
    /// exactly once, nothing discarded, and the destination holds exactly
    /// the compressed bytes.
    pub fn sanity_check(&self) -> bool {
        self.segments_compressed == self.segments_total
            && self.segments_written == self.segments_total
            && self.segments_discarded == 0
            && self.bytes_written == self.bytes_compressed
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
