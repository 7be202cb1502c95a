//! telemetry/timers.rs
//! Per-stage durations and the run clock.

use std::collections::BTreeMap;
use std::fmt;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// Pipeline stages that accumulate time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Stage {
    /// Allocator reads from the source, summed across workers.
    Read,
    /// Codec time, summed across workers.
    Compress,
    /// Writer time spent writing units to the destination.
    Write,
    /// Writer time spent blocked waiting for the next unit.
    Wait,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Read => "read",
            Stage::Compress => "compress",
            Stage::Write => "write",
            Stage::Wait => "wait",
        })
    }
}

/// Accumulated durations per stage. Worker stages are summed across threads,
/// so they can exceed wall-clock time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StageTimes {
    times: BTreeMap<Stage, Duration>,
}

impl StageTimes {
    pub fn add(&mut self, stage: Stage, dur: Duration) {
        *self.times.entry(stage).or_default() += dur;
    }

    pub fn get(&self, stage: Stage) -> Duration {
        self.times.get(&stage).copied().unwrap_or_default()
    }

    pub fn get_ms(&self, stage: Stage) -> f64 {
        self.get(stage).as_secs_f64() * 1_000.0
    }

    /// Fold another thread's times into this one.
    pub fn merge(&mut self, other: &StageTimes) {
        for (&stage, &dur) in &other.times {
            self.add(stage, dur);
        }
    }
}

/// Wall clock for one run plus the merged stage times.
#[derive(Clone, Debug)]
pub struct TelemetryTimer {
    started: Instant,
    elapsed: Option<Duration>,
    pub stage_times: StageTimes,
}

impl Default for TelemetryTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl TelemetryTimer {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            elapsed: None,
            stage_times: StageTimes::default(),
        }
    }

    /// Freeze the clock. Later calls keep the first reading.
    pub fn finish(&mut self) {
        let started = self.started;
        self.elapsed.get_or_insert_with(|| started.elapsed());
    }

    pub fn add_stage_time(&mut self, stage: Stage, dur: Duration) {
        self.stage_times.add(stage, dur);
    }

    /// Frozen duration once finished, running duration before.
    pub fn elapsed(&self) -> Duration {
        self.elapsed.unwrap_or_else(|| self.started.elapsed())
    }
}
