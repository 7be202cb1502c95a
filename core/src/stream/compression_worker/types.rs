use crate::telemetry::{StageTimes, TelemetryCounters};

/// Per-worker telemetry, merged after join.
#[derive(Debug, Clone, Default)]
pub struct WorkerReport {
    pub worker_id: usize,
    pub counters: TelemetryCounters,
    pub stage_times: StageTimes,
}

/// Why a worker loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerExit {
    /// Allocator returned `None`.
    Exhausted,
    /// Codec failed or panicked; the failure was reported.
    CompressionFailed,
    /// Abort observed, or the writer is gone.
    Aborted,
}
