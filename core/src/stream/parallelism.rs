use crate::constants::{INFLIGHT_PER_WORKER, MAX_INFLIGHT_SEGMENTS, MIN_INFLIGHT_SEGMENTS};

/// Worker count and allocation window for one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParallelismProfile {
    pub workers: usize,
    /// Segments allowed between allocation and flush.
    pub inflight_segments: usize,
}

impl ParallelismProfile {
    pub fn new(workers: usize, inflight_segments: usize) -> Self {
        Self {
            workers: workers.max(1),
            inflight_segments: inflight_segments.max(1),
        }
    }

    pub fn single_threaded() -> Self {
        Self::new(1, 1)
    }

    /// One worker per logical core, window sized from the worker count.
    pub fn from_host() -> Self {
        let workers = num_cpus::get().max(1);
        Self::new(workers, default_inflight(workers))
    }

    /// Like `from_host`, but the window is also capped by a fraction of the
    /// currently available memory divided by the segment size.
    pub fn dynamic(chunk_size: usize, mem_fraction: f64, hard_cap: usize) -> Self {
        let workers = num_cpus::get().max(1);

        let mut sys = sysinfo::System::new();
        sys.refresh_memory();
        let avail_bytes = sys.available_memory();

        // Budget = fraction of available memory; each in-flight segment holds
        // roughly one raw and one compressed chunk.
        let budget = (avail_bytes as f64 * mem_fraction.clamp(0.0, 1.0)) as u64;
        let per_segment = (chunk_size.max(1) as u64).saturating_mul(2);
        let by_memory = (budget / per_segment) as usize;

        let inflight = default_inflight(workers)
            .min(by_memory.max(workers))
            .min(hard_cap.clamp(1, MAX_INFLIGHT_SEGMENTS));

        tracing::debug!(workers, inflight, avail_bytes, "dynamic parallelism profile");
        Self::new(workers, inflight)
    }
}

/// Default window for a worker count: `max(4 × workers, 16)`.
pub fn default_inflight(workers: usize) -> usize {
    (workers * INFLIGHT_PER_WORKER).max(MIN_INFLIGHT_SEGMENTS)
}
