//! Pipeline-wide defaults and sanity bounds.

/// Default segment size when none is configured (1 MiB).
pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;

/// Smallest accepted segment size. Zero would make the segment count undefined.
pub const MIN_CHUNK_SIZE: usize = 1;

/// Max chunk size sanity bound (64 MiB).
pub const MAX_CHUNK_SIZE: usize = 64 * 1024 * 1024;

/// Lower bound for the allocation window regardless of worker count.
pub const MIN_INFLIGHT_SEGMENTS: usize = 16;

/// Window multiplier: in-flight segments per worker.
pub const INFLIGHT_PER_WORKER: usize = 4;

/// Hard cap on in-flight segments for `ParallelismProfile::dynamic`.
pub const MAX_INFLIGHT_SEGMENTS: usize = 1024;

/// Name prefix for worker threads.
pub const WORKER_THREAD_PREFIX: &str = "parzip-worker";

/// Name of the writer thread.
pub const WRITER_THREAD_NAME: &str = "parzip-writer";

/// Suffixes appended to the source path when no destination is given.
pub const GZIP_EXTENSION: &str = "gz";
pub const ZSTD_EXTENSION: &str = "zst";
