//! telemetry/mod.rs
//! Counters, stage timers, and immutable snapshots for pipeline runs.
//!
//! Notes:
//! - Workers and the writer keep private counters; they are merged once the
//!   threads are joined, so the hot path has no shared atomics.
//! - Snapshots are immutable and serde-serializable (CLI `--json`).

pub mod counters;
pub mod timers;
pub mod snapshot;

pub use counters::*;
pub use timers::*;
pub use snapshot::*;
