//! stream: parallel segmented compression with ordered reassembly.
//!
//! Layering, leaves first:
//! - `allocator`: the only reader of the input source
//! - `compression_worker`: the worker pool
//! - `ordered_writer`: the only writer of the destination
//! - `coordinator`: single-fire outcome and abort broadcast
//! - `pipeline` / `core`: wiring and the public API

pub mod allocator;
pub mod compression_worker;
pub mod config;
pub mod coordinator;
pub mod core;
pub mod io;
pub mod ordered_writer;
pub mod parallelism;
pub mod pipeline;

pub use allocator::{InflightWindow, Segment, SegmentAllocator, WindowPermit};
pub use compression_worker::{CompressionWorker, WorkerExit, WorkerReport, build_compressors, spawn_compression_workers};
pub use config::PipelineConfig;
pub use coordinator::{CompletionCoordinator, Outcome, OutcomeNotifier, PipelineState};
pub use io::{InputSource, OutputSink};
pub use ordered_writer::{CompressedUnit, OrderedWriter, SegmentSubmitter, WriterReport};
pub use parallelism::ParallelismProfile;
pub use pipeline::{Pipeline, PipelineHandle, PipelineReport};

pub use self::core::{
    compress_file,
    compress_stream,
    compress_with_callbacks,
    decompress_file,
    default_decompressed_path,
    default_output_path,
};
