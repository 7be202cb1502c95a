//! Compression worker pool.
//!
//! Responsibilities:
//! - Pull segments from the allocator
//! - Compress each segment into an independent unit
//! - Submit units to the ordered writer
//!
//! Non-responsibilities:
//! - Reading the source
//! - Ordering output
//! - Touching the destination

pub mod types;
pub mod worker;

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::compression::{CompressionError, Compressor, CompressorFactory};
use crate::constants::WORKER_THREAD_PREFIX;
use crate::stream::allocator::SegmentAllocator;
use crate::stream::coordinator::CompletionCoordinator;
use crate::stream::ordered_writer::SegmentSubmitter;
use crate::types::{ErrorKind, PipelineError, StreamError};

pub use types::{WorkerExit, WorkerReport};
pub use worker::CompressionWorker;

/// Build one compressor per worker.
pub fn build_compressors(
    count: usize,
    factory: &CompressorFactory,
) -> Result<Vec<Box<dyn Compressor>>, CompressionError> {
    (0..count).map(|_| factory()).collect()
}

/// Spawn one named worker thread per compressor.
///
/// A failed thread spawn aborts the run and joins the workers already started.
pub fn spawn_compression_workers(
    compressors: Vec<Box<dyn Compressor>>,
    allocator: &Arc<SegmentAllocator>,
    submitter: &SegmentSubmitter,
    coordinator: &Arc<CompletionCoordinator>,
) -> Result<Vec<JoinHandle<WorkerReport>>, StreamError> {
    let mut handles = Vec::with_capacity(compressors.len());
    for (i, compressor) in compressors.into_iter().enumerate() {
        let worker = CompressionWorker::new(
            i,
            allocator.clone(),
            submitter.clone(),
            compressor,
            coordinator.clone(),
        );

        let spawned = thread::Builder::new()
            .name(format!("{WORKER_THREAD_PREFIX}-{i}"))
            .spawn(move || worker.run());

        match spawned {
            Ok(handle) => handles.push(handle),
            Err(e) => {
                let error = PipelineError::new(
                    ErrorKind::Aborted,
                    format!("failed to spawn worker {i}: {e}"),
                );
                coordinator.report_error(error.clone());
                for handle in handles {
                    let _ = handle.join();
                }
                return Err(StreamError::Pipeline(error));
            }
        }
    }

    tracing::debug!(workers = handles.len(), "compression workers started");
    Ok(handles)
}
