use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;

use crate::compression::Compressor;
use crate::stream::allocator::SegmentAllocator;
use crate::stream::compression_worker::types::{WorkerExit, WorkerReport};
use crate::stream::coordinator::CompletionCoordinator;
use crate::stream::ordered_writer::SegmentSubmitter;
use crate::telemetry::Stage;
use crate::types::ErrorKind;

/// One member of the pool. Owns its compressor; shares the allocator, the
/// submitter and the coordinator with the other workers.
pub struct CompressionWorker {
    id: usize,
    allocator: Arc<SegmentAllocator>,
    submitter: SegmentSubmitter,
    compressor: Box<dyn Compressor>,
    coordinator: Arc<CompletionCoordinator>,
}

impl CompressionWorker {
    pub fn new(
        id: usize,
        allocator: Arc<SegmentAllocator>,
        submitter: SegmentSubmitter,
        compressor: Box<dyn Compressor>,
        coordinator: Arc<CompletionCoordinator>,
    ) -> Self {
        Self { id, allocator, submitter, compressor, coordinator }
    }

    /// Worker loop: pull, compress, submit until the allocator runs dry.
    pub fn run(mut self) -> WorkerReport {
        let mut report = WorkerReport { worker_id: self.id, ..WorkerReport::default() };
        let exit = self.process(&mut report);
        tracing::debug!(
            worker = self.id,
            ?exit,
            segments = report.counters.segments_compressed,
            "worker finished"
        );
        report
    }

    fn process(&mut self, report: &mut WorkerReport) -> WorkerExit {
        while let Some(segment) = self.allocator.next_segment() {
            let index = segment.index;

            // Compression / segment
            let start = Instant::now();
            let mut out = Vec::with_capacity(segment.raw.len() / 2 + 64);
            let compressor = &mut self.compressor;
            let result = panic::catch_unwind(AssertUnwindSafe(|| {
                compressor.compress_chunk(&segment.raw, &mut out)
            }));
            report.stage_times.add(Stage::Compress, start.elapsed());

            match result {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    self.coordinator
                        .fail(ErrorKind::Compression, format!("segment {index}: {e}"));
                    return WorkerExit::CompressionFailed;
                }
                Err(payload) => {
                    self.coordinator.fail(
                        ErrorKind::Compression,
                        format!("codec panicked on segment {index}: {}", panic_message(&*payload)),
                    );
                    return WorkerExit::CompressionFailed;
                }
            }

            if self.coordinator.is_aborted() {
                return WorkerExit::Aborted;
            }

            report.counters.add_compressed(segment.raw.len(), out.len());
            drop(segment);

            if self.submitter.submit(index, Bytes::from(out)).is_err() {
                return WorkerExit::Aborted;
            }
        }

        if self.coordinator.is_aborted() {
            WorkerExit::Aborted
        } else {
            WorkerExit::Exhausted
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
