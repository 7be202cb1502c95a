// ## Pipeline wiring: allocator -> workers -> ordered writer -> coordinator

use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::compression::{CompressorFactory, compressor_factory};
use crate::stream::allocator::{InflightWindow, SegmentAllocator};
use crate::stream::compression_worker::{WorkerReport, build_compressors, spawn_compression_workers};
use crate::stream::config::PipelineConfig;
use crate::stream::coordinator::{CompletionCoordinator, Outcome, OutcomeNotifier, PipelineState};
use crate::stream::io::{InputSource, OutputSink, open_input, open_output};
use crate::stream::ordered_writer::{OrderedWriter, WriterReport};
use crate::telemetry::{Stage, TelemetryCounters, TelemetrySnapshot, TelemetryTimer};
use crate::types::{ErrorKind, PipelineError, StreamError};
use crate::utils::{format_bytes, segment_count};

/// Result of a successful run.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub telemetry: TelemetrySnapshot,
    /// Captured destination bytes for `OutputSink::Memory`.
    pub output: Option<Vec<u8>>,
}

/// Builder for one compression run.
pub struct Pipeline {
    config: PipelineConfig,
    factory: Option<CompressorFactory>,
    notifier: Option<OutcomeNotifier>,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config, factory: None, notifier: None }
    }

    /// Use a custom compressor instead of the configured codec.
    pub fn with_compressor_factory(mut self, factory: CompressorFactory) -> Self {
        self.factory = Some(factory);
        self
    }

    /// Called exactly once, on whichever thread records the outcome.
    pub fn on_outcome<F>(mut self, notify: F) -> Self
    where
        F: FnOnce(&Outcome) + Send + 'static,
    {
        self.notifier = Some(Box::new(notify));
        self
    }

    /// Open both ends, spawn the writer and the workers, and return at once.
    ///
    /// Errors: `Config` / `Compression` for an invalid configuration or a
    /// compressor that cannot be built; `Pipeline(SourceRead)` if the input
    /// cannot be opened; `Pipeline(DestinationWrite)` if the output cannot be
    /// created. None of these fire the outcome notifier. A `Pipeline` error
    /// from a failed thread spawn has already been reported to it.
    pub fn start(self, input: InputSource, output: OutputSink) -> Result<PipelineHandle, StreamError> {
        let config = self.config;
        config.validate()?;

        let factory = match self.factory {
            Some(f) => f,
            None => compressor_factory(config.codec, config.level)?,
        };

        // ---- Open both ends ----
        let input = open_input(input).map_err(|e| {
            PipelineError::new(ErrorKind::SourceRead, format!("cannot open input: {e}"))
        })?;
        let output = open_output(output).map_err(|e| {
            PipelineError::new(ErrorKind::DestinationWrite, format!("cannot create output: {e}"))
        })?;

        let timer = TelemetryTimer::new();
        let total_segments = segment_count(input.len, config.chunk_size);
        let workers = config.parallelism.min(total_segments.max(1) as usize);

        let cleanup = PartialOutput {
            path: output.path,
            keep: config.keep_partial_output,
        };

        let compressors = match build_compressors(workers, &factory) {
            Ok(c) => c,
            Err(e) => {
                drop(output.writer);
                cleanup.remove();
                return Err(e.into());
            }
        };

        tracing::info!(
            input = %format_bytes(input.len),
            chunk_size = config.chunk_size,
            segments = total_segments,
            workers,
            codec = %config.codec,
            "starting compression pipeline"
        );

        // ---- Shared components ----
        let coordinator = Arc::new(CompletionCoordinator::new());
        if let Some(notifier) = self.notifier {
            coordinator.set_notifier(notifier);
        }

        let window = InflightWindow::new(config.inflight_segments);
        let allocator = Arc::new(
            SegmentAllocator::new(input.reader, input.len, config.chunk_size, coordinator.clone())
                .with_window(window.clone()),
        );

        let (writer, submitter) = OrderedWriter::new(
            output.writer,
            total_segments,
            coordinator.clone(),
            config.inflight_segments,
        );
        let writer = writer
            .with_window(window)
            .with_stall_timeout(config.stall_timeout());

        coordinator.mark_running();

        // ---- Writer thread ----
        let writer_handle = match writer.spawn() {
            Ok(h) => h,
            Err(e) => {
                let error = PipelineError::aborted(format!("failed to spawn writer: {e}"));
                coordinator.report_error(error.clone());
                cleanup.remove();
                return Err(error.into());
            }
        };

        // ---- Workers ----
        let worker_handles = match spawn_compression_workers(
            compressors,
            &allocator,
            &submitter,
            &coordinator,
        ) {
            Ok(handles) => handles,
            Err(e) => {
                drop(submitter);
                let _ = writer_handle.join();
                cleanup.remove();
                return Err(e);
            }
        };

        // Workers hold the only remaining submitters.
        drop(submitter);

        Ok(PipelineHandle {
            coordinator,
            allocator,
            workers: worker_handles,
            writer: writer_handle,
            timer,
            total_segments,
            worker_count: workers,
            captured: output.captured,
            cleanup,
        })
    }
}

struct PartialOutput {
    path: Option<PathBuf>,
    keep: bool,
}

impl PartialOutput {
    fn remove(&self) {
        let Some(path) = &self.path else { return };
        if self.keep {
            tracing::warn!(path = %path.display(), "keeping partial output");
            return;
        }
        match fs::remove_file(path) {
            Ok(()) => tracing::debug!(path = %path.display(), "partial output removed"),
            Err(e) => tracing::warn!(path = %path.display(), "failed to remove partial output: {e}"),
        }
    }
}

/// A running pipeline.
pub struct PipelineHandle {
    coordinator: Arc<CompletionCoordinator>,
    allocator: Arc<SegmentAllocator>,
    workers: Vec<JoinHandle<WorkerReport>>,
    writer: JoinHandle<WriterReport>,
    timer: TelemetryTimer,
    total_segments: u64,
    worker_count: usize,
    captured: Option<Arc<Mutex<Vec<u8>>>>,
    cleanup: PartialOutput,
}

impl PipelineHandle {
    /// Inject an `Aborted` outcome. Returns `false` if the run already ended.
    pub fn cancel(&self) -> bool {
        self.coordinator.report_error(PipelineError::aborted("cancelled by caller"))
    }

    pub fn state(&self) -> PipelineState {
        self.coordinator.state()
    }

    pub fn total_segments(&self) -> u64 {
        self.total_segments
    }

    /// Wait up to `timeout` for the terminal outcome without joining threads.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<Outcome> {
        self.coordinator.wait_outcome_timeout(timeout)
    }

    /// Join every thread and return the report, or the terminal error.
    pub fn wait(self) -> Result<PipelineReport, StreamError> {
        let PipelineHandle {
            coordinator,
            allocator,
            workers,
            writer,
            mut timer,
            total_segments,
            worker_count,
            captured,
            cleanup,
        } = self;

        let mut counters = TelemetryCounters::default();

        // Workers first: they always terminate once the writer exits or abort is set.
        for handle in workers {
            match handle.join() {
                Ok(report) => {
                    counters.merge(&report.counters);
                    timer.stage_times.merge(&report.stage_times);
                }
                Err(_) => {
                    coordinator.fail(ErrorKind::Compression, "worker thread panicked");
                }
            }
        }

        match writer.join() {
            Ok(report) => {
                counters.merge(&report.counters);
                timer.stage_times.merge(&report.stage_times);
            }
            Err(_) => {
                coordinator.fail(ErrorKind::DestinationWrite, "writer thread panicked");
            }
        }

        timer.add_stage_time(Stage::Read, allocator.read_time());
        timer.finish();

        let outcome = coordinator.outcome().unwrap_or_else(|| {
            let error = PipelineError::aborted("pipeline ended without an outcome");
            coordinator.report_error(error.clone());
            Err(error)
        });

        if let Err(e) = outcome {
            tracing::error!(kind = ?e.kind, "compression failed: {}", e.message);
            cleanup.remove();
            return Err(e.into());
        }

        let telemetry = TelemetrySnapshot::from(&counters, &timer, total_segments, worker_count);
        let output = captured.map(|buf| {
            let mut guard = buf.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            std::mem::take(&mut *guard)
        });

        tracing::info!(
            segments = telemetry.segments_total,
            raw = %format_bytes(telemetry.bytes_raw),
            compressed = %format_bytes(telemetry.bytes_compressed),
            ratio = telemetry.compression_ratio,
            elapsed_ms = telemetry.elapsed.as_millis() as u64,
            "compression finished"
        );

        Ok(PipelineReport { telemetry, output })
    }
}
