// ## Ordered reassembly: buffer out-of-order units, flush by ascending index

use std::collections::BTreeMap;
use std::io::{self, Write};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use bytes::Bytes;
use crossbeam::channel::{Receiver, RecvError, Sender, bounded, select};

use crate::constants::WRITER_THREAD_NAME;
use crate::stream::allocator::InflightWindow;
use crate::stream::coordinator::CompletionCoordinator;
use crate::telemetry::{Stage, StageTimes, TelemetryCounters};
use crate::types::{ErrorKind, PipelineError};

/// Independently compressed representation of one segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressedUnit {
    pub index: u64,
    pub bytes: Bytes,
}

/// Cloneable handle used by workers to hand units to the writer thread.
#[derive(Clone)]
pub struct SegmentSubmitter {
    tx: Sender<CompressedUnit>,
}

impl SegmentSubmitter {
    /// Fails only when the writer has already shut down.
    pub fn submit(&self, index: u64, bytes: Bytes) -> Result<(), PipelineError> {
        self.tx
            .send(CompressedUnit { index, bytes })
            .map_err(|_| PipelineError::aborted(format!("writer closed before segment {index}")))
    }
}

/// What the writer observed, merged into the run's telemetry after join.
#[derive(Debug, Clone, Default)]
pub struct WriterReport {
    pub counters: TelemetryCounters,
    pub stage_times: StageTimes,
    /// First index not written.
    pub next_expected: u64,
}

enum Event {
    Unit(Result<CompressedUnit, RecvError>),
    Abort,
    Stall,
}

enum Exit {
    Completed,
    Failed,
}

pub struct OrderedWriter<W: Write> {
    dest: W,
    rx: Receiver<CompressedUnit>,
    total_segments: u64,
    next_expected: u64,
    pending: BTreeMap<u64, Bytes>,
    coordinator: Arc<CompletionCoordinator>,
    window: Option<InflightWindow>,
    stall_timeout: Option<Duration>,
    counters: TelemetryCounters,
    stage_times: StageTimes,
}

impl<W: Write> OrderedWriter<W> {
    /// Build a writer for `total_segments` units plus the submitter feeding it.
    /// `capacity` bounds the submission channel.
    pub fn new(
        dest: W,
        total_segments: u64,
        coordinator: Arc<CompletionCoordinator>,
        capacity: usize,
    ) -> (Self, SegmentSubmitter) {
        let (tx, rx) = bounded(capacity.max(1));
        let writer = Self {
            dest,
            rx,
            total_segments,
            next_expected: 0,
            pending: BTreeMap::new(),
            coordinator,
            window: None,
            stall_timeout: None,
            counters: TelemetryCounters::default(),
            stage_times: StageTimes::default(),
        };
        (writer, SegmentSubmitter { tx })
    }

    /// Return one window token per flushed unit.
    pub fn with_window(mut self, window: InflightWindow) -> Self {
        self.window = Some(window);
        self
    }

    pub fn with_stall_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.stall_timeout = timeout;
        self
    }

    /// Drain until every segment is written or the pipeline fails.
    /// The destination is dropped before success is reported.
    pub fn run(mut self) -> WriterReport {
        let exit = self.drain();

        // ---- Discard whatever is left ----
        let leftover = self.pending.len() + self.rx.try_iter().count();
        if leftover > 0 {
            tracing::warn!(leftover, next_expected = self.next_expected, "discarding pending units");
            self.counters.add_discarded(leftover);
        }
        self.pending.clear();

        let report = WriterReport {
            counters: self.counters,
            stage_times: self.stage_times,
            next_expected: self.next_expected,
        };
        drop(self.dest);
        drop(self.rx);

        if let Exit::Completed = exit {
            tracing::debug!(segments = report.next_expected, "writer completed");
            self.coordinator.report_success();
        }
        report
    }

    fn drain(&mut self) -> Exit {
        if self.total_segments == 0 {
            return self.finish();
        }

        let abort = self.coordinator.abort_signal();
        loop {
            if self.coordinator.is_aborted() {
                return Exit::Failed;
            }

            let wait_start = Instant::now();
            let event = match self.stall_timeout {
                Some(timeout) => select! {
                    recv(self.rx) -> unit => Event::Unit(unit),
                    recv(abort) -> _ => Event::Abort,
                    default(timeout) => Event::Stall,
                },
                None => select! {
                    recv(self.rx) -> unit => Event::Unit(unit),
                    recv(abort) -> _ => Event::Abort,
                },
            };
            self.stage_times.add(Stage::Wait, wait_start.elapsed());

            let unit = match event {
                Event::Abort => return Exit::Failed,
                Event::Stall => {
                    self.coordinator.fail(
                        ErrorKind::Stalled,
                        format!(
                            "no unit for segment {} within {:?}",
                            self.next_expected,
                            self.stall_timeout.unwrap_or_default()
                        ),
                    );
                    return Exit::Failed;
                }
                Event::Unit(Err(_)) => {
                    self.coordinator.fail(
                        ErrorKind::Aborted,
                        format!("workers exited before segment {}", self.next_expected),
                    );
                    return Exit::Failed;
                }
                Event::Unit(Ok(unit)) => unit,
            };

            if let Err(e) = self.accept(unit) {
                self.coordinator.report_error(e);
                return Exit::Failed;
            }
            if let Err(e) = self.flush_ready() {
                self.coordinator.report_error(e);
                return Exit::Failed;
            }
            if self.coordinator.is_aborted() {
                return Exit::Failed;
            }
            if self.next_expected == self.total_segments {
                return self.finish();
            }
        }
    }

    fn accept(&mut self, unit: CompressedUnit) -> Result<(), PipelineError> {
        let index = unit.index;
        if index >= self.total_segments {
            return Err(PipelineError::new(
                ErrorKind::DestinationWrite,
                format!("segment index {index} out of range (total {})", self.total_segments),
            ));
        }
        if index < self.next_expected || self.pending.contains_key(&index) {
            return Err(PipelineError::new(
                ErrorKind::DestinationWrite,
                format!("duplicate submission for segment {index}"),
            ));
        }
        self.pending.insert(index, unit.bytes);
        Ok(())
    }

    /// Write every unit that is next in line.
    fn flush_ready(&mut self) -> Result<(), PipelineError> {
        while let Some(bytes) = self.pending.remove(&self.next_expected) {
            if self.coordinator.is_aborted() {
                // Put it back so it is counted as discarded.
                self.pending.insert(self.next_expected, bytes);
                return Ok(());
            }

            let start = Instant::now();
            self.dest.write_all(&bytes).map_err(|e| write_error(self.next_expected, e))?;
            self.stage_times.add(Stage::Write, start.elapsed());

            self.counters.add_written(bytes.len());
            tracing::debug!(index = self.next_expected, len = bytes.len(), "unit flushed");
            drop(bytes);

            if let Some(window) = &self.window {
                window.release();
            }
            self.next_expected += 1;
        }
        Ok(())
    }

    fn finish(&mut self) -> Exit {
        match self.dest.flush() {
            Ok(()) => Exit::Completed,
            Err(e) => {
                self.coordinator
                    .fail(ErrorKind::DestinationWrite, format!("final flush failed: {e}"));
                Exit::Failed
            }
        }
    }
}

impl<W: Write + Send + 'static> OrderedWriter<W> {
    /// Run on the dedicated writer thread.
    pub fn spawn(self) -> io::Result<JoinHandle<WriterReport>> {
        thread::Builder::new()
            .name(WRITER_THREAD_NAME.into())
            .spawn(move || self.run())
    }
}

fn write_error(index: u64, e: io::Error) -> PipelineError {
    PipelineError::new(ErrorKind::DestinationWrite, format!("write failed at segment {index}: {e}"))
}
