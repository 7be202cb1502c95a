// ## Segment allocation: the only reader of the input source

use std::io::Read;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use bytes::Bytes;
use crossbeam::channel::{Receiver, Sender, bounded, select};

use crate::stream::coordinator::CompletionCoordinator;
use crate::stream::io::read_exact_or_eof;
use crate::types::ErrorKind;
use crate::utils::{segment_count, segment_len};

/// One raw slice of the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub index: u64,
    pub raw: Bytes,
}

// ============================================================
// In-flight window
// ============================================================

/// Bounds the number of segments allocated but not yet flushed.
///
/// Token semaphore over a bounded channel: the allocator takes a token before
/// reading a segment and the writer puts one back per flushed unit.
#[derive(Clone)]
pub struct InflightWindow {
    tx: Sender<()>,
    rx: Receiver<()>,
    capacity: usize,
}

impl InflightWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, rx) = bounded(capacity);
        for _ in 0..capacity {
            let _ = tx.try_send(());
        }
        Self { tx, rx, capacity }
    }

    /// Block until a token is free. Returns `None` once `abort` disconnects.
    pub fn acquire(&self, abort: &Receiver<()>) -> Option<WindowPermit<'_>> {
        select! {
            recv(self.rx) -> token => token.ok().map(|_| WindowPermit { window: self, armed: true }),
            recv(abort) -> _ => None,
        }
    }

    /// Return one token to the window.
    pub fn release(&self) {
        let _ = self.tx.try_send(());
    }

    pub fn available(&self) -> usize {
        self.rx.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// A held window token. Returned on drop unless `consume`d, in which case the
/// writer releases it after flushing the segment.
pub struct WindowPermit<'a> {
    window: &'a InflightWindow,
    armed: bool,
}

impl WindowPermit<'_> {
    pub fn consume(mut self) {
        self.armed = false;
    }
}

impl Drop for WindowPermit<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.window.release();
        }
    }
}

// ============================================================
// Allocator
// ============================================================

struct AllocatorState {
    reader: Box<dyn Read + Send>,
    next_index: u64,
    failed: bool,
    read_time: Duration,
}

/// Hands out `(index, raw)` pairs in ascending order, each index exactly once.
///
/// The exhaustion check, the read, and the index assignment all happen under
/// one mutex, so the byte range of a segment always matches its index.
pub struct SegmentAllocator {
    state: Mutex<AllocatorState>,
    total_len: u64,
    chunk_size: usize,
    total_segments: u64,
    coordinator: Arc<CompletionCoordinator>,
    window: Option<InflightWindow>,
}

impl SegmentAllocator {
    pub fn new(
        reader: Box<dyn Read + Send>,
        total_len: u64,
        chunk_size: usize,
        coordinator: Arc<CompletionCoordinator>,
    ) -> Self {
        Self {
            state: Mutex::new(AllocatorState {
                reader,
                next_index: 0,
                failed: false,
                read_time: Duration::ZERO,
            }),
            total_len,
            chunk_size,
            total_segments: segment_count(total_len, chunk_size),
            coordinator,
            window: None,
        }
    }

    pub fn with_window(mut self, window: InflightWindow) -> Self {
        self.window = Some(window);
        self
    }

    pub fn total_segments(&self) -> u64 {
        self.total_segments
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Segments handed out so far.
    pub fn allocated(&self) -> u64 {
        self.lock().next_index
    }

    /// Accumulated time spent reading the source.
    pub fn read_time(&self) -> Duration {
        self.lock().read_time
    }

    /// Next segment, or `None` once the source is exhausted, a read failed,
    /// or the pipeline aborted.
    pub fn next_segment(&self) -> Option<Segment> {
        if !self.has_more() {
            return None;
        }

        // ---- Window permit (outside the lock) ----
        let abort = self.coordinator.abort_signal();
        let permit = match &self.window {
            Some(window) => Some(window.acquire(&abort)?),
            None => None,
        };

        // ---- Critical section: check, read, assign ----
        let mut state = self.lock();
        if state.failed || self.coordinator.is_aborted() || state.next_index >= self.total_segments {
            return None;
        }

        let index = state.next_index;
        let expected = segment_len(self.total_len, self.chunk_size, index);

        let start = Instant::now();
        let read = read_exact_or_eof(&mut state.reader, expected);
        state.read_time += start.elapsed();

        let raw = match read {
            Ok(raw) if raw.len() == expected => raw,
            Ok(raw) => {
                state.failed = true;
                drop(state);
                self.coordinator.fail(
                    ErrorKind::SourceRead,
                    format!(
                        "source ended early: segment {index} expected {expected} bytes, got {}",
                        raw.len()
                    ),
                );
                return None;
            }
            Err(e) => {
                state.failed = true;
                drop(state);
                self.coordinator
                    .fail(ErrorKind::SourceRead, format!("read failed at segment {index}: {e}"));
                return None;
            }
        };

        state.next_index += 1;
        drop(state);

        if let Some(permit) = permit {
            permit.consume();
        }

        tracing::debug!(index, len = raw.len(), "segment allocated");
        Some(Segment { index, raw })
    }

    fn has_more(&self) -> bool {
        let state = self.lock();
        !state.failed && !self.coordinator.is_aborted() && state.next_index < self.total_segments
    }

    fn lock(&self) -> MutexGuard<'_, AllocatorState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
