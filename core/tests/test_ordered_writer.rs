// * units flushed in strictly ascending index order regardless of arrival order
// * duplicate / out-of-range submissions are DestinationWrite
// * abort liveness: writer exits and releases the destination
// * submitters vanishing early -> Aborted; stall timeout -> Stalled

#[cfg(test)]
mod tests {
    use std::io::{self, Write};
    use std::sync::{Arc, Mutex};
    use std::thread;
    use std::time::{Duration, Instant};

    use bytes::Bytes;
    use rand::seq::SliceRandom;
    use rand::{Rng, thread_rng};

    use parzip_core::stream::allocator::InflightWindow;
    use parzip_core::stream::coordinator::{CompletionCoordinator, PipelineState};
    use parzip_core::stream::io::SharedBufferWriter;
    use parzip_core::stream::ordered_writer::OrderedWriter;
    use parzip_core::types::{ErrorKind, PipelineError};

    // ------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------
    fn tag(index: u64) -> Bytes {
        Bytes::from(index.to_be_bytes().to_vec())
    }

    fn decode_tags(buf: &[u8]) -> Vec<u64> {
        buf.chunks(8)
            .map(|c| u64::from_be_bytes(c.try_into().unwrap()))
            .collect()
    }

    fn shared_dest() -> (Arc<Mutex<Vec<u8>>>, SharedBufferWriter) {
        let buf = Arc::new(Mutex::new(Vec::new()));
        (buf.clone(), SharedBufferWriter::new(buf))
    }

    /// Destination that fails on the n-th write.
    struct FailingDest {
        writes: usize,
        fail_at: usize,
    }

    impl Write for FailingDest {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.writes += 1;
            if self.writes == self.fail_at {
                return Err(io::Error::new(io::ErrorKind::Other, "disk full"));
            }
            Ok(buf.len())
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    // ------------------------------------------------------------
    // Tests
    // ------------------------------------------------------------
    #[test]
    fn reverse_arrival_is_written_in_order() {
        let coordinator = Arc::new(CompletionCoordinator::new());
        let (buf, dest) = shared_dest();
        let (writer, submitter) = OrderedWriter::new(dest, 5, coordinator.clone(), 8);
        let handle = writer.spawn().unwrap();

        for i in (0..5).rev() {
            submitter.submit(i, tag(i)).unwrap();
        }
        drop(submitter);

        let report = handle.join().unwrap();
        assert_eq!(report.next_expected, 5);
        assert_eq!(report.counters.segments_written, 5);
        assert_eq!(coordinator.outcome(), Some(Ok(())));
        assert_eq!(decode_tags(&buf.lock().unwrap()), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn randomized_latency_preserves_order() {
        let total = 200u64;
        let coordinator = Arc::new(CompletionCoordinator::new());
        let (buf, dest) = shared_dest();
        let (writer, submitter) = OrderedWriter::new(dest, total, coordinator.clone(), 16);
        let handle = writer.spawn().unwrap();

        let mut indices: Vec<u64> = (0..total).collect();
        indices.shuffle(&mut thread_rng());
        let queue = Arc::new(Mutex::new(indices));

        let workers: Vec<_> = (0..6)
            .map(|_| {
                let queue = queue.clone();
                let submitter = submitter.clone();
                thread::spawn(move || loop {
                    let next = queue.lock().unwrap().pop();
                    let Some(i) = next else { break };
                    thread::sleep(Duration::from_micros(thread_rng().gen_range(0..500)));
                    submitter.submit(i, tag(i)).unwrap();
                })
            })
            .collect();
        drop(submitter);
        for w in workers {
            w.join().unwrap();
        }

        handle.join().unwrap();
        assert_eq!(coordinator.outcome(), Some(Ok(())));
        let tags = decode_tags(&buf.lock().unwrap());
        assert_eq!(tags, (0..total).collect::<Vec<_>>());
    }

    #[test]
    fn zero_segments_completes_immediately() {
        let coordinator = Arc::new(CompletionCoordinator::new());
        let (buf, dest) = shared_dest();
        let (writer, submitter) = OrderedWriter::new(dest, 0, coordinator.clone(), 1);
        let report = writer.run();
        drop(submitter);
        assert_eq!(report.next_expected, 0);
        assert_eq!(coordinator.state(), PipelineState::Completed);
        assert!(buf.lock().unwrap().is_empty());
    }

    #[test]
    fn duplicate_index_is_destination_write() {
        let coordinator = Arc::new(CompletionCoordinator::new());
        let (_buf, dest) = shared_dest();
        let (writer, submitter) = OrderedWriter::new(dest, 4, coordinator.clone(), 8);
        let handle = writer.spawn().unwrap();

        submitter.submit(2, tag(2)).unwrap();
        submitter.submit(2, tag(2)).unwrap();

        handle.join().unwrap();
        let err = coordinator.outcome().unwrap().unwrap_err();
        assert_eq!(err.kind, ErrorKind::DestinationWrite);
        assert!(err.message.contains("duplicate"), "{}", err.message);
    }

    #[test]
    fn already_flushed_index_is_destination_write() {
        let coordinator = Arc::new(CompletionCoordinator::new());
        let (_buf, dest) = shared_dest();
        let (writer, submitter) = OrderedWriter::new(dest, 4, coordinator.clone(), 8);
        let handle = writer.spawn().unwrap();

        submitter.submit(0, tag(0)).unwrap();
        submitter.submit(0, tag(0)).unwrap();

        let report = handle.join().unwrap();
        assert_eq!(report.counters.segments_written, 1);
        assert_eq!(coordinator.outcome().unwrap().unwrap_err().kind, ErrorKind::DestinationWrite);
    }

    #[test]
    fn out_of_range_index_is_destination_write() {
        let coordinator = Arc::new(CompletionCoordinator::new());
        let (_buf, dest) = shared_dest();
        let (writer, submitter) = OrderedWriter::new(dest, 2, coordinator.clone(), 8);
        let handle = writer.spawn().unwrap();
        submitter.submit(7, tag(7)).unwrap();
        handle.join().unwrap();
        assert_eq!(coordinator.outcome().unwrap().unwrap_err().kind, ErrorKind::DestinationWrite);
    }

    #[test]
    fn write_failure_is_destination_write() {
        let coordinator = Arc::new(CompletionCoordinator::new());
        let dest = FailingDest { writes: 0, fail_at: 2 };
        let (writer, submitter) = OrderedWriter::new(dest, 3, coordinator.clone(), 8);
        let handle = writer.spawn().unwrap();
        for i in 0..3 {
            // The writer may already be gone after the failure.
            let _ = submitter.submit(i, tag(i));
        }
        let report = handle.join().unwrap();
        assert_eq!(report.counters.segments_written, 1);
        let err = coordinator.outcome().unwrap().unwrap_err();
        assert_eq!(err.kind, ErrorKind::DestinationWrite);
        assert!(err.message.contains("segment 1"), "{}", err.message);
    }

    #[test]
    fn abort_releases_destination_and_discards_pending() {
        let coordinator = Arc::new(CompletionCoordinator::new());
        let (buf, dest) = shared_dest();
        let (writer, submitter) = OrderedWriter::new(dest, 10, coordinator.clone(), 16);
        let handle = writer.spawn().unwrap();

        // Index 0 never arrives, so these stay pending.
        for i in 1..4 {
            submitter.submit(i, tag(i)).unwrap();
        }
        thread::sleep(Duration::from_millis(50));

        let start = Instant::now();
        coordinator.report_error(PipelineError::aborted("cancelled"));
        let report = handle.join().unwrap();
        assert!(start.elapsed() < Duration::from_secs(2), "writer must exit promptly");

        assert_eq!(report.counters.segments_written, 0);
        assert_eq!(report.counters.segments_discarded, 3);
        assert!(buf.lock().unwrap().is_empty());
        // Destination dropped: the shared buffer has a single owner again.
        assert_eq!(Arc::strong_count(&buf), 1);
        // Writer is gone, so submission fails.
        assert!(submitter.submit(0, tag(0)).is_err());
    }

    #[test]
    fn submitters_gone_early_is_aborted() {
        let coordinator = Arc::new(CompletionCoordinator::new());
        let (_buf, dest) = shared_dest();
        let (writer, submitter) = OrderedWriter::new(dest, 3, coordinator.clone(), 8);
        let handle = writer.spawn().unwrap();
        submitter.submit(0, tag(0)).unwrap();
        drop(submitter);

        handle.join().unwrap();
        let err = coordinator.outcome().unwrap().unwrap_err();
        assert_eq!(err.kind, ErrorKind::Aborted);
        assert!(err.message.contains("before segment 1"), "{}", err.message);
    }

    #[test]
    fn stall_timeout_reports_stalled() {
        let coordinator = Arc::new(CompletionCoordinator::new());
        let (_buf, dest) = shared_dest();
        let (writer, submitter) = OrderedWriter::new(dest, 2, coordinator.clone(), 8);
        let writer = writer.with_stall_timeout(Some(Duration::from_millis(100)));
        let handle = writer.spawn().unwrap();

        submitter.submit(0, tag(0)).unwrap();
        // Keep the submitter alive but silent.
        let report = handle.join().unwrap();
        assert_eq!(report.next_expected, 1);
        assert_eq!(coordinator.outcome().unwrap().unwrap_err().kind, ErrorKind::Stalled);
        drop(submitter);
    }

    #[test]
    fn flushed_units_return_window_permits() {
        let coordinator = Arc::new(CompletionCoordinator::new());
        let window = InflightWindow::new(3);
        // Simulate three allocations.
        let abort = coordinator.abort_signal();
        for _ in 0..3 {
            window.acquire(&abort).unwrap().consume();
        }
        assert_eq!(window.available(), 0);

        let (_buf, dest) = shared_dest();
        let (writer, submitter) = OrderedWriter::new(dest, 3, coordinator.clone(), 8);
        let handle = writer.with_window(window.clone()).spawn().unwrap();
        for i in 0..3 {
            submitter.submit(i, tag(i)).unwrap();
        }
        handle.join().unwrap();
        assert_eq!(window.available(), 3);
    }
}
