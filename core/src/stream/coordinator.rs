//! Single-fire completion signaling shared by the allocator, workers and writer.
//!
//! - The first `report_success` / `report_error` wins; later reports are no-ops.
//! - An error sets the abort flag and disconnects the abort channel, which wakes
//!   every component blocked in a `select!` on `abort_signal()`.
//! - The outcome is also pushed into a one-shot channel for `wait_outcome_timeout`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use crossbeam::channel::{Receiver, Sender, bounded};

use crate::types::{ErrorKind, PipelineError};

/// Lifecycle of one pipeline run. Terminal states never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Init,
    Running,
    Completed,
    Failed,
}

pub type Outcome = Result<(), PipelineError>;

/// Invoked exactly once with the terminal outcome.
pub type OutcomeNotifier = Box<dyn FnOnce(&Outcome) + Send>;

struct CoordinatorState {
    state: PipelineState,
    outcome: Option<Outcome>,
    // Dropped on failure to broadcast the abort.
    abort_tx: Option<Sender<()>>,
    notifier: Option<OutcomeNotifier>,
}

pub struct CompletionCoordinator {
    inner: Mutex<CoordinatorState>,
    aborted: AtomicBool,
    abort_rx: Receiver<()>,
    result_tx: Sender<Outcome>,
    result_rx: Receiver<Outcome>,
}

impl Default for CompletionCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl CompletionCoordinator {
    pub fn new() -> Self {
        let (abort_tx, abort_rx) = bounded::<()>(0);
        let (result_tx, result_rx) = bounded::<Outcome>(1);
        Self {
            inner: Mutex::new(CoordinatorState {
                state: PipelineState::Init,
                outcome: None,
                abort_tx: Some(abort_tx),
                notifier: None,
            }),
            aborted: AtomicBool::new(false),
            abort_rx,
            result_tx,
            result_rx,
        }
    }

    /// Register the terminal notifier. Replaces any earlier one; ignored once
    /// an outcome has been recorded.
    pub fn set_notifier(&self, notifier: OutcomeNotifier) {
        let mut inner = self.lock();
        if inner.outcome.is_none() {
            inner.notifier = Some(notifier);
        }
    }

    pub fn mark_running(&self) {
        let mut inner = self.lock();
        if inner.state == PipelineState::Init {
            inner.state = PipelineState::Running;
        }
    }

    /// Record success. Returns `false` if an outcome was already recorded.
    pub fn report_success(&self) -> bool {
        self.finish(Ok(()))
    }

    /// Record a failure and broadcast the abort.
    /// Returns `false` if an outcome was already recorded.
    pub fn report_error(&self, error: PipelineError) -> bool {
        self.finish(Err(error))
    }

    pub fn fail(&self, kind: ErrorKind, message: impl Into<String>) -> bool {
        self.report_error(PipelineError::new(kind, message))
    }

    fn finish(&self, outcome: Outcome) -> bool {
        let notifier = {
            let mut inner = self.lock();
            if let Some(prev) = &inner.outcome {
                tracing::debug!(?prev, late = ?outcome, "outcome already recorded; late report ignored");
                return false;
            }

            match &outcome {
                Ok(()) => inner.state = PipelineState::Completed,
                Err(e) => {
                    inner.state = PipelineState::Failed;
                    self.aborted.store(true, Ordering::SeqCst);
                    inner.abort_tx.take();
                    tracing::warn!(kind = ?e.kind, "pipeline failed: {}", e.message);
                }
            }

            // Capacity 1 and only ever sent here, under the lock.
            let _ = self.result_tx.try_send(outcome.clone());
            inner.outcome = Some(outcome.clone());
            inner.notifier.take()
        };

        // Outside the lock so the notifier may query the coordinator.
        if let Some(notify) = notifier {
            notify(&outcome);
        }
        true
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::SeqCst)
    }

    /// Receiver that becomes ready (disconnected) once the pipeline fails.
    /// Never yields a value.
    pub fn abort_signal(&self) -> Receiver<()> {
        self.abort_rx.clone()
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.lock().outcome.clone()
    }

    pub fn state(&self) -> PipelineState {
        self.lock().state
    }

    /// Block until the terminal outcome is recorded or `timeout` elapses.
    pub fn wait_outcome_timeout(&self, timeout: Duration) -> Option<Outcome> {
        if let Some(outcome) = self.outcome() {
            return Some(outcome);
        }
        match self.result_rx.recv_timeout(timeout) {
            Ok(outcome) => Some(outcome),
            // The message may have been taken by an earlier waiter.
            Err(_) => self.outcome(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CoordinatorState> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
