//! Background execution of a batch and the start/cancel toggle around it.
//!
//! A `WorkerHandle` owns one worker thread running `BatchRunner::run_all`.
//! When the batch ends the thread calls the finish callback exactly once,
//! then resets the shared token under its guard. Interrupts are cooperative:
//! signalling the token makes the fetcher stop at its next checkpoint, and the
//! HTTP layer aborts a transfer that is blocked waiting for data.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use crate::batch::{BatchOutcome, BatchRunner};
use crate::cancel::CancellationToken;
use crate::job::FetchJob;

#[derive(Debug, Default)]
struct WorkerState {
    /// Cleared by the worker thread, under the token guard, after the token reset.
    running: AtomicBool,
    interrupt_requested: AtomicBool,
}

/// Resets the token and clears `running` when the worker thread ends,
/// including by panic.
struct FinishGuard<'a> {
    token: &'a CancellationToken,
    state: &'a WorkerState,
}

impl Drop for FinishGuard<'_> {
    fn drop(&mut self) {
        let mut guard = self.token.lock();
        guard.reset();
        self.state.running.store(false, Ordering::Release);
    }
}

#[derive(Debug)]
pub struct WorkerHandle {
    thread: JoinHandle<BatchOutcome>,
    token: CancellationToken,
    state: Arc<WorkerState>,
}

impl WorkerHandle {
    /// Start `jobs` on a new thread. `on_finish` receives the batch outcome
    /// before the token is reset.
    pub fn spawn<F>(
        runner: Arc<BatchRunner>,
        jobs: Vec<FetchJob>,
        token: CancellationToken,
        on_finish: F,
    ) -> io::Result<Self>
    where
        F: FnOnce(BatchOutcome) + Send + 'static,
    {
        let state = Arc::new(WorkerState {
            running: AtomicBool::new(true),
            interrupt_requested: AtomicBool::new(false),
        });
        let thread = {
            let token = token.clone();
            let state = Arc::clone(&state);
            thread::Builder::new()
                .name("depfetch-worker".into())
                .spawn(move || {
                    let _finish = FinishGuard {
                        token: &token,
                        state: &state,
                    };
                    let outcome = runner.run_all(&jobs, &token).outcome();
                    on_finish(outcome);
                    tracing::debug!(?outcome, "worker finished");
                    outcome
                })?
        };
        Ok(Self {
            thread,
            token,
            state,
        })
    }

    /// Ask the worker to stop. Returns false when the batch already ended,
    /// in which case the token is left untouched.
    pub fn request_interrupt(&self) -> bool {
        let mut guard = self.token.lock();
        if !self.state.running.load(Ordering::Acquire) {
            return false;
        }
        guard.signal();
        self.state.interrupt_requested.store(true, Ordering::Release);
        tracing::info!("interrupt requested");
        true
    }

    pub fn is_running(&self) -> bool {
        self.state.running.load(Ordering::Acquire)
    }

    pub fn interrupt_requested(&self) -> bool {
        self.state.interrupt_requested.load(Ordering::Acquire)
    }

    /// Wait for the worker. A panic on the worker thread is re-raised here.
    pub fn join(self) -> BatchOutcome {
        match self.thread.join() {
            Ok(outcome) => outcome,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ControlError {
    #[error("a batch is already running or its cancellation is still pending")]
    Busy,
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] io::Error),
}

/// Owns the cancellation token and at most one running batch.
#[derive(Debug)]
pub struct Controller {
    runner: Arc<BatchRunner>,
    token: CancellationToken,
    current: Mutex<Option<Arc<WorkerState>>>,
}

impl Controller {
    pub fn new(runner: Arc<BatchRunner>) -> Self {
        Self {
            runner,
            token: CancellationToken::new(),
            current: Mutex::new(None),
        }
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// True while a batch runs or a cancel has not been reset yet.
    pub fn is_busy(&self) -> bool {
        let guard = self.token.lock();
        guard.is_signalled() || self.current_running()
    }

    fn current_running(&self) -> bool {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|s| s.running.load(Ordering::Acquire))
    }

    /// Start a batch. Refused with `Busy` while another one is in flight.
    pub fn start<F>(&self, jobs: Vec<FetchJob>, on_finish: F) -> Result<WorkerHandle, ControlError>
    where
        F: FnOnce(BatchOutcome) + Send + 'static,
    {
        let guard = self.token.lock();
        if guard.is_signalled() || self.current_running() {
            return Err(ControlError::Busy);
        }
        let handle = WorkerHandle::spawn(
            Arc::clone(&self.runner),
            jobs,
            self.token.clone(),
            on_finish,
        )?;
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) =
            Some(Arc::clone(&handle.state));
        drop(guard);
        tracing::info!("batch started");
        Ok(handle)
    }

    /// Request cancellation of the batch behind `handle`.
    pub fn cancel(&self, handle: &WorkerHandle) -> bool {
        handle.request_interrupt()
    }
}
