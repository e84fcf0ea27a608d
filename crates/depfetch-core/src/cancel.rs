//! Cross-thread cancellation for a running batch.
//!
//! The controller signals the token; the worker polls it before each request
//! and before each chunk write, and the HTTP transfer thread polls it from
//! libcurl's progress callback so a stalled read is aborted too.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct Inner {
    guard: Mutex<()>,
    /// Only written while `guard` is held; read lock-free on the hot path.
    signalled: AtomicBool,
}

/// Shared cancellation signal. Clones observe and mutate the same state.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    inner: Arc<Inner>,
}

impl CancellationToken {
    /// New token in the "not cancelled" state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn signal(&self) {
        self.lock().signal();
    }

    /// Cheap, non-blocking check used inside the streaming loop.
    pub fn is_signalled(&self) -> bool {
        self.inner.signalled.load(Ordering::Acquire)
    }

    /// Restore the "not cancelled" baseline. Only call when no fetch is in flight.
    pub fn reset(&self) {
        self.lock().reset();
    }

    /// Take the guard for a compound read-then-act sequence.
    /// The guard is released when the returned value is dropped.
    pub fn lock(&self) -> TokenGuard<'_> {
        let held = self
            .inner
            .guard
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        TokenGuard {
            _held: held,
            signalled: &self.inner.signalled,
        }
    }
}

/// Exclusive access to a token's state.
pub struct TokenGuard<'a> {
    _held: MutexGuard<'a, ()>,
    signalled: &'a AtomicBool,
}

impl TokenGuard<'_> {
    pub fn is_signalled(&self) -> bool {
        self.signalled.load(Ordering::Acquire)
    }

    pub fn signal(&mut self) {
        self.signalled.store(true, Ordering::Release);
    }

    pub fn reset(&mut self) {
        self.signalled.store(false, Ordering::Release);
    }

    /// Flip the state and return the new value.
    pub fn toggle(&mut self) -> bool {
        let next = !self.is_signalled();
        self.signalled.store(next, Ordering::Release);
        next
    }
}
