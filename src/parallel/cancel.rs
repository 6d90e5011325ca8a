//! Two-stage cancellation
//!
//! ```text
//! Running ──interrupt──▶ Cancelling ──interrupt──▶ ForceExit
//! ```
//!
//! `Cancelling` asks workers to stop taking new records while letting running
//! children finish. `ForceExit` is for the owner of the process: it should
//! terminate immediately without waiting for workers or flushing output.
//! States only move forward.

use crossbeam::channel::{Receiver, Sender, bounded};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum CancelState {
    Running = 0,
    Cancelling = 1,
    ForceExit = 2,
}

impl CancelState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => CancelState::Running,
            1 => CancelState::Cancelling,
            _ => CancelState::ForceExit,
        }
    }
}

struct Inner {
    state: AtomicU8,
    // Dropped on the first transition; waiters see their receiver disconnect
    wake_tx: Mutex<Option<Sender<()>>>,
    wake_rx: Receiver<()>,
}

/// Shared cancellation signal, cheap to clone
#[derive(Clone)]
pub struct CancelSignal {
    inner: Arc<Inner>,
}

impl CancelSignal {
    pub fn new() -> Self {
        let (wake_tx, wake_rx) = bounded(0);
        Self {
            inner: Arc::new(Inner {
                state: AtomicU8::new(CancelState::Running as u8),
                wake_tx: Mutex::new(Some(wake_tx)),
                wake_rx,
            }),
        }
    }

    pub fn state(&self) -> CancelState {
        CancelState::from_u8(self.inner.state.load(Ordering::Acquire))
    }

    pub fn is_cancelled(&self) -> bool {
        self.state() != CancelState::Running
    }

    /// Request a graceful stop. Returns `true` if this call made the transition.
    pub fn cancel(&self) -> bool {
        let changed = self
            .inner
            .state
            .compare_exchange(
                CancelState::Running as u8,
                CancelState::Cancelling as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok();
        self.wake();
        changed
    }

    /// Escalate straight to `ForceExit`
    pub fn force_exit(&self) {
        self.inner
            .state
            .store(CancelState::ForceExit as u8, Ordering::Release);
        self.wake();
    }

    /// Advance one step, as a repeated interrupt would, and return the new state
    pub fn interrupt(&self) -> CancelState {
        let previous = self
            .inner
            .state
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |state| {
                Some((state + 1).min(CancelState::ForceExit as u8))
            })
            .unwrap_or_else(|state| state);
        self.wake();
        CancelState::from_u8((previous + 1).min(CancelState::ForceExit as u8))
    }

    /// Channel that disconnects once cancellation is requested, for use in `select!`
    pub fn notified(&self) -> &Receiver<()> {
        &self.inner.wake_rx
    }

    fn wake(&self) {
        self.inner
            .wake_tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }
}

impl Default for CancelSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CancelSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancelSignal")
            .field("state", &self.state())
            .finish()
    }
}
