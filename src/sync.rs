use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

/// Why the frame loop woke up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wakeup {
    Vblank,
    Shutdown,
}

#[derive(Debug, Default)]
struct SignalState {
    /// At most one wakeup is ever pending
    pending: bool,
    shutdown: bool,
    /// Signals that arrived while one was already pending
    coalesced: u64,
}

/// Hand-off between whoever produces vertical blanks (a rasterizer, a
/// timer thread) and the frame loop that consumes them.
///
/// Cloning gives another handle to the same signal. Notifications
/// coalesce: if the loop is still busy with a frame, any number of
/// `notify` calls leave exactly one wakeup pending.
#[derive(Debug, Clone, Default)]
pub struct VblankSignal {
    inner: Arc<(Mutex<SignalState>, Condvar)>,
}

impl VblankSignal {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, SignalState> {
        // The state is plain flags, still consistent if a holder panicked
        self.inner.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Report that a vertical blank started
    pub fn notify(&self) {
        let mut state = self.state();
        if state.pending {
            state.coalesced += 1;
        } else {
            state.pending = true;
        }
        drop(state);
        self.inner.1.notify_one();
    }

    /// Ask the loop to exit at its next wait
    pub fn shutdown(&self) {
        self.state().shutdown = true;
        self.inner.1.notify_all();
    }

    /// Block until a vertical blank or a shutdown request.
    /// Shutdown wins when both are pending.
    pub fn wait(&self) -> Wakeup {
        let mut state = self.state();
        while !state.pending && !state.shutdown {
            state = self
                .inner
                .1
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        Self::take(&mut state)
    }

    /// Non-blocking version of [`VblankSignal::wait`]
    pub fn try_take(&self) -> Option<Wakeup> {
        let mut state = self.state();
        if state.pending || state.shutdown {
            Some(Self::take(&mut state))
        } else {
            None
        }
    }

    fn take(state: &mut SignalState) -> Wakeup {
        if state.shutdown {
            Wakeup::Shutdown
        } else {
            state.pending = false;
            Wakeup::Vblank
        }
    }

    pub fn is_pending(&self) -> bool {
        self.state().pending
    }

    /// Total notifications merged into an already pending one
    pub fn coalesced_count(&self) -> u64 {
        self.state().coalesced
    }
}
