//! Condvar-backed wake primitive. Used by the worker pool to park a CPU
//! thread without burning cycles and to wake it deterministically once
//! ready work appears, without losing a wake-up that races the park.

use std::sync::{Condvar, Mutex};

/// Current state of a [`LockSignal`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LockState {
    /// Nobody is waiting and nothing has been signaled.
    Free,
    /// A waiter has called [`LockSignal::lock`] and is about to wait.
    Locked,
    /// A signal has been delivered; the next `wait` consumes it immediately.
    Released,
}

enum NotifyDirective {
    One,
    All,
}

/// A single-slot wake latch: a waiter `lock()`s then `wait()`s, a notifier
/// calls `signal_one`/`signal_all`. `wait` never misses a signal sent after
/// `lock` even if it arrives before `wait` itself is reached.
pub struct LockSignal {
    event: Condvar,
    state: Mutex<LockState>,
}

impl Default for LockSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl LockSignal {
    pub fn new() -> Self {
        Self {
            event: Condvar::new(),
            state: Mutex::new(LockState::Free),
        }
    }

    fn signal(&self, directive: NotifyDirective) {
        let mut state = self.state.lock().unwrap();
        *state = LockState::Released;
        drop(state);

        match directive {
            NotifyDirective::One => self.event.notify_one(),
            NotifyDirective::All => self.event.notify_all(),
        }
    }

    pub fn signal_one(&self) {
        self.signal(NotifyDirective::One);
    }

    pub fn signal_all(&self) {
        self.signal(NotifyDirective::All);
    }

    pub fn probe(&self) -> LockState {
        *self.state.lock().unwrap()
    }

    pub fn probe_locked(&self) -> bool {
        matches!(self.probe(), LockState::Locked)
    }

    /// Marks this signal as locked, unless it already is. Returns `true` if
    /// the caller transitioned it from `Free`.
    pub fn try_lock(&self) -> bool {
        let mut state = self.state.lock().unwrap();
        if *state == LockState::Locked {
            return false;
        }
        *state = LockState::Locked;
        true
    }

    pub fn lock(&self) {
        let mut state = self.state.lock().unwrap();
        if *state != LockState::Locked {
            *state = LockState::Locked;
        }
    }

    /// Blocks until a signal arrives. No-ops if the signal is already `Free`
    /// (i.e. nobody ever locked it), callers must `lock()` first to avoid a
    /// spurious immediate return.
    pub fn wait(&self) {
        let mut state = self.state.lock().unwrap();
        if *state == LockState::Free {
            return;
        }
        loop {
            if *state == LockState::Released {
                *state = LockState::Free;
                return;
            }
            state = self.event.wait(state).unwrap();
        }
    }
}
