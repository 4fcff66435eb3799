//! Small drop-guard helpers used to give workflow steps and worker loops a
//! deterministic teardown point instead of scattering cleanup at every
//! return site.

/// Aborts the process if dropped while unwinding. Held by a worker thread
/// while running a task body: per spec §7 the runtime has no recovery story
/// for a task body panicking mid-dependency-mutation, so we prefer a clean
/// abort over limping on with a possibly-corrupt dependency graph.
pub struct AbortIfPanic {
    armed: bool,
}

impl Default for AbortIfPanic {
    fn default() -> Self {
        Self::new()
    }
}

impl AbortIfPanic {
    pub fn new() -> Self {
        Self { armed: true }
    }

    /// Disarms the guard; use once the protected section has completed
    /// without panicking.
    pub fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for AbortIfPanic {
    fn drop(&mut self) {
        if self.armed && std::thread::panicking() {
            tracing::error!("unwinding through a protected task-execution section; aborting");
            std::process::abort();
        }
    }
}

/// Runs a closure once, when dropped, Go-style `defer`. Used by workflow
/// steps to release successors exactly once regardless of which exit path
/// the step takes.
pub struct RunOnDrop<F: FnOnce()>(Option<F>);

impl<F: FnOnce()> RunOnDrop<F> {
    pub fn new(f: F) -> Self {
        Self(Some(f))
    }

    /// Cancels the pending callback without running it.
    pub fn cancel(mut self) {
        self.0 = None;
    }
}

impl<F: FnOnce()> Drop for RunOnDrop<F> {
    fn drop(&mut self) {
        if let Some(cb) = self.0.take() {
            cb();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[test]
    fn run_on_drop_fires_once() {
        let fired = AtomicBool::new(false);
        {
            let _guard = RunOnDrop::new(|| fired.store(true, Ordering::SeqCst));
        }
        assert!(fired.load(Ordering::SeqCst));
    }

    #[test]
    fn cancelled_guard_does_not_fire() {
        let fired = AtomicBool::new(false);
        {
            let guard = RunOnDrop::new(|| fired.store(true, Ordering::SeqCst));
            guard.cancel();
        }
        assert!(!fired.load(Ordering::SeqCst));
    }
}
