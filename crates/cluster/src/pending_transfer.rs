//! In-flight transfer de-duplication for the cluster data-fetch step
//! (spec §4.4): a fetch that is fully covered by an already-in-flight
//! transfer attaches a completion callback instead of issuing a duplicate
//! `fetch_data` call.

use std::sync::Mutex;

use taskmesh_types::MemoryRegion;

use crate::messenger::PendingTransfer;

type Callback = Box<dyn FnOnce() + Send>;

struct InFlight {
    region: MemoryRegion,
    handle: PendingTransfer,
    callbacks: Vec<Callback>,
}

#[derive(Default)]
pub struct PendingTransferTracker {
    inflight: Mutex<Vec<InFlight>>,
}

impl PendingTransferTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ensures `region` is (or will be) fetched exactly once, regardless
    /// of how many callers need it. If an in-flight transfer already
    /// fully covers `region`, `on_completed` is queued against it and
    /// `issue` is never called; otherwise `issue` fires one new transfer
    /// and `on_completed` runs once `complete` is reported for it.
    pub fn register_or_attach(
        &self,
        region: MemoryRegion,
        on_completed: impl FnOnce() + Send + 'static,
        issue: impl FnOnce() -> PendingTransfer,
    ) {
        let mut inflight = self.inflight.lock().unwrap();
        if let Some(entry) = inflight.iter_mut().find(|e| e.region.contains(&region)) {
            entry.callbacks.push(Box::new(on_completed));
            return;
        }
        let handle = issue();
        inflight.push(InFlight { region, handle, callbacks: vec![Box::new(on_completed)] });
    }

    /// Reports `handle` as completed, returning every callback attached
    /// to it so the caller can run them outside this lock.
    pub fn complete(&self, handle: PendingTransfer) -> Vec<Callback> {
        let mut inflight = self.inflight.lock().unwrap();
        match inflight.iter().position(|e| e.handle == handle) {
            Some(pos) => inflight.remove(pos).callbacks,
            None => Vec::new(),
        }
    }

    pub fn in_flight_count(&self) -> usize {
        self.inflight.lock().unwrap().len()
    }
}
