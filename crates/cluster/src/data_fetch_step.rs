//! Cluster data-fetch step (spec §4.4): skips the transfer entirely when
//! the local node already holds the region's current `WriteId`, and
//! otherwise de-duplicates against any already-in-flight transfer that
//! fully covers the region via [`crate::pending_transfer::PendingTransferTracker`].

use std::sync::Arc;

use taskmesh_types::{MemoryRegion, NodeId, WriteId};
use taskmesh_workflow::{StepHandle, WorkflowArena};

use crate::messenger::{Messenger, PendingTransfer};
use crate::pending_transfer::PendingTransferTracker;

/// Runs the data-fetch step for `step_handle`. `on_ready` is invoked with
/// whichever successors this step's completion released, synchronously
/// if the `WriteId`s already match, or later (from whatever thread
/// observes the transfer's completion) if a fetch had to be issued.
pub fn run(
    step_handle: StepHandle,
    arena: Arc<WorkflowArena>,
    region: MemoryRegion,
    local_write_id: WriteId,
    remote_write_id: WriteId,
    source: NodeId,
    message_id: u32,
    tracker: &PendingTransferTracker,
    messenger: &dyn Messenger,
    on_ready: impl Fn(Vec<StepHandle>) + Send + Sync + 'static,
) {
    if local_write_id == remote_write_id {
        tracing::debug!(region.start, region.size, "data already current, skipping fetch");
        on_ready(arena.complete(step_handle));
        return;
    }

    let on_ready = Arc::new(on_ready);
    let arena_for_completion = Arc::clone(&arena);
    let on_ready_for_completion = Arc::clone(&on_ready);

    tracker.register_or_attach(
        region,
        move || {
            let ready = arena_for_completion.complete(step_handle);
            on_ready_for_completion(ready);
        },
        || messenger.fetch_data(region, source, message_id, false).unwrap_or(PendingTransfer(message_id as u64)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use taskmesh_workflow::{labels, Step};

    struct RecordingMessenger {
        fetches: AtomicUsize,
        next_handle: AtomicUsize,
    }

    impl Messenger for RecordingMessenger {
        fn send_message(&self, _msg: &crate::message::Message, _target: NodeId, _blocking: bool) {}

        fn send_data(
            &self,
            _region: MemoryRegion,
            _target: NodeId,
            _message_id: u32,
            _blocking: bool,
        ) -> Option<PendingTransfer> {
            None
        }

        fn fetch_data(
            &self,
            _region: MemoryRegion,
            _source: NodeId,
            _message_id: u32,
            _blocking: bool,
        ) -> Option<PendingTransfer> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            let id = self.next_handle.fetch_add(1, Ordering::SeqCst) as u64;
            Some(PendingTransfer(id))
        }

        fn check_mail(&self) -> Option<crate::message::Message> {
            None
        }

        fn barrier(&self) {}

        fn test_completion(&self, pending: &[PendingTransfer]) -> Vec<bool> {
            vec![true; pending.len()]
        }
    }

    #[test]
    fn matching_write_id_skips_transfer_entirely() {
        let arena = Arc::new(WorkflowArena::new());
        let handle = arena.insert(Step::new(labels::DATA_FETCH, 0));
        let messenger = RecordingMessenger { fetches: AtomicUsize::new(0), next_handle: AtomicUsize::new(0) };
        let tracker = PendingTransferTracker::new();
        let fired = Arc::new(Mutex::new(false));

        let fired_clone = fired.clone();
        run(
            handle,
            arena,
            MemoryRegion::new(0, 16),
            WriteId(3),
            WriteId(3),
            1,
            0,
            &tracker,
            &messenger,
            move |_ready| *fired_clone.lock().unwrap() = true,
        );

        assert_eq!(messenger.fetches.load(Ordering::SeqCst), 0);
        assert!(*fired.lock().unwrap());
    }

    #[test]
    fn mismatched_write_id_issues_one_fetch_and_completes_on_callback() {
        let arena = Arc::new(WorkflowArena::new());
        let handle = arena.insert(Step::new(labels::DATA_FETCH, 0));
        let messenger = RecordingMessenger { fetches: AtomicUsize::new(0), next_handle: AtomicUsize::new(0) };
        let tracker = PendingTransferTracker::new();
        let fired = Arc::new(Mutex::new(false));

        let fired_clone = fired.clone();
        run(
            handle,
            arena,
            MemoryRegion::new(0, 16),
            WriteId(1),
            WriteId(2),
            1,
            0,
            &tracker,
            &messenger,
            move |_ready| *fired_clone.lock().unwrap() = true,
        );

        assert_eq!(messenger.fetches.load(Ordering::SeqCst), 1);
        assert!(!*fired.lock().unwrap(), "must not complete before the transfer is reported done");

        for cb in tracker.complete(PendingTransfer(0)) {
            cb();
        }
        assert!(*fired.lock().unwrap());
    }
}
