//! Scenario 5 (spec §8, 2 nodes): T1 with IN x where x lives on node 1,
//! submitted on node 0. The locality policy picks node 1; a `TaskNew` is
//! built with read+write satisfiability marked; a remote wrapper is
//! registered in the target's namespace registry; once the remote body
//! finishes, `TaskFinished` releases the offloader's local representation
//! (its `remote_completion` step).
//!
//! The messenger transport itself is out of scope (spec §1), this test
//! drives the message payloads directly between two in-process
//! `NodeNamespaceRegistry`/`WorkflowArena` pairs standing in for the two
//! nodes, exercising the interfaces without a real wire.

#[cfg(test)]
mod tests {
    use taskmesh_cluster::{try_offload, ClusterTaskContext, NodeNamespaceRegistry, Offload, OffloadAccess};
    use taskmesh_numa::{DsmDirectory, NumaDirectory};
    use taskmesh_scheduler::LocalityPolicy;
    use taskmesh_sync::EntryList;
    use taskmesh_types::{MemoryRegion, NodeId};
    use taskmesh_workflow::WorkflowArena;

    struct AllDsm;
    impl DsmDirectory for AllDsm {
        fn is_dsm_address(&self, _addr: usize) -> bool {
            true
        }
        fn home_node_of(&self, _addr: usize) -> Option<NodeId> {
            None
        }
        fn block_size(&self) -> usize {
            64
        }
        fn acquire(&self) {}
        fn selective_acquire(&self, _addr: usize, _size: usize) {}
        fn release(&self) {}
    }

    #[test]
    fn offload_picks_the_owning_node_and_releases_on_task_finished() {
        // node 0 (offloader) state
        let offloader_arena = WorkflowArena::new();
        let dsm = AllDsm;
        let directory = NumaDirectory::new(64);
        // x's home block lives on node 1.
        directory.record_first_touch(0, 1);
        let locality = LocalityPolicy::new(&directory, &dsm);
        let message_ids = taskmesh_cluster::MessageIdAllocator::new(0);

        let region = MemoryRegion::new(0, 64);
        let access = OffloadAccess { region, read: true, write: false, concurrent: false, commutative: false };

        let Offload { target, message, context } = try_offload(
            &offloader_arena,
            &locality,
            2,
            &message_ids,
            "t1",
            0,
            &[access],
            1,
            None,
        )
        .expect("x's accesses are all cluster-managed, so the task must be offloadable");

        assert_eq!(target, 1, "the locality policy must pick the node that owns x");
        assert_eq!(message.accesses.len(), 1);
        assert!(message.accesses[0].read);

        // node 1 (target): the node-namespace task receives TaskNew and
        // spawns a local wrapper task, recording it in its registry.
        let mut wrapper_tasks: EntryList<()> = EntryList::new();
        let wrapper = wrapper_tasks.insert(());
        let namespace = NodeNamespaceRegistry::new();
        namespace.register_wrapper(message.remote_task_id, wrapper);
        assert_eq!(namespace.wrapper_for(message.remote_task_id), Some(wrapper));

        // T1's body runs remotely; node 1 sends TaskFinished back.
        namespace.remove_wrapper(message.remote_task_id);
        assert!(namespace.wrapper_for(message.remote_task_id).is_none());

        // back on node 0: TaskFinished releases the offload step's
        // remote-completion successor, which is how the local T1
        // representation's successors get released in turn.
        let ready = offloader_arena.complete(context.offload_step);
        assert_eq!(ready, vec![context.remote_completion_step]);
        let fully_done = offloader_arena.complete(context.remote_completion_step);
        assert!(fully_done.is_empty(), "remote_completion has no declared successors in this test");

        let _: ClusterTaskContext = context;
    }
}
