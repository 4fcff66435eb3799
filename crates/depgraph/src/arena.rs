use std::sync::Mutex;

use taskmesh_sync::EntryList;
use taskmesh_types::{AccessHandle, DataAccess};

/// Arena owning every `DataAccess` record currently live in the dependency
/// graph, indexed by handle (spec §9: arena-of-handles instead of an
/// intrusive linked list). Locked briefly per operation; never held across
/// a call into the scheduler (spec §5 locking discipline).
#[derive(Default)]
pub struct AccessArena {
    items: Mutex<EntryList<DataAccess>>,
}

impl AccessArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, access: DataAccess) -> AccessHandle {
        self.items.lock().unwrap().insert(access)
    }

    pub fn with<R>(&self, handle: AccessHandle, f: impl FnOnce(&DataAccess) -> R) -> Option<R> {
        self.items.lock().unwrap().get(&handle).map(f)
    }

    /// Removes the access record, freeing its slot. Used once an access has
    /// both been unregistered and has no successor still depending on it
    /// (spec §4.1's "destroyed when unregistered and no successor depends
    /// on it").
    pub fn remove(&self, handle: AccessHandle) -> Option<DataAccess> {
        self.items.lock().unwrap().take(&handle)
    }

    pub fn active_count(&self) -> usize {
        self.items.lock().unwrap().active_slots()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskmesh_sync::EntryList;
    use taskmesh_types::{AccessType, MemoryRegion};

    fn sample_access() -> DataAccess {
        let mut tasks: EntryList<()> = EntryList::new();
        let owner = tasks.insert(());
        DataAccess::new(MemoryRegion::new(0, 64), AccessType::In, false, owner)
    }

    #[test]
    fn insert_with_and_remove_round_trip() {
        let arena = AccessArena::new();
        let handle = arena.insert(sample_access());
        assert_eq!(arena.active_count(), 1);
        assert!(arena.with(handle, |_| ()).is_some());

        let removed = arena.remove(handle);
        assert!(removed.is_some());
        assert_eq!(arena.active_count(), 0);
        assert!(arena.with(handle, |_| ()).is_none());
    }

    #[test]
    fn remove_twice_returns_none_the_second_time() {
        let arena = AccessArena::new();
        let handle = arena.insert(sample_access());
        assert!(arena.remove(handle).is_some());
        assert!(arena.remove(handle).is_none());
    }
}
