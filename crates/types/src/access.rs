//! Per-region access declarations and their satisfiability state machine.
//!
//! Each access type gets its own small automaton over the same physical
//! bitfield (see spec §4.1): IN only ever needs `read`, OUT/INOUT need both
//! `read` and `write`, CONCURRENT/COMMUTATIVE use their own flag. All flags
//! are sticky, once set they are never cleared on a live access, which is
//! what gives us the monotonicity property in §8.

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Mutex;

use taskmesh_sync::Entry;

use crate::region::{MemoryPlace, MemoryRegion, WriteId};
use crate::task::TaskHandle;

/// The kind of use a task declares against a memory region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessType {
    In,
    Out,
    InOut,
    Concurrent,
    Commutative,
    Reduction,
    NoAccess,
}

impl AccessType {
    /// Whether this access type requires `read_satisfied` before the task
    /// may start observing the region.
    pub fn needs_read(&self) -> bool {
        matches!(self, AccessType::In | AccessType::InOut)
    }

    /// Whether this access type requires `write_satisfied` before the task
    /// may start mutating the region.
    pub fn needs_write(&self) -> bool {
        matches!(self, AccessType::Out | AccessType::InOut)
    }
}

bitflags::bitflags! {
    /// Physical bit layout of a [`Satisfiability`] word. Matches spec §3's
    /// `DataAccess` atomic bitfield one-to-one.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct SatBits: u8 {
        const READ         = 0b0000_0001;
        const WRITE        = 0b0000_0010;
        const CONCURRENT   = 0b0000_0100;
        const COMMUTATIVE  = 0b0000_1000;
        const COMPLETE     = 0b0001_0000;
        const UNREGISTERED = 0b0010_0000;
        const HAS_NEXT     = 0b0100_0000;
        const IS_WEAK      = 0b1000_0000;
    }
}

/// Atomic bitfield tracking an access's progress through its satisfiability
/// automaton. Transitions are named methods, never raw bit twiddling, per
/// the re-architecture guidance in spec §9.
#[derive(Debug)]
pub struct Satisfiability(AtomicU8);

impl Default for Satisfiability {
    fn default() -> Self {
        Self::new(false)
    }
}

impl Satisfiability {
    pub fn new(is_weak: bool) -> Self {
        let bits = if is_weak { SatBits::IS_WEAK } else { SatBits::empty() };
        Self(AtomicU8::new(bits.bits()))
    }

    fn set(&self, bit: SatBits) -> bool {
        let prev = self.0.fetch_or(bit.bits(), Ordering::AcqRel);
        SatBits::from_bits_truncate(prev).intersection(bit) != bit
    }

    fn has(&self, bit: SatBits) -> bool {
        SatBits::from_bits_truncate(self.0.load(Ordering::Acquire)).contains(bit)
    }

    /// Marks `read_satisfied`. Returns `true` the first time this is set
    /// (i.e. the event that actually changed state) so callers can decide
    /// whether to propagate further.
    pub fn mark_read_satisfied(&self) -> bool {
        self.set(SatBits::READ)
    }

    pub fn mark_write_satisfied(&self) -> bool {
        self.set(SatBits::WRITE)
    }

    pub fn mark_concurrent_satisfied(&self) -> bool {
        self.set(SatBits::CONCURRENT)
    }

    pub fn mark_commutative_satisfied(&self) -> bool {
        self.set(SatBits::COMMUTATIVE)
    }

    pub fn mark_complete(&self) -> bool {
        self.set(SatBits::COMPLETE)
    }

    /// Marks the access unregistered. Returns `false` if it was already
    /// unregistered, a double-unregister is a dependency protocol
    /// violation per spec §7 and callers should treat that as fatal.
    pub fn mark_unregistered(&self) -> bool {
        self.set(SatBits::UNREGISTERED)
    }

    pub fn set_has_next(&self) -> bool {
        self.set(SatBits::HAS_NEXT)
    }

    pub fn is_read_satisfied(&self) -> bool {
        self.has(SatBits::READ)
    }

    pub fn is_write_satisfied(&self) -> bool {
        self.has(SatBits::WRITE)
    }

    pub fn is_concurrent_satisfied(&self) -> bool {
        self.has(SatBits::CONCURRENT)
    }

    pub fn is_commutative_satisfied(&self) -> bool {
        self.has(SatBits::COMMUTATIVE)
    }

    pub fn is_complete(&self) -> bool {
        self.has(SatBits::COMPLETE)
    }

    pub fn is_unregistered(&self) -> bool {
        self.has(SatBits::UNREGISTERED)
    }

    pub fn has_next(&self) -> bool {
        self.has(SatBits::HAS_NEXT)
    }

    pub fn is_weak(&self) -> bool {
        self.has(SatBits::IS_WEAK)
    }

    /// True once every flag the given access type demands for readiness is
    /// set, per the "ready only when satisfied to the degree their type
    /// demands" invariant in spec §3.
    pub fn satisfies(&self, kind: AccessType) -> bool {
        match kind {
            AccessType::In => self.is_read_satisfied(),
            AccessType::Out | AccessType::InOut => {
                self.is_read_satisfied() && self.is_write_satisfied()
            }
            AccessType::Concurrent => self.is_concurrent_satisfied(),
            AccessType::Commutative => self.is_commutative_satisfied(),
            AccessType::Reduction => self.is_write_satisfied(),
            AccessType::NoAccess => true,
        }
    }
}

/// Coordinates per-thread reduction slots for a `REDUCTION` access chain.
/// The first writer allocates the slot bitmap; each contributor claims one
/// slot; the combiner merges all claimed slots once every reducer has
/// completed.
#[derive(Debug)]
pub struct ReductionInfo {
    /// Identifies which reduction operator/variable this chain combines;
    /// opaque to the dependency engine, meaningful to the application.
    pub operator: u32,
    pub index: usize,
    slot_count: u8,
    free_slots: AtomicU64,
}

impl ReductionInfo {
    pub fn new(operator: u32, index: usize, slot_count: u8) -> Self {
        debug_assert!(slot_count <= 64, "slot bitmap is a u64");
        let all_free = if slot_count == 64 {
            u64::MAX
        } else {
            (1u64 << slot_count) - 1
        };
        Self {
            operator,
            index,
            slot_count,
            free_slots: AtomicU64::new(all_free),
        }
    }

    /// Claims the lowest-numbered free slot, if any remain.
    pub fn claim_slot(&self) -> Option<u8> {
        loop {
            let current = self.free_slots.load(Ordering::Acquire);
            if current == 0 {
                return None;
            }
            let slot = current.trailing_zeros() as u8;
            let next = current & !(1u64 << slot);
            if self
                .free_slots
                .compare_exchange(current, next, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                return Some(slot);
            }
        }
    }

    pub fn release_slot(&self, slot: u8) {
        debug_assert!(slot < self.slot_count);
        self.free_slots.fetch_or(1u64 << slot, Ordering::AcqRel);
    }

    pub fn all_slots_free(&self) -> bool {
        let all_free = if self.slot_count == 64 {
            u64::MAX
        } else {
            (1u64 << self.slot_count) - 1
        };
        self.free_slots.load(Ordering::Acquire) == all_free
    }
}

/// A declared use of a memory region by a task.
///
/// `successor`/`child` are handles into the dependency engine's access
/// arena rather than owned pointers (spec §9: arenas-of-handles instead of
/// intrusive linked lists).
#[derive(Debug)]
pub struct DataAccess {
    pub region: MemoryRegion,
    pub kind: AccessType,
    /// The task this access belongs to, lets propagation find which
    /// task's `remaining_predecessors` to decrement without a separate
    /// side table.
    pub owner: TaskHandle,
    pub sat: Satisfiability,
    reduction: std::sync::OnceLock<ReductionInfo>,
    successor: Mutex<Option<Entry>>,
    child: Mutex<Option<Entry>>,
    location: Mutex<MemoryPlace>,
    write_id: Mutex<WriteId>,
}

impl DataAccess {
    pub fn new(region: MemoryRegion, kind: AccessType, weak: bool, owner: TaskHandle) -> Self {
        Self {
            region,
            kind,
            owner,
            sat: Satisfiability::new(weak),
            reduction: std::sync::OnceLock::new(),
            successor: Mutex::new(None),
            child: Mutex::new(None),
            location: Mutex::new(MemoryPlace::Uninitialized),
            write_id: Mutex::new(WriteId::INITIAL),
        }
    }

    pub fn with_reduction(self, reduction: ReductionInfo) -> Self {
        let _ = self.reduction.set(reduction);
        self
    }

    /// Installs the reduction slot bitmap the first time it's needed.
    /// Returns `false` if a bitmap was already installed by another
    /// contributor racing to be first.
    pub fn install_reduction(&self, reduction: ReductionInfo) -> bool {
        self.reduction.set(reduction).is_ok()
    }

    pub fn reduction(&self) -> Option<&ReductionInfo> {
        self.reduction.get()
    }

    pub fn is_weak(&self) -> bool {
        self.sat.is_weak()
    }

    pub fn successor(&self) -> Option<Entry> {
        *self.successor.lock().unwrap()
    }

    /// Links `next` as this access's successor in its region's chain.
    /// Returns the previous successor, if this access already had one,
    /// callers use that to detect a protocol violation (an access may have
    /// at most one successor, it is the unique "head" owner of the rest of
    /// the chain, per spec §3's head-ownership invariant).
    pub fn set_successor(&self, next: Entry) -> Option<Entry> {
        let mut slot = self.successor.lock().unwrap();
        let prev = *slot;
        *slot = Some(next);
        self.sat.set_has_next();
        prev
    }

    pub fn child(&self) -> Option<Entry> {
        *self.child.lock().unwrap()
    }

    pub fn set_child(&self, child: Entry) {
        *self.child.lock().unwrap() = Some(child);
    }

    pub fn location(&self) -> MemoryPlace {
        *self.location.lock().unwrap()
    }

    pub fn set_location(&self, place: MemoryPlace) {
        *self.location.lock().unwrap() = place;
    }

    pub fn write_id(&self) -> WriteId {
        *self.write_id.lock().unwrap()
    }

    pub fn set_write_id(&self, id: WriteId) {
        *self.write_id.lock().unwrap() = id;
    }

    /// True once this task is allowed to start using the region, given its
    /// declared access type. Weak accesses never block readiness of the
    /// task itself (spec §4.1, "Weak accesses never block the task's
    /// readiness").
    pub fn is_ready(&self) -> bool {
        if self.sat.is_weak() {
            return true;
        }
        self.sat.satisfies(self.kind)
    }
}
