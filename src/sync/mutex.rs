//! Named Mutex Subsystem
//!
//! This module implements the kernel's named, descriptor-referenced locks.
//! A fixed table holds the mutexes; each process reaches one through a
//! small integer descriptor bound in its PCB. Locks are recursive or
//! non-recursive, fixed at creation. Contending processes block on a
//! per-mutex FIFO queue and are handed the lock directly by the unlock
//! path; processes that find the whole table full block on a slot-wait
//! queue and are woken by the close path when a slot frees.
//!
//! Reference counting: every descriptor binding holds one reference on its
//! mutex slot (`open_count`). The slot is reclaimed only when the last
//! binding closes, which also guarantees the waiter queue is drained before
//! reuse (a waiter necessarily holds a binding).

use crate::config::{MAX_MUTEX_NAME, NUM_MUT, NUM_MUT_PROC};
use crate::hal::{IntMask, IntMaskGuard};
use crate::kernel::Kernel;
use crate::sched::process::{ProcId, ProcState};
use crate::sched::queue::ProcQueue;
use core::ops::{Index, IndexMut};

/// Log mutex subsystem information
#[macro_export]
macro_rules! mutex_log {
    ($($arg:tt)*) => {
        $crate::klog!($crate::log::LogLevel::Info, "[MUTEX] {}", format_args!($($arg)*))
    };
}

/// Log mutex subsystem warnings
#[macro_export]
macro_rules! mutex_warn {
    ($($arg:tt)*) => {
        $crate::klog!($crate::log::LogLevel::Warn, "[MUTEX] {}", format_args!($($arg)*))
    };
}

/// Whether a mutex admits repeated locks by its owner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutexKind {
    /// A second lock by the owner fails instead of self-deadlocking
    NonRecursive,
    /// The owner may lock repeatedly; each lock needs a matching unlock
    Recursive,
}

impl MutexKind {
    /// Decode the syscall argument; zero selects non-recursive
    pub fn from_raw(raw: usize) -> Self {
        if raw == 0 {
            MutexKind::NonRecursive
        } else {
            MutexKind::Recursive
        }
    }
}

/// Mutex subsystem error types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutexError {
    /// Name exceeds the maximum length
    NameTooLong,
    /// An allocated mutex already carries this name
    NameInUse,
    /// The caller's descriptor table is full
    NoDescriptorSlot,
    /// No allocated mutex carries this name
    NotFound,
    /// The descriptor does not reference a mutex
    InvalidDescriptor,
    /// The caller does not hold the lock
    NotOwner,
    /// A non-recursive mutex was locked again by its owner
    RecursiveDeadlock,
}

impl MutexError {
    /// Negative result code surfaced at the syscall boundary
    pub const fn code(self) -> isize {
        match self {
            MutexError::NameTooLong => -5,
            MutexError::NameInUse => -6,
            MutexError::NoDescriptorSlot => -7,
            MutexError::NotFound => -8,
            MutexError::InvalidDescriptor => -9,
            MutexError::NotOwner => -10,
            MutexError::RecursiveDeadlock => -11,
        }
    }
}

/// Result type for mutex operations
pub type MutexResult<T> = Result<T, MutexError>;

/// One slot of the mutex table
#[derive(Debug)]
pub struct KernelMutex {
    name: [u8; MAX_MUTEX_NAME],
    name_len: usize,
    pub kind: MutexKind,
    /// Slot state: false is Free, true is Allocated
    pub allocated: bool,
    /// Outstanding locks held by `owner`; zero when unlocked
    pub lock_count: u32,
    pub owner: Option<ProcId>,
    /// Descriptor bindings referencing this slot across all processes
    pub open_count: usize,
    /// Population of the waiter queue
    pub waiting: usize,
    /// Processes blocked attempting to lock this mutex
    pub(crate) waiters: ProcQueue,
}

impl KernelMutex {
    /// A free table slot
    pub fn free() -> Self {
        Self {
            name: [0; MAX_MUTEX_NAME],
            name_len: 0,
            kind: MutexKind::NonRecursive,
            allocated: false,
            lock_count: 0,
            owner: None,
            open_count: 0,
            waiting: 0,
            waiters: ProcQueue::new(),
        }
    }

    /// Name of an allocated mutex
    pub fn name(&self) -> &str {
        core::str::from_utf8(&self.name[..self.name_len]).unwrap_or("")
    }

    /// Store `name`; the caller has validated its length
    pub(crate) fn set_name(&mut self, name: &str) {
        let bytes = name.as_bytes();
        self.name[..bytes.len()].copy_from_slice(bytes);
        self.name_len = bytes.len();
    }

    /// Return the slot to Free, clearing all bookkeeping
    pub(crate) fn release(&mut self) {
        *self = KernelMutex::free();
    }
}

/// Fixed-capacity mutex table
pub struct MutexTable {
    slots: [KernelMutex; NUM_MUT],
}

impl MutexTable {
    pub fn new() -> Self {
        Self {
            slots: core::array::from_fn(|_| KernelMutex::free()),
        }
    }

    /// First free slot in scan order
    pub fn find_free(&self) -> Option<usize> {
        self.slots.iter().position(|m| !m.allocated)
    }

    /// Slot of the allocated mutex named `name`
    pub fn find_named(&self, name: &str) -> Option<usize> {
        self.slots
            .iter()
            .position(|m| m.allocated && m.name() == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &KernelMutex> {
        self.slots.iter()
    }
}

impl Default for MutexTable {
    fn default() -> Self {
        Self::new()
    }
}

impl Index<usize> for MutexTable {
    type Output = KernelMutex;

    fn index(&self, slot: usize) -> &KernelMutex {
        &self.slots[slot]
    }
}

impl IndexMut<usize> for MutexTable {
    fn index_mut(&mut self, slot: usize) -> &mut KernelMutex {
        &mut self.slots[slot]
    }
}

impl Kernel<'_> {
    /// Mutex slot bound to `desc` in the caller's descriptor table
    fn resolve_descriptor(&self, caller: ProcId, desc: usize) -> MutexResult<usize> {
        self.procs[caller]
            .descriptors
            .get(desc)
            .copied()
            .flatten()
            .ok_or(MutexError::InvalidDescriptor)
    }

    /// Create a named mutex and open it for the caller
    ///
    /// Validates the name and the caller's descriptor capacity first; those
    /// failures leave no trace. When every slot is allocated the caller
    /// blocks on the slot-wait queue and is resumed by the close path once
    /// a slot has been freed. The new mutex is then populated and opened
    /// through the regular open operation, whose descriptor is returned.
    pub fn mutex_create(&mut self, name: &str, kind: MutexKind) -> MutexResult<usize> {
        let cur = self.current_or_fatal();
        let _mask = IntMaskGuard::raise(self.hal, IntMask::all());

        if name.len() > MAX_MUTEX_NAME {
            mutex_warn!("name \"{}\" exceeds {} bytes", name, MAX_MUTEX_NAME);
            return Err(MutexError::NameTooLong);
        }
        if self.mutexes.find_named(name).is_some() {
            mutex_warn!("name \"{}\" already in use", name);
            return Err(MutexError::NameInUse);
        }
        if self.procs[cur].open_descriptors >= NUM_MUT_PROC {
            mutex_warn!("process {} has no free descriptor slot", cur);
            return Err(MutexError::NoDescriptorSlot);
        }

        if self.mutexes.find_free().is_none() {
            mutex_log!("no free mutex slot, blocking process {}", cur);
            self.block_for_mutex_slot(cur);
        }
        let Some(slot) = self.mutexes.find_free() else {
            // the wake is granted only after a slot was freed
            self.hal.fatal("mutex slot wait resumed with no free slot");
        };

        let mutex = &mut self.mutexes[slot];
        mutex.allocated = true;
        mutex.set_name(name);
        mutex.kind = kind;
        mutex.lock_count = 0;
        mutex.owner = None;
        mutex.open_count = 0;
        mutex.waiting = 0;

        let desc = match self.mutex_open(name) {
            Ok(desc) => desc,
            Err(error) => {
                // do not leave an unreferenced slot allocated
                self.mutexes[slot].release();
                return Err(error);
            }
        };
        mutex_log!(
            "process {} created mutex \"{}\" in slot {}",
            cur,
            name,
            slot
        );
        Ok(desc)
    }

    /// Bind a descriptor in the caller's table to the named mutex
    pub fn mutex_open(&mut self, name: &str) -> MutexResult<usize> {
        let cur = self.current_or_fatal();
        let _mask = IntMaskGuard::raise(self.hal, IntMask::all());

        let Some(slot) = self.mutexes.find_named(name) else {
            mutex_warn!("no mutex named \"{}\"", name);
            return Err(MutexError::NotFound);
        };
        let proc = &mut self.procs[cur];
        let Some(desc) = proc.descriptors.iter().position(|d| d.is_none()) else {
            mutex_warn!("process {} has no free descriptor slot", cur);
            return Err(MutexError::NoDescriptorSlot);
        };
        proc.descriptors[desc] = Some(slot);
        proc.open_descriptors += 1;
        self.mutexes[slot].open_count += 1;

        mutex_log!(
            "process {} opened mutex \"{}\" as descriptor {}",
            cur,
            name,
            desc
        );
        Ok(desc)
    }

    /// Acquire the mutex behind `desc`
    ///
    /// An unlocked mutex is taken immediately. A mutex held by another
    /// process blocks the caller on the waiter queue; it resumes as the
    /// owner once the unlock path hands the lock over. A relock by the
    /// owner increments the count on a recursive mutex and fails on a
    /// non-recursive one.
    pub fn mutex_lock(&mut self, desc: usize) -> MutexResult<()> {
        let cur = self.current_or_fatal();
        let _mask = IntMaskGuard::raise(self.hal, IntMask::all());
        let slot = self.resolve_descriptor(cur, desc)?;

        match self.mutexes[slot].owner {
            None => {
                let mutex = &mut self.mutexes[slot];
                mutex.owner = Some(cur);
                mutex.lock_count = 1;
                mutex_log!("process {} locked mutex \"{}\"", cur, mutex.name());
                Ok(())
            }
            Some(owner) if owner == cur => {
                let mutex = &mut self.mutexes[slot];
                if mutex.kind == MutexKind::NonRecursive {
                    mutex_warn!(
                        "process {} relocked non-recursive mutex \"{}\"",
                        cur,
                        mutex.name()
                    );
                    return Err(MutexError::RecursiveDeadlock);
                }
                mutex.lock_count += 1;
                mutex_log!(
                    "mutex \"{}\" lock count now {}",
                    mutex.name(),
                    mutex.lock_count
                );
                Ok(())
            }
            Some(_) => {
                mutex_log!(
                    "mutex \"{}\" is held, blocking process {}",
                    self.mutexes[slot].name(),
                    cur
                );
                self.procs[cur].state = ProcState::Blocked;
                self.ready.remove(&mut self.procs, cur);
                let mutex = &mut self.mutexes[slot];
                mutex.waiters.push_back(&mut self.procs, cur);
                mutex.waiting += 1;
                self.resched(Some(cur));
                // resumed holding the lock, handed over by the unlock path
                Ok(())
            }
        }
    }

    /// Release one lock on the mutex behind `desc`
    ///
    /// The final release clears the owner and, if processes are waiting,
    /// hands the lock to the head waiter: it becomes the owner with one
    /// outstanding lock and moves to the ready-queue tail.
    pub fn mutex_unlock(&mut self, desc: usize) -> MutexResult<()> {
        let cur = self.current_or_fatal();
        let _mask = IntMaskGuard::raise(self.hal, IntMask::all());
        let slot = self.resolve_descriptor(cur, desc)?;

        let mutex = &mut self.mutexes[slot];
        if mutex.owner != Some(cur) {
            mutex_warn!(
                "process {} unlocked mutex \"{}\" it does not hold",
                cur,
                mutex.name()
            );
            return Err(MutexError::NotOwner);
        }

        mutex.lock_count -= 1;
        if mutex.lock_count > 0 {
            mutex_log!(
                "mutex \"{}\" lock count now {}",
                mutex.name(),
                mutex.lock_count
            );
            return Ok(());
        }

        mutex.owner = None;
        if let Some(waiter) = mutex.waiters.pop_front(&mut self.procs) {
            mutex.waiting -= 1;
            mutex.owner = Some(waiter);
            mutex.lock_count = 1;
            self.procs[waiter].state = ProcState::Ready;
            self.ready.push_back(&mut self.procs, waiter);
            mutex_log!(
                "mutex \"{}\" handed to process {}",
                self.mutexes[slot].name(),
                waiter
            );
        }
        Ok(())
    }

    /// Drop the caller's binding to the mutex behind `desc`
    ///
    /// An owner first releases the lock in full; a handoff to a waiter ends
    /// that release early. The binding is then removed, and the last
    /// binding overall frees the slot and wakes the head of the slot-wait
    /// queue.
    pub fn mutex_close(&mut self, desc: usize) -> MutexResult<()> {
        let cur = self.current_or_fatal();
        let _mask = IntMaskGuard::raise(self.hal, IntMask::all());
        let slot = self.resolve_descriptor(cur, desc)?;

        loop {
            let mutex = &self.mutexes[slot];
            if mutex.owner != Some(cur) || mutex.lock_count == 0 {
                break;
            }
            if self.mutex_unlock(desc).is_err() {
                break;
            }
        }

        let proc = &mut self.procs[cur];
        proc.descriptors[desc] = None;
        proc.open_descriptors -= 1;
        let mutex = &mut self.mutexes[slot];
        mutex.open_count -= 1;
        mutex_log!(
            "process {} closed descriptor {} (mutex \"{}\")",
            cur,
            desc,
            mutex.name()
        );

        if mutex.open_count == 0 {
            mutex.release();
            mutex_log!("mutex slot {} freed", slot);
            if let Some(waiter) = self.slot_waiters.pop_front(&mut self.procs) {
                self.procs[waiter].state = ProcState::Ready;
                self.ready.push_back(&mut self.procs, waiter);
                mutex_log!("process {} resumed, a mutex slot is free", waiter);
            }
        }
        Ok(())
    }

    /// Close every descriptor `id` still holds, in table order
    ///
    /// Called by termination so no mutex outlives its holder: owned locks
    /// are handed to waiters and unreferenced slots are freed.
    pub(crate) fn close_all_descriptors(&mut self, id: ProcId) {
        for desc in 0..NUM_MUT_PROC {
            if self.procs[id].descriptors[desc].is_some() {
                let _ = self.mutex_close(desc);
            }
        }
    }

    /// Block the caller until the close path frees a mutex slot
    fn block_for_mutex_slot(&mut self, cur: ProcId) {
        self.procs[cur].state = ProcState::Blocked;
        self.ready.remove(&mut self.procs, cur);
        self.slot_waiters.push_back(&mut self.procs, cur);
        self.resched(Some(cur));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::mock::{MockHal, MockLoader};
    use crate::sys::NO_SUCH_SERVICE;
    use std::panic::{catch_unwind, AssertUnwindSafe};

    /// Kernel with a running initial process and one ready peer
    fn booted<'a>(
        hal: &'a MockHal,
        loader: &'a MockLoader,
    ) -> (Kernel<'a>, ProcId, ProcId) {
        let mut kernel = Kernel::new(hal, loader);
        let first = kernel.bootstrap("init").unwrap();
        let peer = kernel.create_process("peer").unwrap();
        (kernel, first, peer)
    }

    /// Link `waiter` into the mutex's waiter queue with a descriptor
    /// binding, as a blocked lock attempt leaves it
    fn enqueue_waiter(kernel: &mut Kernel, slot: usize, waiter: ProcId) {
        kernel.ready.remove(&mut kernel.procs, waiter);
        kernel.procs[waiter].state = ProcState::Blocked;
        let desc = kernel.procs[waiter]
            .descriptors
            .iter()
            .position(|d| d.is_none())
            .unwrap();
        kernel.procs[waiter].descriptors[desc] = Some(slot);
        kernel.procs[waiter].open_descriptors += 1;
        let mutex = &mut kernel.mutexes[slot];
        mutex.open_count += 1;
        mutex.waiters.push_back(&mut kernel.procs, waiter);
        mutex.waiting += 1;
    }

    #[test]
    fn test_create_lock_unlock_close_roundtrip() {
        let hal = MockHal::new();
        let loader = MockLoader::new();
        let (mut kernel, first, _) = booted(&hal, &loader);

        let desc = kernel.mutex_create("m", MutexKind::Recursive).unwrap();
        assert_eq!(desc, 0);
        let slot = kernel.mutexes.find_named("m").unwrap();
        assert!(kernel.mutexes[slot].allocated);
        assert_eq!(kernel.mutexes[slot].open_count, 1);
        assert_eq!(kernel.mutexes[slot].owner, None);

        kernel.mutex_lock(desc).unwrap();
        assert_eq!(kernel.mutexes[slot].owner, Some(first));
        assert_eq!(kernel.mutexes[slot].lock_count, 1);

        kernel.mutex_unlock(desc).unwrap();
        assert_eq!(kernel.mutexes[slot].owner, None);
        assert_eq!(kernel.mutexes[slot].lock_count, 0);

        kernel.mutex_close(desc).unwrap();
        assert!(!kernel.mutexes[slot].allocated);
        assert_eq!(kernel.procs[first].descriptors[desc], None);
        assert_eq!(kernel.procs[first].open_descriptors, 0);
    }

    #[test]
    fn test_create_name_validation() {
        let hal = MockHal::new();
        let loader = MockLoader::new();
        let (mut kernel, _, _) = booted(&hal, &loader);

        let long = "x".repeat(MAX_MUTEX_NAME + 1);
        assert_eq!(
            kernel.mutex_create(&long, MutexKind::Recursive),
            Err(MutexError::NameTooLong)
        );

        kernel.mutex_create("taken", MutexKind::Recursive).unwrap();
        assert_eq!(
            kernel.mutex_create("taken", MutexKind::NonRecursive),
            Err(MutexError::NameInUse)
        );
    }

    #[test]
    fn test_descriptor_table_exhaustion() {
        let hal = MockHal::new();
        let loader = MockLoader::new();
        let (mut kernel, first, _) = booted(&hal, &loader);

        for i in 0..NUM_MUT_PROC {
            let name = format!("m{}", i);
            assert_eq!(kernel.mutex_create(&name, MutexKind::Recursive), Ok(i));
        }
        assert_eq!(kernel.procs[first].open_descriptors, NUM_MUT_PROC);
        assert_eq!(
            kernel.mutex_create("overflow", MutexKind::Recursive),
            Err(MutexError::NoDescriptorSlot)
        );
        assert_eq!(
            kernel.mutex_open("m0"),
            Err(MutexError::NoDescriptorSlot)
        );
    }

    #[test]
    fn test_open_unknown_name() {
        let hal = MockHal::new();
        let loader = MockLoader::new();
        let (mut kernel, _, _) = booted(&hal, &loader);
        assert_eq!(kernel.mutex_open("ghost"), Err(MutexError::NotFound));
    }

    #[test]
    fn test_invalid_descriptor_everywhere() {
        let hal = MockHal::new();
        let loader = MockLoader::new();
        let (mut kernel, _, _) = booted(&hal, &loader);

        assert_eq!(kernel.mutex_lock(0), Err(MutexError::InvalidDescriptor));
        assert_eq!(kernel.mutex_unlock(2), Err(MutexError::InvalidDescriptor));
        assert_eq!(kernel.mutex_close(99), Err(MutexError::InvalidDescriptor));
    }

    #[test]
    fn test_unlock_requires_ownership() {
        let hal = MockHal::new();
        let loader = MockLoader::new();
        let (mut kernel, _, _) = booted(&hal, &loader);

        let desc = kernel.mutex_create("m", MutexKind::Recursive).unwrap();
        // never locked: no owner to release
        assert_eq!(kernel.mutex_unlock(desc), Err(MutexError::NotOwner));
    }

    #[test]
    fn test_non_recursive_relock_fails_without_mutation() {
        let hal = MockHal::new();
        let loader = MockLoader::new();
        let (mut kernel, first, _) = booted(&hal, &loader);

        let desc = kernel.mutex_create("m", MutexKind::NonRecursive).unwrap();
        kernel.mutex_lock(desc).unwrap();
        assert_eq!(
            kernel.mutex_lock(desc),
            Err(MutexError::RecursiveDeadlock)
        );
        let slot = kernel.mutexes.find_named("m").unwrap();
        assert_eq!(kernel.mutexes[slot].owner, Some(first));
        assert_eq!(kernel.mutexes[slot].lock_count, 1);
        assert_eq!(kernel.process_state(first), ProcState::Running);
    }

    #[test]
    fn test_recursive_locks_need_matching_unlocks() {
        let hal = MockHal::new();
        let loader = MockLoader::new();
        let (mut kernel, first, peer) = booted(&hal, &loader);

        let desc = kernel.mutex_create("m", MutexKind::Recursive).unwrap();
        let slot = kernel.mutexes.find_named("m").unwrap();
        for _ in 0..3 {
            kernel.mutex_lock(desc).unwrap();
        }
        enqueue_waiter(&mut kernel, slot, peer);

        // two partial releases keep the lock and the waiter in place
        kernel.mutex_unlock(desc).unwrap();
        kernel.mutex_unlock(desc).unwrap();
        assert_eq!(kernel.mutexes[slot].owner, Some(first));
        assert_eq!(kernel.process_state(peer), ProcState::Blocked);

        // the matching third release hands the lock over
        kernel.mutex_unlock(desc).unwrap();
        assert_eq!(kernel.mutexes[slot].owner, Some(peer));
        assert_eq!(kernel.mutexes[slot].lock_count, 1);
        assert_eq!(kernel.process_state(peer), ProcState::Ready);
        assert_eq!(kernel.mutexes[slot].waiting, 0);
    }

    #[test]
    fn test_waiters_are_released_in_fifo_order() {
        let hal = MockHal::new();
        let loader = MockLoader::new();
        let (mut kernel, _, second) = booted(&hal, &loader);
        let third = kernel.create_process("third").unwrap();

        let desc = kernel.mutex_create("m", MutexKind::NonRecursive).unwrap();
        let slot = kernel.mutexes.find_named("m").unwrap();
        kernel.mutex_lock(desc).unwrap();
        enqueue_waiter(&mut kernel, slot, second);
        enqueue_waiter(&mut kernel, slot, third);
        assert_eq!(kernel.mutexes[slot].waiting, 2);

        kernel.mutex_unlock(desc).unwrap();
        assert_eq!(kernel.mutexes[slot].owner, Some(second));

        // the new owner releases in turn
        kernel.current = Some(second);
        kernel.mutex_unlock(0).unwrap();
        assert_eq!(kernel.mutexes[slot].owner, Some(third));
        assert_eq!(kernel.mutexes[slot].waiting, 0);
    }

    #[test]
    fn test_close_by_owner_hands_lock_and_keeps_slot() {
        let hal = MockHal::new();
        let loader = MockLoader::new();
        let (mut kernel, first, peer) = booted(&hal, &loader);

        let desc = kernel.mutex_create("m", MutexKind::Recursive).unwrap();
        let slot = kernel.mutexes.find_named("m").unwrap();
        kernel.mutex_lock(desc).unwrap();
        kernel.mutex_lock(desc).unwrap();
        enqueue_waiter(&mut kernel, slot, peer);

        kernel.mutex_close(desc).unwrap();

        // the waiter took over, so the slot stays allocated for it
        assert!(kernel.mutexes[slot].allocated);
        assert_eq!(kernel.mutexes[slot].owner, Some(peer));
        assert_eq!(kernel.mutexes[slot].lock_count, 1);
        assert_eq!(kernel.mutexes[slot].open_count, 1);
        assert_eq!(kernel.procs[first].descriptors[desc], None);
        assert_eq!(kernel.process_state(peer), ProcState::Ready);
    }

    #[test]
    fn test_close_by_non_owner_leaves_lock_alone() {
        let hal = MockHal::new();
        let loader = MockLoader::new();
        let (mut kernel, first, peer) = booted(&hal, &loader);

        let desc = kernel.mutex_create("m", MutexKind::Recursive).unwrap();
        let slot = kernel.mutexes.find_named("m").unwrap();
        kernel.mutex_lock(desc).unwrap();

        // the peer holds a plain binding, no lock
        kernel.procs[peer].descriptors[0] = Some(slot);
        kernel.procs[peer].open_descriptors = 1;
        kernel.mutexes[slot].open_count += 1;

        kernel.current = Some(peer);
        kernel.mutex_close(0).unwrap();

        assert!(kernel.mutexes[slot].allocated);
        assert_eq!(kernel.mutexes[slot].owner, Some(first));
        assert_eq!(kernel.mutexes[slot].lock_count, 1);
        assert_eq!(kernel.mutexes[slot].open_count, 1);
        assert_eq!(kernel.procs[peer].descriptors[0], None);
    }

    #[test]
    fn test_slot_exhaustion_blocks_and_close_wakes() {
        let hal = MockHal::new();
        let loader = MockLoader::new();
        let (mut kernel, first, peer) = booted(&hal, &loader);

        // every slot is taken by some other holder
        for slot in 0..NUM_MUT {
            let name = format!("held{}", slot);
            let mutex = &mut kernel.mutexes[slot];
            mutex.allocated = true;
            mutex.set_name(&name);
            mutex.open_count = 1;
        }

        // creation blocks; the mock resumes the call immediately instead
        // of waiting for a freed slot, which trips the resume invariant
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            kernel.mutex_create("extra", MutexKind::Recursive)
        }));
        assert!(outcome.is_err());
        assert_eq!(kernel.process_state(first), ProcState::Blocked);
        assert!(kernel.slot_waiters.contains(&kernel.procs, first));
        assert_eq!(kernel.current(), Some(peer));

        // the peer owns the binding for slot 0 and closes it
        kernel.procs[peer].descriptors[0] = Some(0);
        kernel.procs[peer].open_descriptors = 1;
        kernel.mutex_close(0).unwrap();

        assert!(!kernel.mutexes[0].allocated);
        assert_eq!(kernel.process_state(first), ProcState::Ready);
        assert!(kernel.slot_waiters.is_empty());
        assert!(kernel.ready.contains(&kernel.procs, first));
    }

    #[test]
    fn test_error_codes_distinct_and_negative() {
        let mut codes = vec![
            NO_SUCH_SERVICE,
            crate::sched::process::ProcessError::NoFreeSlot.code(),
            crate::sched::process::ProcessError::ImageLoadFailed.code(),
            crate::sched::process::ProcessError::OutOfMemory.code(),
            MutexError::NameTooLong.code(),
            MutexError::NameInUse.code(),
            MutexError::NoDescriptorSlot.code(),
            MutexError::NotFound.code(),
            MutexError::InvalidDescriptor.code(),
            MutexError::NotOwner.code(),
            MutexError::RecursiveDeadlock.code(),
        ];
        assert!(codes.iter().all(|c| *c < 0));
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), 11);
    }
}
