//! Process Management
//!
//! This module defines the Process Control Block (PCB) and the fixed-capacity
//! process table. It handles slot allocation, state tracking, and the
//! per-process mutex descriptor bookkeeping.

use crate::config::{MAX_PROC, NUM_MUT_PROC};
use crate::hal::{CpuContext, ImageHandle, StackRegion};
use core::ops::{Index, IndexMut};

/// Process identifier type, a stable slot index into the process table
pub type ProcId = usize;

/// Process lifecycle error types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessError {
    /// Process table is full (maximum processes reached)
    NoFreeSlot,
    /// The loader could not build an address space for the program
    ImageLoadFailed,
    /// Failed to allocate memory for the process stack
    OutOfMemory,
}

impl ProcessError {
    /// Negative result code surfaced at the syscall boundary
    pub const fn code(self) -> isize {
        match self {
            ProcessError::NoFreeSlot => -2,
            ProcessError::ImageLoadFailed => -3,
            ProcessError::OutOfMemory => -4,
        }
    }
}

/// Result type for process lifecycle operations
pub type ProcessResult<T> = Result<T, ProcessError>;

/// Process state enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcState {
    /// Slot holds no process and may be claimed by creation
    Unused,
    /// Process is eligible to run and waiting in the ready queue
    Ready,
    /// Process is currently executing (it occupies the ready-queue head)
    Running,
    /// Process is waiting in the sleeping queue or on a mutex
    Blocked,
    /// Process is being torn down; the slot returns to Unused once its
    /// stack and image are released
    Terminated,
}

/// Process Control Block (PCB)
///
/// Contains all information needed to manage a process: identity, state,
/// saved CPU context, owned stack and image, sleep and quantum counters,
/// the mutex descriptor table, and the intrusive queue link.
#[derive(Debug)]
pub struct Process {
    /// Slot index, assigned at creation
    pub id: ProcId,

    /// Current state of the process
    pub state: ProcState,

    /// CPU context (saved registers), interpreted only by the HAL
    pub context: CpuContext,

    /// Stack region owned by the process
    pub stack: Option<StackRegion>,

    /// Handle to the loaded program's memory map
    pub image: Option<ImageHandle>,

    /// Ticks left before a sleeping process is woken; zero outside the
    /// sleeping queue
    pub sleep_ticks_left: u64,

    /// Ticks left in the current quantum; reset on every scheduling-in
    pub quantum_left: i32,

    /// Per-process descriptor table mapping small integers to mutex slots
    pub descriptors: [Option<usize>; NUM_MUT_PROC],

    /// Count of non-empty descriptor entries
    pub open_descriptors: usize,

    /// Successor in whichever queue this PCB currently belongs to
    ///
    /// A PCB is a member of at most one queue at a time, so a single link
    /// suffices for the ready, sleeping, and every waiting queue.
    pub next: Option<ProcId>,
}

impl Process {
    /// An unused table slot
    pub fn unused(id: ProcId) -> Self {
        Self {
            id,
            state: ProcState::Unused,
            context: CpuContext::new(),
            stack: None,
            image: None,
            sleep_ticks_left: 0,
            quantum_left: 0,
            descriptors: [None; NUM_MUT_PROC],
            open_descriptors: 0,
            next: None,
        }
    }

    /// Reset every field except the slot index
    pub fn clear(&mut self) {
        *self = Process::unused(self.id);
    }
}

/// Fixed-capacity process table
///
/// Slots are addressed by `ProcId` and never move; queue links are slot
/// indices into this arena.
pub struct ProcTable {
    slots: [Process; MAX_PROC],
}

impl ProcTable {
    pub fn new() -> Self {
        Self {
            slots: core::array::from_fn(Process::unused),
        }
    }

    /// First unused slot in scan order, or None when the table is full
    pub fn find_free(&self) -> Option<ProcId> {
        self.slots
            .iter()
            .position(|p| p.state == ProcState::Unused)
    }

    /// Mutable references to two distinct slots at once, for context
    /// switching between them
    pub fn pair_mut(&mut self, a: ProcId, b: ProcId) -> (&mut Process, &mut Process) {
        debug_assert!(a != b);
        if a < b {
            let (low, high) = self.slots.split_at_mut(b);
            (&mut low[a], &mut high[0])
        } else {
            let (low, high) = self.slots.split_at_mut(a);
            (&mut high[0], &mut low[b])
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Process> {
        self.slots.iter()
    }
}

impl Default for ProcTable {
    fn default() -> Self {
        Self::new()
    }
}

impl Index<ProcId> for ProcTable {
    type Output = Process;

    fn index(&self, id: ProcId) -> &Process {
        &self.slots[id]
    }
}

impl IndexMut<ProcId> for ProcTable {
    fn index_mut(&mut self, id: ProcId) -> &mut Process {
        &mut self.slots[id]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_table_is_all_unused() {
        let table = ProcTable::new();
        assert!(table.iter().all(|p| p.state == ProcState::Unused));
        assert_eq!(table.find_free(), Some(0));
    }

    #[test]
    fn test_find_free_scan_order() {
        let mut table = ProcTable::new();
        table[0].state = ProcState::Ready;
        table[1].state = ProcState::Blocked;
        assert_eq!(table.find_free(), Some(2));

        for i in 0..MAX_PROC {
            table[i].state = ProcState::Ready;
        }
        assert_eq!(table.find_free(), None);
    }

    #[test]
    fn test_pair_mut_both_orders() {
        let mut table = ProcTable::new();
        let (a, b) = table.pair_mut(1, 3);
        assert_eq!((a.id, b.id), (1, 3));
        let (a, b) = table.pair_mut(3, 1);
        assert_eq!((a.id, b.id), (3, 1));
    }

    #[test]
    fn test_clear_keeps_slot_index() {
        let mut table = ProcTable::new();
        table[5].state = ProcState::Terminated;
        table[5].open_descriptors = 2;
        table[5].clear();
        assert_eq!(table[5].id, 5);
        assert_eq!(table[5].state, ProcState::Unused);
        assert_eq!(table[5].open_descriptors, 0);
    }

    #[test]
    fn test_error_codes_distinct() {
        let codes = [
            ProcessError::NoFreeSlot.code(),
            ProcessError::ImageLoadFailed.code(),
            ProcessError::OutOfMemory.code(),
        ];
        for (i, a) in codes.iter().enumerate() {
            assert!(*a < 0);
            for b in codes.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }
}
