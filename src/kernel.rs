//! Kernel State and Trap Routing
//!
//! This module defines the `Kernel` value that bundles every scheduling
//! structure (process table, ready/sleeping/slot-wait queues, mutex table,
//! current-process reference, eviction marker, metrics) and routes each
//! interrupt or trap cause to its handler. It also implements the process
//! lifecycle: creation against the image loader and termination with full
//! resource release.
//!
//! All state mutation happens inside interrupt-masked sections; the kernel
//! value is handed to every entry point as `&mut`, which is the
//! single-writer discipline a single logical CPU provides.

use crate::config::{NUM_MUT_PROC, QUANTUM_TICKS, STACK_SIZE, TERMINAL_PORT};
use crate::hal::{Hal, ImageLoader, IntCause, IntMask, IntMaskGuard};
use crate::sched::process::{ProcId, ProcState, ProcTable, ProcessError, ProcessResult};
use crate::sched::queue::ProcQueue;
use crate::sync::mutex::MutexTable;
use crate::sys::KernelMetrics;

/// Log kernel lifecycle information
#[macro_export]
macro_rules! kernel_log {
    ($($arg:tt)*) => {
        $crate::klog!($crate::log::LogLevel::Info, "[KERNEL] {}", format_args!($($arg)*))
    };
}

/// Log kernel lifecycle warnings
#[macro_export]
macro_rules! kernel_warn {
    ($($arg:tt)*) => {
        $crate::klog!($crate::log::LogLevel::Warn, "[KERNEL] {}", format_args!($($arg)*))
    };
}

/// The kernel's scheduling state, bundled into one explicit value
///
/// Initialized once at boot and never torn down. The HAL and the image
/// loader are external collaborators reached through trait references.
pub struct Kernel<'a> {
    pub(crate) hal: &'a dyn Hal,
    pub(crate) loader: &'a dyn ImageLoader,
    pub(crate) procs: ProcTable,
    /// FIFO of runnable processes; the Running process occupies its head
    pub(crate) ready: ProcQueue,
    /// Processes waiting out a sleep, woken by the clock handler
    pub(crate) sleeping: ProcQueue,
    /// Processes blocked in mutex creation until a table slot frees
    pub(crate) slot_waiters: ProcQueue,
    pub(crate) mutexes: MutexTable,
    pub(crate) current: Option<ProcId>,
    /// Process the clock handler selected for forced eviction, consumed by
    /// the software-interrupt handler
    pub(crate) evict_pending: Option<ProcId>,
    pub(crate) metrics: KernelMetrics,
}

impl<'a> Kernel<'a> {
    pub fn new(hal: &'a dyn Hal, loader: &'a dyn ImageLoader) -> Self {
        Self {
            hal,
            loader,
            procs: ProcTable::new(),
            ready: ProcQueue::new(),
            sleeping: ProcQueue::new(),
            slot_waiters: ProcQueue::new(),
            mutexes: MutexTable::new(),
            current: None,
            evict_pending: None,
            metrics: KernelMetrics::new(),
        }
    }

    /// Identity of the process currently on the CPU
    pub fn current(&self) -> Option<ProcId> {
        self.current
    }

    /// Observability counters
    pub fn metrics(&self) -> &KernelMetrics {
        &self.metrics
    }

    /// State of a process-table slot
    pub fn process_state(&self, id: ProcId) -> ProcState {
        self.procs[id].state
    }

    pub(crate) fn current_or_fatal(&self) -> ProcId {
        match self.current {
            Some(id) => id,
            None => self.hal.fatal("no current process"),
        }
    }

    /// Route an interrupt or trap cause to its handler
    ///
    /// The embedder wires every vector the HAL installs to this entry
    /// point. Each arm runs with whatever mask policy the handler applies
    /// internally; the match is exhaustive over the causes.
    pub fn handle_interrupt(&mut self, cause: IntCause) {
        match cause {
            IntCause::ArithmeticFault => self.handle_arithmetic_fault(),
            IntCause::MemoryFault => self.handle_memory_fault(),
            IntCause::Clock => self.clock_tick(),
            IntCause::Terminal => self.handle_terminal(),
            IntCause::Syscall => self.handle_syscall(),
            IntCause::Software => self.handle_preempt(),
        }
    }

    /// Create a process running `program`
    ///
    /// Claims the first free table slot, asks the loader for an address
    /// space, allocates a stack, builds the initial context, and appends
    /// the process to the ready-queue tail. On any failure the slot is left
    /// unconsumed and already-acquired resources are given back.
    pub fn create_process(&mut self, program: &str) -> ProcessResult<ProcId> {
        let slot = self.procs.find_free().ok_or(ProcessError::NoFreeSlot)?;
        let (image, entry) = self
            .loader
            .build_image(program)
            .ok_or(ProcessError::ImageLoadFailed)?;
        let Some(stack) = self.hal.alloc_stack(STACK_SIZE) else {
            self.loader.release_image(image);
            return Err(ProcessError::OutOfMemory);
        };
        let context = self.hal.init_context(image, &stack, entry);

        let _mask = IntMaskGuard::raise(self.hal, IntMask::all());
        let proc = &mut self.procs[slot];
        proc.state = ProcState::Ready;
        proc.context = context;
        proc.stack = Some(stack);
        proc.image = Some(image);
        proc.sleep_ticks_left = 0;
        proc.quantum_left = QUANTUM_TICKS;
        proc.descriptors = [None; NUM_MUT_PROC];
        proc.open_descriptors = 0;
        proc.next = None;
        self.ready.push_back(&mut self.procs, slot);

        kernel_log!("created process {} (\"{}\")", slot, program);
        Ok(slot)
    }

    /// Terminate the calling process, releasing everything it owns
    ///
    /// Closes every mutex descriptor still open (waiters are handed the
    /// lock or the slot is freed), removes the process from the ready
    /// queue, selects a successor, releases the stack and image, returns
    /// the slot to `Unused`, and switches away for good. Under a real HAL
    /// this never returns to its caller.
    pub fn terminate_current(&mut self) {
        let cur = self.current_or_fatal();
        kernel_log!("process {} terminating", cur);

        self.close_all_descriptors(cur);

        let _mask = IntMaskGuard::raise(self.hal, IntMask::all());
        self.procs[cur].state = ProcState::Terminated;
        self.ready.remove(&mut self.procs, cur);

        let next = self.pick_next();

        let loader = self.loader;
        let hal = self.hal;
        if let Some(image) = self.procs[cur].image.take() {
            loader.release_image(image);
        }
        if let Some(stack) = self.procs[cur].stack.take() {
            hal.release_stack(stack);
        }
        self.procs[cur].clear();

        kernel_log!("context switch by termination: from {} to {}", cur, next);
        self.dispatch_to(next, None);
    }

    /// Arithmetic exception raised by the running process
    ///
    /// A fault while already in kernel code is an invariant violation.
    pub(crate) fn handle_arithmetic_fault(&mut self) {
        if !self.hal.from_user_mode() {
            self.hal.fatal("arithmetic exception inside the kernel");
        }
        let cur = self.current_or_fatal();
        kernel_warn!("arithmetic exception in process {}", cur);
        self.terminate_current();
    }

    /// Memory-access exception raised by the running process
    pub(crate) fn handle_memory_fault(&mut self) {
        if !self.hal.from_user_mode() {
            self.hal.fatal("memory exception inside the kernel");
        }
        let cur = self.current_or_fatal();
        kernel_warn!("memory exception in process {}", cur);
        self.terminate_current();
    }

    /// Terminal interrupt: read the character and report it
    pub(crate) fn handle_terminal(&mut self) {
        let byte = self.hal.read_port(TERMINAL_PORT);
        kernel_log!("terminal input: {}", byte as char);
    }

    /// Create the initial process and switch into it
    ///
    /// Split out of `start` so hosted tests can drive the kernel past the
    /// first dispatch; under a real HAL the switch does not return.
    pub fn bootstrap(&mut self, init: &str) -> ProcessResult<ProcId> {
        kernel_log!("kernel starting, creating initial process \"{}\"", init);
        let id = self.create_process(init)?;
        let first = self.pick_next();
        self.dispatch_to(first, None);
        Ok(id)
    }

    /// Boot entry point: bring up the initial process and never return
    pub fn start(&mut self, init: &str) -> ! {
        match self.bootstrap(init) {
            Ok(_) => self.hal.fatal("scheduler returned control unexpectedly"),
            Err(_) => self.hal.fatal("initial process could not be created"),
        }
    }
}
