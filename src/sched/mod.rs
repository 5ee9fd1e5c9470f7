//! Process Scheduler
//!
//! This module implements preemptive round-robin scheduling on a single
//! logical CPU. Dispatch is strict FIFO over the ready queue: the Running
//! process occupies the queue head, and the pick operation returns the head
//! without removing it. Preemption is deferred: the clock handler charges
//! the running process's quantum and, on exhaustion, marks it for eviction
//! and raises the software interrupt; the software-interrupt handler
//! performs the actual head-to-tail requeue and context switch.
//!
//! When the ready queue is empty the scheduler idles: it lowers the
//! interrupt mask so wake sources stay deliverable, halts until the HAL
//! reports an interrupt cause, dispatches that cause, and re-checks the
//! queue. The kernel therefore never selects a non-runnable process and
//! never spins with interrupts fully masked.

pub mod process;
pub mod queue;

use crate::config::{QUANTUM_TICKS, TICKS_PER_SEC};
use crate::hal::{IntMask, IntMaskGuard};
use crate::kernel::Kernel;
use core::sync::atomic::Ordering;
use process::{ProcId, ProcState};

/// Log general scheduler information
#[macro_export]
macro_rules! sched_log {
    ($($arg:tt)*) => {
        $crate::klog!($crate::log::LogLevel::Info, "[SCHED] {}", format_args!($($arg)*))
    };
}

/// Log scheduler warnings
#[macro_export]
macro_rules! sched_warn {
    ($($arg:tt)*) => {
        $crate::klog!($crate::log::LogLevel::Warn, "[SCHED] {}", format_args!($($arg)*))
    };
}

impl Kernel<'_> {
    /// Select the next process to run (FIFO policy)
    ///
    /// Returns the ready-queue head, idling until an interrupt makes the
    /// queue non-empty when nothing is runnable.
    pub(crate) fn pick_next(&mut self) -> ProcId {
        loop {
            if let Some(head) = self.ready.head() {
                return head;
            }
            self.idle_wait();
        }
    }

    /// Wait for any interrupt with only the software source held off
    ///
    /// The HAL halt reports which cause arrived; dispatching it here is
    /// what lets a clock tick move a sleeper back to ready and end the
    /// idle loop.
    fn idle_wait(&mut self) {
        sched_log!("nothing runnable, waiting for an interrupt");
        let hal = self.hal;
        let prev = hal.set_int_mask(IntMask::SOFTWARE);
        let cause = hal.wait_for_interrupt();
        hal.set_int_mask(prev);
        self.handle_interrupt(cause);
    }

    /// Make `next` the running process and switch contexts
    ///
    /// `save` names the process whose context must be written back, or
    /// None when it is gone for good (termination, first dispatch). The
    /// quantum is reset here, on every scheduling-in event.
    pub(crate) fn dispatch_to(&mut self, next: ProcId, save: Option<ProcId>) {
        self.current = Some(next);
        let proc = &mut self.procs[next];
        proc.state = ProcState::Running;
        proc.quantum_left = QUANTUM_TICKS;

        if save == Some(next) {
            // the scheduler picked the process already on the CPU
            return;
        }
        self.metrics.ctx_switches.fetch_add(1, Ordering::Relaxed);
        sched_log!("context switch to process {}", next);
        let hal = self.hal;
        match save {
            Some(prev) => {
                let (from, to) = self.procs.pair_mut(prev, next);
                hal.context_switch(Some(&mut from.context), &to.context);
            }
            None => hal.context_switch(None, &self.procs[next].context),
        }
    }

    /// Pick the next runnable process and switch to it
    pub(crate) fn resched(&mut self, save: Option<ProcId>) {
        let next = self.pick_next();
        self.dispatch_to(next, save);
    }

    /// Clock tick handler
    ///
    /// Walks the sleeping queue, charging one tick to every sleeper and
    /// moving the expired ones to the ready tail under a full mask. Then
    /// charges the running process's quantum; on exhaustion the process is
    /// marked for eviction and the software interrupt is raised, deferring
    /// the switch out of tick context.
    pub(crate) fn clock_tick(&mut self) {
        self.metrics.timer_ticks.fetch_add(1, Ordering::Relaxed);

        let mut cursor = self.sleeping.head();
        while let Some(id) = cursor {
            cursor = self.procs[id].next;
            self.procs[id].sleep_ticks_left -= 1;
            if self.procs[id].sleep_ticks_left == 0 {
                let _mask = IntMaskGuard::raise(self.hal, IntMask::all());
                self.sleeping.remove(&mut self.procs, id);
                self.procs[id].state = ProcState::Ready;
                self.ready.push_back(&mut self.procs, id);
                self.metrics.wakes.fetch_add(1, Ordering::Relaxed);
                sched_log!("process {} finished sleeping", id);
            }
        }

        // only a process still on the CPU is charged; the ex-current of a
        // blocking path that is idling in the scheduler is not
        if let Some(cur) = self.current {
            if self.procs[cur].state == ProcState::Running {
                self.procs[cur].quantum_left -= 1;
                if self.procs[cur].quantum_left <= 0 {
                    self.evict_pending = Some(cur);
                    self.hal.raise_software_interrupt();
                }
            }
        }
    }

    /// Software-interrupt handler: the deferred preemption point
    ///
    /// Consumes the eviction marker. If it still names the running
    /// process, that process moves from the head to the tail of the ready
    /// queue and the next head is dispatched; otherwise the marked process
    /// already left the CPU through some other path and nothing happens.
    pub(crate) fn handle_preempt(&mut self) {
        let marked = self.evict_pending.take();
        let Some(cur) = self.current else {
            return;
        };
        if marked != Some(cur) || self.procs[cur].state != ProcState::Running {
            return;
        }

        sched_log!("quantum expired for process {}, rescheduling", cur);
        self.metrics.preemptions.fetch_add(1, Ordering::Relaxed);

        let _mask = IntMaskGuard::raise(self.hal, IntMask::all());
        self.ready.remove(&mut self.procs, cur);
        self.procs[cur].state = ProcState::Ready;
        self.ready.push_back(&mut self.procs, cur);
        self.resched(Some(cur));
    }

    /// Block the calling process for `seconds`
    ///
    /// Converts the duration to ticks, moves the process from the ready
    /// queue to the sleeping queue, and switches away. The process resumes
    /// transparently once the clock handler counts the ticks down and the
    /// scheduler reaches it again. A zero-second sleep returns at once: a
    /// zero-tick entry in the sleeping queue could never be woken.
    pub fn sleep_current(&mut self, seconds: u64) {
        if seconds == 0 {
            return;
        }
        let cur = self.current_or_fatal();

        let _mask = IntMaskGuard::raise(self.hal, IntMask::all());
        self.procs[cur].sleep_ticks_left = seconds * TICKS_PER_SEC;
        self.procs[cur].state = ProcState::Blocked;
        self.ready.remove(&mut self.procs, cur);
        self.sleeping.push_back(&mut self.procs, cur);
        self.metrics.sleeps.fetch_add(1, Ordering::Relaxed);
        sched_log!("process {} sleeping for {}s", cur, seconds);

        self.resched(Some(cur));
    }
}
