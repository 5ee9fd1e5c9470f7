//! System Call Subsystem
//!
//! This module provides the service numbering, the syscall dispatcher, and
//! the kernel metrics counters. The ABI is slot-based: argument slot 0
//! carries the service number on entry and the result on exit, slots 1..
//! carry the call-specific arguments.
//!
//! # System Calls
//!
//! | ID | Name | Arguments | Result |
//! |----|------|-----------|--------|
//! | 0 | create_process | program name pointer | process id or error |
//! | 1 | terminate_process | — | does not return |
//! | 2 | write | buffer pointer, length | 0 |
//! | 3 | get_id | — | calling process id |
//! | 4 | sleep | seconds | 0 after resume |
//! | 5 | mutex_create | name pointer, kind | descriptor or error |
//! | 6 | mutex_open | name pointer | descriptor or error |
//! | 7 | mutex_lock | descriptor | 0 or error |
//! | 8 | mutex_unlock | descriptor | 0 or error |
//! | 9 | mutex_close | descriptor | 0 or error |

pub mod syscall;

use core::sync::atomic::{AtomicUsize, Ordering};

/// Result code for a service number outside the table
pub const NO_SUCH_SERVICE: isize = -1;

/// Recognized kernel services, numbered as the ABI exposes them
///
/// Dispatch is a match over this enum, so a handler can never be missing
/// for a known number and unknown numbers fail in exactly one place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
pub enum Service {
    CreateProcess = 0,
    TerminateProcess = 1,
    Write = 2,
    GetId = 3,
    Sleep = 4,
    MutexCreate = 5,
    MutexOpen = 6,
    MutexLock = 7,
    MutexUnlock = 8,
    MutexClose = 9,
}

impl Service {
    /// Number of recognized services
    pub const COUNT: usize = 10;

    /// Decode a service number from argument slot 0
    pub fn from_number(number: usize) -> Option<Self> {
        match number {
            0 => Some(Service::CreateProcess),
            1 => Some(Service::TerminateProcess),
            2 => Some(Service::Write),
            3 => Some(Service::GetId),
            4 => Some(Service::Sleep),
            5 => Some(Service::MutexCreate),
            6 => Some(Service::MutexOpen),
            7 => Some(Service::MutexLock),
            8 => Some(Service::MutexUnlock),
            9 => Some(Service::MutexClose),
            _ => None,
        }
    }

    /// Service name for logging
    pub const fn name(self) -> &'static str {
        match self {
            Service::CreateProcess => "create_process",
            Service::TerminateProcess => "terminate_process",
            Service::Write => "write",
            Service::GetId => "get_id",
            Service::Sleep => "sleep",
            Service::MutexCreate => "mutex_create",
            Service::MutexOpen => "mutex_open",
            Service::MutexLock => "mutex_lock",
            Service::MutexUnlock => "mutex_unlock",
            Service::MutexClose => "mutex_close",
        }
    }
}

/// Kernel metrics for observability and debugging
///
/// All counters use relaxed ordering; they are statistics, not
/// synchronization.
pub struct KernelMetrics {
    /// Context switches of every kind
    pub ctx_switches: AtomicUsize,
    /// Forced (quantum-expiry) switches only
    pub preemptions: AtomicUsize,
    /// Clock interrupts handled
    pub timer_ticks: AtomicUsize,
    /// Processes put to sleep
    pub sleeps: AtomicUsize,
    /// Processes woken from sleep
    pub wakes: AtomicUsize,
    syscalls: [AtomicUsize; Service::COUNT],
}

impl KernelMetrics {
    pub const fn new() -> Self {
        const ZERO: AtomicUsize = AtomicUsize::new(0);
        Self {
            ctx_switches: ZERO,
            preemptions: ZERO,
            timer_ticks: ZERO,
            sleeps: ZERO,
            wakes: ZERO,
            syscalls: [ZERO; Service::COUNT],
        }
    }

    /// Count one invocation of `service`
    pub fn count_syscall(&self, service: Service) {
        self.syscalls[service as usize].fetch_add(1, Ordering::Relaxed);
    }

    /// Invocations of `service` so far
    pub fn syscall_count(&self, service: Service) -> usize {
        self.syscalls[service as usize].load(Ordering::Relaxed)
    }
}

impl Default for KernelMetrics {
    fn default() -> Self {
        Self::new()
    }
}
