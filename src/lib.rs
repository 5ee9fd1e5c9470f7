//! Minos Kernel — process-management core
//!
//! The process table, round-robin scheduler, trap dispatcher, and
//! named-mutex subsystem of a minimal educational kernel, driven by clock
//! and software interrupts on a single logical CPU.
//!
//! The crate is a library: the machine is reached only through the `Hal`
//! trait and the program loader through `ImageLoader`. An embedder wires
//! its interrupt vectors to `Kernel::handle_interrupt` and boots with
//! `Kernel::start`; the hosted tests drive the same entry points against a
//! mock HAL.
//!
//! # Components
//!
//! - **config**: capacity and timing constants
//! - **log**: leveled logging with subsystem prefixes and a retained ring
//! - **hal**: HAL and loader traits, interrupt masks, context types
//! - **sched**: PCB table, intrusive queues, FIFO dispatch, deferred
//!   preemption, sleep timers
//! - **sync**: named mutexes with per-process descriptor tables
//! - **sys**: syscall numbering, dispatcher, metrics
//! - **kernel**: the bundled kernel state value and trap routing

#![cfg_attr(not(test), no_std)]

pub mod config;
pub mod log;

pub mod hal;
pub mod kernel;
pub mod sched;
pub mod sync;
pub mod sys;

pub use hal::{CpuContext, Hal, ImageHandle, ImageLoader, IntCause, IntMask, StackRegion};
pub use kernel::Kernel;
pub use sched::process::{ProcId, ProcState, ProcessError};
pub use sync::mutex::{MutexError, MutexKind};
pub use sys::Service;
