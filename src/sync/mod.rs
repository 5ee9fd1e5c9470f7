//! Synchronization Primitives
//!
//! Mutual exclusion for user processes is provided by the named-mutex
//! subsystem in `mutex`. Kernel data itself needs no lock object: all
//! scheduling state lives in one `Kernel` value mutated only inside
//! interrupt-masked sections on a single logical CPU.

pub mod mutex;

pub use mutex::{KernelMutex, MutexError, MutexKind, MutexResult, MutexTable};
