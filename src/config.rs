/// Configuration constants for the kernel core

/// Maximum number of process table entries
pub const MAX_PROC: usize = 16;

/// Maximum number of mutex table entries
pub const NUM_MUT: usize = 16;

/// Maximum number of mutex descriptors a single process may hold open
pub const NUM_MUT_PROC: usize = 4;

/// Maximum length of a mutex name in bytes
pub const MAX_MUTEX_NAME: usize = 24;

/// Timer tick frequency in Hz (100 Hz = 10ms per tick)
/// Sleep durations are given in seconds and converted to ticks with this
pub const TICKS_PER_SEC: u64 = 100;

/// Tick budget a process runs before the clock handler arms a forced
/// preemption through the software interrupt
pub const QUANTUM_TICKS: i32 = 10;

/// Stack size allocated for each new process (8KB)
pub const STACK_SIZE: usize = 8192;

/// I/O port the terminal interrupt handler reads its character from
pub const TERMINAL_PORT: u16 = 0x60;

/// Size of the register file exposed by the HAL; slot 0 carries the
/// service number and the syscall result, slots 1.. the arguments
pub const NUM_REGISTERS: usize = 8;
