/// Structured logging for the kernel core
/// Provides logging with format: [LEVEL][subsys] message
/// Supports log levels: ERROR, WARN, INFO, DEBUG, TRACE
use core::fmt;
use core::sync::atomic::{AtomicU8, Ordering};
use spin::Mutex;

/// Log levels for kernel logging
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum LogLevel {
    /// Critical errors that may cause system instability
    Error = 0,
    /// Warning conditions that should be addressed
    Warn = 1,
    /// Informational messages about important events
    Info = 2,
    /// Detailed debugging information
    Debug = 3,
    /// Very verbose tracing information
    Trace = 4,
}

impl LogLevel {
    /// Get the string representation of the log level
    pub const fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "ERROR",
            LogLevel::Warn => "WARN",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
            LogLevel::Trace => "TRACE",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Global log level filter
/// Only messages at or below this level reach the sink
static LOG_LEVEL: AtomicU8 = AtomicU8::new(LogLevel::Info as u8);

/// Set the global log level
pub fn set_log_level(level: LogLevel) {
    LOG_LEVEL.store(level as u8, Ordering::Relaxed);
}

/// Get the current global log level
pub fn log_level() -> LogLevel {
    match LOG_LEVEL.load(Ordering::Relaxed) {
        0 => LogLevel::Error,
        1 => LogLevel::Warn,
        2 => LogLevel::Info,
        3 => LogLevel::Debug,
        4 => LogLevel::Trace,
        _ => LogLevel::Info,
    }
}

/// Check if a log level should be logged
#[inline]
pub fn should_log(level: LogLevel) -> bool {
    level <= log_level()
}

/// Destination for formatted log lines
///
/// The embedder installs one sink at boot (a serial writer under a real
/// HAL, a capture buffer in tests). Messages logged before a sink is
/// installed are dropped.
pub trait LogSink: Sync {
    fn log(&self, level: LogLevel, message: fmt::Arguments<'_>);
}

/// Global log sink, installed once at boot
static SINK: Mutex<Option<&'static dyn LogSink>> = Mutex::new(None);

/// Install the global log sink
pub fn set_log_sink(sink: &'static dyn LogSink) {
    *SINK.lock() = Some(sink);
}

/// Forward a message to the sink if the level filter admits it
///
/// Called by the `klog!` macro family, not directly.
pub fn log_message(level: LogLevel, message: fmt::Arguments<'_>) {
    if !should_log(level) {
        return;
    }
    if let Some(sink) = *SINK.lock() {
        sink.log(level, message);
    }
}

/// Base logging macro, takes a level and a format string
///
/// Subsystem modules wrap this with their own prefix macros
/// (`sched_log!`, `syscall_log!`, `mutex_log!`, `kernel_log!`).
#[macro_export]
macro_rules! klog {
    ($level:expr, $($arg:tt)*) => {
        $crate::log::log_message($level, format_args!($($arg)*))
    };
}

/// Size of the retained log ring in bytes
const LOG_BUFFER_SIZE: usize = 4096;

/// Fixed-size ring of recent log lines for dmesg-style retrieval
///
/// Stores raw bytes; when the ring fills, the oldest bytes are dropped so
/// the newest lines are always retained.
pub struct LogBuffer {
    buffer: [u8; LOG_BUFFER_SIZE],
    start: usize,
    len: usize,
}

impl LogBuffer {
    pub const fn new() -> Self {
        Self {
            buffer: [0; LOG_BUFFER_SIZE],
            start: 0,
            len: 0,
        }
    }

    /// Number of bytes currently retained
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn push_byte(&mut self, byte: u8) {
        let pos = (self.start + self.len) % LOG_BUFFER_SIZE;
        self.buffer[pos] = byte;
        if self.len < LOG_BUFFER_SIZE {
            self.len += 1;
        } else {
            // ring full, the oldest byte is overwritten
            self.start = (self.start + 1) % LOG_BUFFER_SIZE;
        }
    }

    /// Copy the retained bytes, oldest first, into `out`
    ///
    /// Returns the number of bytes copied (bounded by `out.len()`).
    pub fn copy_to(&self, out: &mut [u8]) -> usize {
        let count = self.len.min(out.len());
        for (i, slot) in out.iter_mut().enumerate().take(count) {
            *slot = self.buffer[(self.start + i) % LOG_BUFFER_SIZE];
        }
        count
    }
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Write for LogBuffer {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for byte in s.bytes() {
            self.push_byte(byte);
        }
        Ok(())
    }
}

/// A `LogSink` that retains lines in a `LogBuffer`
pub struct BufferSink {
    buffer: Mutex<LogBuffer>,
}

impl BufferSink {
    pub const fn new() -> Self {
        Self {
            buffer: Mutex::new(LogBuffer::new()),
        }
    }

    /// Copy the retained bytes into `out`, oldest first
    pub fn copy_to(&self, out: &mut [u8]) -> usize {
        self.buffer.lock().copy_to(out)
    }
}

impl Default for BufferSink {
    fn default() -> Self {
        Self::new()
    }
}

impl LogSink for BufferSink {
    fn log(&self, level: LogLevel, message: fmt::Arguments<'_>) {
        use fmt::Write;
        let mut buffer = self.buffer.lock();
        let _ = writeln!(buffer, "[{}] {}", level, message);
    }
}
