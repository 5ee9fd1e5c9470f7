//! System Call Dispatcher and Handlers
//!
//! The trap handler reads the service number from argument slot 0, decodes
//! it into a `Service`, invokes the matching handler, and writes the
//! result back to slot 0. Handlers read their arguments from slots 1.. by
//! convention. String arguments arrive as NUL-terminated user pointers;
//! the write buffer arrives as pointer plus length.

use super::{Service, NO_SUCH_SERVICE};
use crate::kernel::Kernel;
use crate::sync::mutex::{MutexError, MutexKind};

/// Log syscall information
#[macro_export]
macro_rules! syscall_log {
    ($($arg:tt)*) => {
        $crate::klog!($crate::log::LogLevel::Info, "[SYSCALL] {}", format_args!($($arg)*))
    };
}

/// Log syscall warnings
#[macro_export]
macro_rules! syscall_warn {
    ($($arg:tt)*) => {
        $crate::klog!($crate::log::LogLevel::Warn, "[SYSCALL] {}", format_args!($($arg)*))
    };
}

impl Kernel<'_> {
    /// System-call trap handler
    pub(crate) fn handle_syscall(&mut self) {
        let number = self.hal.read_register(0);
        let Some(service) = Service::from_number(number) else {
            syscall_warn!("no such service: {}", number);
            self.hal.write_register(0, NO_SUCH_SERVICE as usize);
            return;
        };

        self.metrics.count_syscall(service);
        syscall_log!(
            "process {} invoked {}",
            self.current_or_fatal(),
            service.name()
        );

        let result = match service {
            Service::CreateProcess => self.sys_create_process(),
            Service::TerminateProcess => self.sys_terminate_process(),
            Service::Write => self.sys_write(),
            Service::GetId => self.sys_get_id(),
            Service::Sleep => self.sys_sleep(),
            Service::MutexCreate => self.sys_mutex_create(),
            Service::MutexOpen => self.sys_mutex_open(),
            Service::MutexLock => self.sys_mutex_lock(),
            Service::MutexUnlock => self.sys_mutex_unlock(),
            Service::MutexClose => self.sys_mutex_close(),
        };

        if result < 0 {
            syscall_warn!("{} failed with {}", service.name(), result);
        }
        self.hal.write_register(0, result as usize);
    }

    /// Decode the NUL-terminated user string in argument slot `slot`
    ///
    /// The embedder guarantees user pointers stay valid for the duration
    /// of the call; the kernel core only checks for null and for UTF-8.
    fn read_user_str<'b>(&self, slot: usize) -> Option<&'b str> {
        let ptr = self.hal.read_register(slot) as *const core::ffi::c_char;
        if ptr.is_null() {
            return None;
        }
        let cstr = unsafe { core::ffi::CStr::from_ptr(ptr) };
        cstr.to_str().ok()
    }

    fn sys_create_process(&mut self) -> isize {
        let Some(program) = self.read_user_str(1) else {
            return crate::sched::process::ProcessError::ImageLoadFailed.code();
        };
        match self.create_process(program) {
            Ok(id) => id as isize,
            Err(error) => error.code(),
        }
    }

    fn sys_terminate_process(&mut self) -> isize {
        self.terminate_current();
        // unreachable under a real HAL: the switch above never returns
        0
    }

    /// Copy the user buffer in slots 1 (pointer) and 2 (length) to the
    /// console
    fn sys_write(&mut self) -> isize {
        let ptr = self.hal.read_register(1) as *const u8;
        let len = self.hal.read_register(2);
        if ptr.is_null() || len == 0 {
            return 0;
        }
        let bytes = unsafe { core::slice::from_raw_parts(ptr, len) };
        self.hal.console_write(bytes);
        0
    }

    fn sys_get_id(&mut self) -> isize {
        self.current_or_fatal() as isize
    }

    fn sys_sleep(&mut self) -> isize {
        let seconds = self.hal.read_register(1) as u64;
        self.sleep_current(seconds);
        0
    }

    fn sys_mutex_create(&mut self) -> isize {
        let Some(name) = self.read_user_str(1) else {
            return MutexError::NameTooLong.code();
        };
        let kind = MutexKind::from_raw(self.hal.read_register(2));
        match self.mutex_create(name, kind) {
            Ok(desc) => desc as isize,
            Err(error) => error.code(),
        }
    }

    fn sys_mutex_open(&mut self) -> isize {
        let Some(name) = self.read_user_str(1) else {
            return MutexError::NotFound.code();
        };
        match self.mutex_open(name) {
            Ok(desc) => desc as isize,
            Err(error) => error.code(),
        }
    }

    fn sys_mutex_lock(&mut self) -> isize {
        let desc = self.hal.read_register(1);
        match self.mutex_lock(desc) {
            Ok(()) => 0,
            Err(error) => error.code(),
        }
    }

    fn sys_mutex_unlock(&mut self) -> isize {
        let desc = self.hal.read_register(1);
        match self.mutex_unlock(desc) {
            Ok(()) => 0,
            Err(error) => error.code(),
        }
    }

    fn sys_mutex_close(&mut self) -> isize {
        let desc = self.hal.read_register(1);
        match self.mutex_close(desc) {
            Ok(()) => 0,
            Err(error) => error.code(),
        }
    }
}
