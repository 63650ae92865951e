//! Process management API

use crate::syscall;

/// Exit the current process with the given exit code
pub fn exit(code: i32) -> ! {
    syscall::exit(code)
}

/// Give up the remainder of the current time slice
pub fn yield_now() {
    let _ = syscall::yield_now();
}
