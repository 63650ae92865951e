// src/kernel/panic_code.rs

//! The closed set of fatal conditions the kernel can reach.
//!
//! This is orthogonal to [`crate::panic::state::PanicLevel`]: the level
//! tracks whether a panic is nesting inside another panic, while
//! [`PanicCode`] names *why* the panic was raised in the first place. A
//! [`PanicTelemetry`] capture carries both.

use core::fmt;

/// A fatal, unrecoverable kernel condition.
///
/// Recovery is never attempted for any of these; reaching one halts the
/// machine after the existing panic-output machinery has run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PanicCode {
    /// No more specific code applies.
    Unknown = 0,
    /// Control reached a point that a correct caller can never reach
    /// (e.g. after `TerminateThread` on the current thread).
    ImpossibleReturn,
    /// `Panic()` was invoked directly by kernel code as a deliberate halt.
    ManuallyInitiated,
    /// A unit test finished successfully and the test harness halts via panic.
    UnitTestOk,
    /// A loaded driver violated a contract the loader or dispatcher enforces.
    DriverFault,
    /// The heap allocator could not satisfy a request during normal operation.
    OutOfMemory,
    /// The heap allocator could not satisfy a request before the heap was
    /// fully brought up.
    OutOfMemoryDuringBootstrap,
    /// A single allocation request exceeded the maximum the allocator will
    /// ever be able to satisfy.
    HeapRequestTooLarge,
    /// A page fault occurred in an address range that is never paged.
    PageFaultInNonPagedArea,
    /// A `debug_assert!`-style invariant failed.
    AssertionFailed,
    /// The bootloader did not hand the kernel a usable physical memory map.
    NoMemoryMap,
    /// A code path that is not yet implemented was reached.
    NotImplemented,
    /// Code executed at an IRQL higher than the operation permits.
    InvalidIrql,
    /// A spinlock was acquired or released at the wrong IRQL for its
    /// declared level.
    SpinlockHeldAtWrongIrql,
    /// A priority queue was popped while empty or inserted into while full.
    PriorityQueueMisuse,
}

impl PanicCode {
    /// Sentinel past the highest valid code, for bounds-checked table sizing.
    pub const HIGHEST_VALUE: u8 = PanicCode::PriorityQueueMisuse as u8;

    /// Short, stable name suitable for serial/VGA panic banners.
    pub const fn name(self) -> &'static str {
        match self {
            PanicCode::Unknown => "UNKNOWN",
            PanicCode::ImpossibleReturn => "IMPOSSIBLE_RETURN",
            PanicCode::ManuallyInitiated => "MANUALLY_INITIATED",
            PanicCode::UnitTestOk => "UNIT_TEST_OK",
            PanicCode::DriverFault => "DRIVER_FAULT",
            PanicCode::OutOfMemory => "OUT_OF_MEMORY",
            PanicCode::OutOfMemoryDuringBootstrap => "OUT_OF_MEMORY_DURING_BOOTSTRAP",
            PanicCode::HeapRequestTooLarge => "HEAP_REQUEST_TOO_LARGE",
            PanicCode::PageFaultInNonPagedArea => "PAGE_FAULT_IN_NON_PAGED_AREA",
            PanicCode::AssertionFailed => "ASSERTION_FAILED",
            PanicCode::NoMemoryMap => "NO_MEMORY_MAP",
            PanicCode::NotImplemented => "NOT_IMPLEMENTED",
            PanicCode::InvalidIrql => "INVALID_IRQL",
            PanicCode::SpinlockHeldAtWrongIrql => "SPINLOCK_HELD_AT_WRONG_IRQL",
            PanicCode::PriorityQueueMisuse => "PRIORITY_QUEUE_MISUSE",
        }
    }
}

impl fmt::Display for PanicCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Raise a fatal, non-recoverable kernel panic carrying a [`PanicCode`] and
/// an optional message.
///
/// This funnels into the existing nested-panic-aware output path
/// (`crate::panic::state`) before halting; it never returns.
#[inline(never)]
pub fn kernel_panic(code: PanicCode, message: Option<&str>) -> ! {
    let _ = crate::panic::enter_panic();
    match message {
        Some(msg) => crate::debug_println!("[PANIC {}] {}", code, msg),
        None => crate::debug_println!("[PANIC {}]", code),
    }
    crate::hlt_loop()
}

#[cfg(all(test, feature = "std-tests"))]
mod tests {
    use super::*;

    #[test]
    fn highest_value_matches_last_variant() {
        assert_eq!(PanicCode::HIGHEST_VALUE, PanicCode::PriorityQueueMisuse as u8);
    }

    #[test]
    fn names_are_nonempty() {
        assert!(!PanicCode::Unknown.name().is_empty());
        assert!(!PanicCode::PriorityQueueMisuse.name().is_empty());
    }
}
