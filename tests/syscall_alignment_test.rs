// tests/syscall_alignment_test.rs
//! Integration coverage for the numbered syscall dispatch table (§4.2).
//!
//! Runs under the `#[test_case]` no_std harness so it exercises the real
//! `kernel::syscall::dispatch` entry point rather than a host-side mock.

#![no_std]
#![no_main]
#![feature(custom_test_frameworks)]
#![test_runner(tiny_os::test_runner)]
#![reexport_test_harness_main = "test_main"]

use bootloader_api::{entry_point, BootInfo};
use core::panic::PanicInfo;
use tiny_os::{serial_print, serial_println};
use tiny_os::kernel::syscall;

entry_point!(test_kernel_main);

fn test_kernel_main(_boot_info: &'static mut BootInfo) -> ! {
    tiny_os::init::initialize_all().unwrap();
    test_main();
    tiny_os::hlt_loop();
}

#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    tiny_os::test_panic_handler(info)
}

/// §8 S1: an out-of-range call index returns `ENOSYS`, not a panic.
#[test_case]
fn dispatch_rejects_out_of_range_call_index() {
    serial_print!("dispatch_rejects_out_of_range_call_index... ");

    let result = syscall::dispatch(99, 0, 0, 0, 0, 0, 0);
    assert_eq!(result, syscall::ENOSYS);

    serial_println!("[ok]");
}

/// §8 S1: call index 0 (`yield`) succeeds.
#[test_case]
fn dispatch_yield_succeeds() {
    serial_print!("dispatch_yield_succeeds... ");

    let result = syscall::dispatch(0, 0, 0, 0, 0, 0, 0);
    assert_eq!(result, syscall::SUCCESS);

    serial_println!("[ok]");
}

/// §4.1/§6: a `write` syscall with a null user pointer is rejected with
/// `EFAULT` rather than dereferencing it.
#[test_case]
fn dispatch_write_rejects_null_pointer() {
    serial_print!("dispatch_write_rejects_null_pointer... ");

    let result = syscall::dispatch(6, 1, 0, 100, 0, 0, 0);
    assert_eq!(result, syscall::EFAULT);

    serial_println!("[ok]");
}

/// §4.1/§6: a `write` syscall pointing into kernel address space is
/// rejected rather than crossing the trust boundary.
#[test_case]
fn dispatch_write_rejects_kernel_address() {
    serial_print!("dispatch_write_rejects_kernel_address... ");

    let result = syscall::dispatch(6, 1, 0xFFFF_8000_0000_0000, 100, 0, 0);
    assert_eq!(result, syscall::EFAULT);

    serial_println!("[ok]");
}

/// §4.2: `open`/`seek`/`tell` are named calls with no backing namespace or
/// seekable descriptor kind in this core, so they report `ENOSYS` honestly
/// rather than panicking or silently succeeding.
#[test_case]
fn dispatch_unimplemented_calls_report_enosys() {
    serial_print!("dispatch_unimplemented_calls_report_enosys... ");

    assert_eq!(syscall::dispatch(4, 0, 0, 0, 0, 0, 0), syscall::ENOSYS); // open
    assert_eq!(syscall::dispatch(8, 0, 0, 0, 0, 0, 0), syscall::ENOSYS); // seek
    assert_eq!(syscall::dispatch(10, 0, 0, 0, 0, 0, 0), syscall::ENOSYS); // tell

    serial_println!("[ok]");
}
