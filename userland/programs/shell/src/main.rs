#![no_std]
#![no_main]

use libuser::io::println;
use libuser::mem::{alloc, dealloc};
use libuser::process::{exit, yield_now};
use libuser::syscall::write;
use core::panic::PanicInfo;

#[no_mangle]
#[link_section = ".text.entry"]
pub extern "C" fn _start() -> ! {
    println("Hello from Userland Shell!");
    println("=== Testing mmap-backed buffer ===\n");

    let addr = alloc(4096);
    if addr < 0 {
        println("mmap failed");
        exit(1);
    }
    println("Mapped a page");

    let message = b"Hello written straight to the PTY fd\n";
    if write(1, message) < 0 {
        println("Write failed");
        exit(1);
    }
    println("Wrote bytes to stdout");

    if dealloc(addr as u64, 4096) < 0 {
        println("munmap failed");
        exit(1);
    }
    println("Unmapped the page");

    yield_now();
    println("\n=== Demo Complete ===");
    exit(0);
}

#[panic_handler]
fn panic(_info: &PanicInfo) -> ! {
    println("Shell Panic!");
    exit(1);
}
