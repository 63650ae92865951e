// src/kernel/mm/mod.rs
//! メモリ管理モジュール

use core::sync::atomic::AtomicU64;

pub mod paging;
pub mod allocator;
pub mod frame;

pub use allocator::{LockedHeap, LinkedListAllocator};
pub use frame::{BitmapFrameAllocator, LockedFrameAllocator};

/// Offset of the bootloader's direct physical-memory mapping, set once
/// from `BootInfo` during early boot. Frame-to-virtual-address lookups
/// (page table walks, zeroing freshly mapped pages) add this to a
/// physical address to reach it through the direct map.
pub static PHYS_MEM_OFFSET: AtomicU64 = AtomicU64::new(0);

/// Records the physical-memory offset reported by the bootloader. Must be
/// called exactly once, before any code that reads [`PHYS_MEM_OFFSET`].
pub fn set_physical_memory_offset(offset: u64) {
    PHYS_MEM_OFFSET.store(offset, core::sync::atomic::Ordering::Release);
}
