// src/kernel/config.rs

//! Centralized tunables for the subsystems specified in this kernel's core.
//!
//! Values pinned exactly by the design (canonical base, user address range,
//! relocation type numbers) live here once so every consuming module shares
//! a single definition rather than re-deriving magic numbers.

/// Page size assumed throughout the transfer layer and ELF loader.
pub const PAGE_SIZE: usize = 0x1000;

/// Inclusive lower bound of the user address range (`ARCH_USER_AREA_BASE`).
pub const USER_AREA_BASE: usize = 0x0000_1000;

/// Exclusive upper bound of the user address range (`ARCH_USER_AREA_LIMIT`).
pub const USER_AREA_LIMIT: usize = 0xC000_0000;

/// Pre-link base address assumed by the compiler for relocatable driver
/// objects (§3, §4.7).
pub const ELF_CANONICAL_BASE: u32 = 0xD000_0000;

/// Reserved PID meaning "no parent" / the adoptive root for orphans.
pub const PID_NONE: u64 = 0;

/// PID of `init`, the adoptive parent of orphaned processes.
pub const PID_INIT: u64 = 1;

/// Capacity of the PTY master->subordinate "keyboard" FIFO.
pub const PTY_INTERNAL_BUFFER_SIZE: usize = 256;

/// Capacity of the in-flight canonical-mode line buffer.
pub const PTY_LINE_BUFFER_SIZE: usize = 300;

/// Capacity of the flushed-line FIFO consumed by subordinate reads.
pub const PTY_FLUSHED_BUFFER_SIZE: usize = 500;

/// ASCII end-of-text; treated as a line terminator alongside `\n` in
/// canonical mode (§4.6).
pub const ETX: u8 = 0x03;

/// Capacity of the priority queue backing the line-processor's elevated
/// scheduling, matching the fixed-capacity discipline of the original
/// utility (`original_source/kernel/util/priorityqueue.c`).
pub const DEFAULT_PRIORITY_QUEUE_CAPACITY: usize = 64;
