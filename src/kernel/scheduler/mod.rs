//! Process Scheduler

use crate::kernel::process::{ProcessId, PROCESS_TABLE};
use spin::Mutex;
use alloc::vec::Vec;
use lazy_static::lazy_static;

/// Simple round-robin scheduler
pub struct RoundRobinScheduler {
    current_pid: Option<ProcessId>,
}

impl RoundRobinScheduler {
    pub const fn new() -> Self {
        Self { current_pid: None }
    }
    
    /// Select next process to run
    pub fn schedule(&mut self) -> Option<ProcessId> {
        let table = PROCESS_TABLE.lock();
        
        // Get all ready processes
        let ready: Vec<_> = table
            .ready_processes()
            .map(|p| p.pid())
            .collect();
        
        if ready.is_empty() {
            return None;
        }
        
        // Round-robin: pick next after current
        let next_idx = if let Some(current) = self.current_pid {
            ready
                .iter()
                .position(|&pid| pid == current)
                .map(|idx| (idx + 1) % ready.len())
                .unwrap_or(0)
        } else {
            0
        };
        
        let next_pid = ready[next_idx];
        self.current_pid = Some(next_pid);
        
        Some(next_pid)
    }
}

lazy_static! {
    pub static ref SCHEDULER: Mutex<RoundRobinScheduler> =
        Mutex::new(RoundRobinScheduler::new());
}

/// Voluntarily give up the remainder of the current time slice.
///
/// Called by threads blocked on a semaphore or FIFO, and by the userland
/// `yield` syscall. Picks the next ready process and performs a context
/// switch if one is available; otherwise returns immediately so the caller
/// can re-check its wait condition.
pub fn yield_now() {
    let next = SCHEDULER.lock().schedule();
    match next {
        Some(pid) => {
            let table = PROCESS_TABLE.lock();
            if let Some(process) = table.get_process(pid) {
                // Safety: `process` belongs to the live process table and its
                // page table frame/kernel stack remain valid for the
                // duration of the switch.
                unsafe { crate::kernel::process::switch_to_process(process) };
            }
        }
        None => x86_64::instructions::hlt(),
    }
}
