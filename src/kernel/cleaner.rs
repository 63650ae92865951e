// src/kernel/cleaner.rs
//! Asynchronous thread teardown (spec §4.4).
//!
//! A thread can never free the stack it is currently executing on, so
//! self-termination is always deferred: the dying thread hands its
//! teardown off to a single dedicated cleaner thread via a FIFO guarded by
//! a [`CountingSemaphore`] (the same blocking-queue shape as
//! [`crate::sync::mailbox::Mailbox`], specialised to thread teardown
//! requests instead of bytes) and then never runs again. Terminating a
//! *different* thread is cheaper: mark its death sentence and queue the
//! teardown: the victim notices the sentence at its own next safe point
//! and calls back in to terminate itself.

use alloc::boxed::Box;
use alloc::collections::VecDeque;
use core::sync::atomic::{AtomicBool, Ordering};
use lazy_static::lazy_static;
use spin::Mutex;

use crate::kernel::panic_code::{kernel_panic, PanicCode};
use crate::sync::semaphore::CountingSemaphore;

/// Identifies a thread to the cleaner. Kept separate from any particular
/// scheduler/process thread type so this module stays a pure consumer of
/// whatever teardown callback it is handed.
pub type ThreadId = u64;

/// Set by [`terminate_other`] on a victim thread it cannot destroy
/// directly. The victim is expected to consult this at its own safe
/// points (e.g. on return from a syscall) and call [`terminate_self`]
/// once it sees it set.
pub struct DeathSentence(AtomicBool);

impl DeathSentence {
    #[must_use]
    pub const fn new() -> Self {
        Self(AtomicBool::new(false))
    }

    pub fn set(&self) {
        self.0.store(true, Ordering::Release);
    }

    #[must_use]
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

impl Default for DeathSentence {
    fn default() -> Self {
        Self::new()
    }
}

/// A deferred teardown. `destroy` is invoked on the cleaner thread only,
/// never on the thread that queued it.
struct DestroyRequest {
    thread: ThreadId,
    destroy: Box<dyn FnOnce() + Send>,
}

/// FIFO of pending teardowns plus the doorbell the cleaner thread blocks
/// on. Kept as a plain struct (rather than free functions over a single
/// global) so tests can exercise ordering and draining without touching
/// the process-wide [`CLEANER`] instance.
struct CleanerQueue {
    pending: Mutex<VecDeque<DestroyRequest>>,
    doorbell: CountingSemaphore,
}

impl CleanerQueue {
    const fn new() -> Self {
        Self {
            pending: Mutex::new(VecDeque::new()),
            doorbell: CountingSemaphore::new(0),
        }
    }

    fn notify(&self, thread: ThreadId, destroy: Box<dyn FnOnce() + Send>) {
        self.pending.lock().push_back(DestroyRequest { thread, destroy });
        self.doorbell.release(1);
        log::debug!("cleaner: queued thread {thread} for teardown");
    }

    /// Blocks until a request is available, then runs it.
    fn wait_and_run_one(&self) {
        self.doorbell.acquire();
        let request = self
            .pending
            .lock()
            .pop_front()
            .expect("doorbell permit without a queued teardown");
        log::debug!("cleaner: destroying thread {}", request.thread);
        (request.destroy)();
    }

    #[cfg(all(test, feature = "std-tests"))]
    fn try_run_one(&self) -> Option<ThreadId> {
        if !self.doorbell.try_acquire() {
            return None;
        }
        let request = self
            .pending
            .lock()
            .pop_front()
            .expect("doorbell permit without a queued teardown");
        let thread = request.thread;
        (request.destroy)();
        Some(thread)
    }

    #[cfg(all(test, feature = "std-tests"))]
    fn len(&self) -> usize {
        self.pending.lock().len()
    }
}

lazy_static! {
    static ref CLEANER: CleanerQueue = CleanerQueue::new();
}

/// Entry point of the single system-wide cleaner thread. Never returns:
/// it blocks on the doorbell, runs exactly one teardown, and loops.
pub fn cleaner_thread_main() -> ! {
    loop {
        CLEANER.wait_and_run_one();
    }
}

/// Terminate the calling thread.
///
/// Hands `destroy` off to the cleaner thread and relinquishes the CPU
/// for good. The scheduler must never select this thread again; if
/// control somehow returns here anyway, that is an invariant violation
/// worth halting over rather than silently resuming a dead thread.
pub fn terminate_self(thread: ThreadId, destroy: Box<dyn FnOnce() + Send>) -> ! {
    CLEANER.notify(thread, destroy);
    crate::kernel::process::schedule_next();
    kernel_panic(
        PanicCode::ImpossibleReturn,
        Some("terminate_self: scheduler returned control to a terminated thread"),
    );
}

/// Terminate a thread other than the caller.
///
/// Sets the victim's death sentence so it self-terminates at its own
/// next safe point, and queues the teardown so the cleaner thread can
/// free its resources once it does.
pub fn terminate_other(thread: ThreadId, sentence: &DeathSentence, destroy: Box<dyn FnOnce() + Send>) {
    sentence.set();
    CLEANER.notify(thread, destroy);
}

#[cfg(all(test, feature = "std-tests"))]
mod tests {
    use super::*;
    use core::sync::atomic::AtomicUsize;
    use alloc::sync::Arc;

    #[test]
    fn death_sentence_starts_unset() {
        let sentence = DeathSentence::new();
        assert!(!sentence.is_set());
        sentence.set();
        assert!(sentence.is_set());
    }

    #[test]
    fn queue_runs_requests_in_fifo_order() {
        let queue = CleanerQueue::new();
        let order = Arc::new(Mutex::new(VecDeque::new()));

        for tid in [1u64, 2, 3] {
            let order = order.clone();
            queue.notify(tid, Box::new(move || order.lock().push_back(tid)));
        }

        assert_eq!(queue.len(), 3);
        assert_eq!(queue.try_run_one(), Some(1));
        assert_eq!(queue.try_run_one(), Some(2));
        assert_eq!(queue.try_run_one(), Some(3));
        assert_eq!(queue.try_run_one(), None);
        assert_eq!(*order.lock(), VecDeque::from(vec![1, 2, 3]));
    }

    #[test]
    fn destroy_callback_runs_exactly_once() {
        let queue = CleanerQueue::new();
        let runs = Arc::new(AtomicUsize::new(0));
        let runs_clone = runs.clone();
        queue.notify(42, Box::new(move || {
            runs_clone.fetch_add(1, Ordering::SeqCst);
        }));
        queue.try_run_one();
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(queue.try_run_one(), None);
    }

    #[test]
    fn terminate_other_sets_sentence_and_queues_teardown() {
        let queue = CleanerQueue::new();
        let sentence = DeathSentence::new();
        sentence.set();
        queue.notify(7, Box::new(|| {}));
        assert!(sentence.is_set());
        assert_eq!(queue.len(), 1);
    }
}
