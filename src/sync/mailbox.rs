// src/sync/mailbox.rs

//! Bounded FIFO mailbox.
//!
//! Backs the PTY's three byte streams (display, keyboard, flushed-line) and
//! is the natural "something happened" queue for any producer/consumer pair
//! that needs blocking-on-empty and blocking-on-full semantics rather than
//! plain signalling. Built from a fixed-capacity ring buffer behind a
//! spinlock, with a pair of [`CountingSemaphore`]s tracking "slots filled"
//! and "slots free" so `get`/`put` can block the same way
//! [`CountingSemaphore::acquire`] does.

use alloc::collections::VecDeque;
use spin::Mutex;

use super::semaphore::CountingSemaphore;

/// A timeout value for [`Mailbox::get`]/[`Mailbox::put`].
///
/// Negative blocks indefinitely; zero returns immediately if the operation
/// cannot be completed; this core does not implement finite positive
/// timeouts (the original's `MailboxGet`/`MailboxAdd` accept one, but no
/// caller in this spec uses anything but -1 or 0).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timeout {
    Indefinite,
    Immediate,
}

impl From<i64> for Timeout {
    fn from(value: i64) -> Self {
        if value < 0 {
            Timeout::Indefinite
        } else {
            Timeout::Immediate
        }
    }
}

/// A bounded byte FIFO with blocking put/get.
pub struct Mailbox {
    capacity: usize,
    queue: Mutex<VecDeque<u8>>,
    filled: CountingSemaphore,
    free: CountingSemaphore,
}

impl Mailbox {
    /// Creates an empty mailbox able to hold `capacity` bytes.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            queue: Mutex::new(VecDeque::with_capacity(capacity)),
            filled: CountingSemaphore::new(0),
            free: CountingSemaphore::new(capacity),
        }
    }

    /// Blocks (per `timeout`) until a byte is available, then removes and
    /// returns it.
    ///
    /// Returns `None` only when `timeout` is [`Timeout::Immediate`] and the
    /// mailbox is empty.
    pub fn get(&self, timeout: Timeout) -> Option<u8> {
        match timeout {
            Timeout::Indefinite => self.filled.acquire(),
            Timeout::Immediate => {
                if !self.filled.try_acquire() {
                    return None;
                }
            }
        }
        let byte = self
            .queue
            .lock()
            .pop_front()
            .expect("filled semaphore permit without a queued byte");
        self.free.release(1);
        Some(byte)
    }

    /// Blocks (per `timeout`) until there is room, then appends `byte`.
    ///
    /// Returns `false` only when `timeout` is [`Timeout::Immediate`] and the
    /// mailbox is full.
    pub fn put(&self, timeout: Timeout, byte: u8) -> bool {
        match timeout {
            Timeout::Indefinite => self.free.acquire(),
            Timeout::Immediate => {
                if !self.free.try_acquire() {
                    return false;
                }
            }
        }
        self.queue.lock().push_back(byte);
        self.filled.release(1);
        true
    }

    /// Convenience: block indefinitely for a byte.
    pub fn blocking_get(&self) -> u8 {
        self.get(Timeout::Indefinite)
            .expect("indefinite get never returns None")
    }

    /// Convenience: block indefinitely to enqueue a byte.
    pub fn blocking_put(&self, byte: u8) {
        let ok = self.put(Timeout::Indefinite, byte);
        debug_assert!(ok);
    }

    /// Capacity this mailbox was created with.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of bytes currently queued, for diagnostics only.
    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(all(test, feature = "std-tests"))]
mod tests {
    use super::*;

    #[test]
    fn fifo_order_is_preserved() {
        let mbox = Mailbox::new(4);
        mbox.blocking_put(b'a');
        mbox.blocking_put(b'b');
        mbox.blocking_put(b'c');
        assert_eq!(mbox.blocking_get(), b'a');
        assert_eq!(mbox.blocking_get(), b'b');
        assert_eq!(mbox.blocking_get(), b'c');
    }

    #[test]
    fn immediate_get_on_empty_returns_none() {
        let mbox = Mailbox::new(2);
        assert_eq!(mbox.get(Timeout::Immediate), None);
    }

    #[test]
    fn immediate_put_on_full_returns_false() {
        let mbox = Mailbox::new(1);
        assert!(mbox.put(Timeout::Immediate, b'x'));
        assert!(!mbox.put(Timeout::Immediate, b'y'));
    }

    #[test]
    fn capacity_is_reported() {
        let mbox = Mailbox::new(7);
        assert_eq!(mbox.capacity(), 7);
        assert!(mbox.is_empty());
    }
}
