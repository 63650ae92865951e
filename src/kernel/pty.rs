// src/kernel/pty.rs

//! Pseudo-terminal line discipline (§4.6).
//!
//! A PTY pair is two linked endpoints — a master ("the screen and the
//! keyboard") and a subordinate (what a program opens as its controlling
//! terminal) — sharing three mailboxes and a per-pair in-flight line buffer
//! processed by a dedicated thread applying termios canonical-mode/echo
//! policy.

use alloc::sync::Arc;
use alloc::vec::Vec;
use spin::Mutex;

use crate::errors::unified::PtyError;
use crate::kernel::config::{PTY_FLUSHED_BUFFER_SIZE, PTY_INTERNAL_BUFFER_SIZE, PTY_LINE_BUFFER_SIZE, ETX};
use crate::kernel::fs::{FileDescriptor, FileError, FileResult};
use crate::sync::mailbox::Mailbox;

/// termios-style line discipline flags (§6: default `ICANON | ECHO`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Termios {
    bits: u8,
}

impl Termios {
    pub const ICANON: u8 = 0b01;
    pub const ECHO: u8 = 0b10;

    pub const fn new(bits: u8) -> Self {
        Self { bits }
    }

    pub const fn default_for_subordinate() -> Self {
        Self::new(Self::ICANON | Self::ECHO)
    }

    pub const fn canonical(self) -> bool {
        self.bits & Self::ICANON != 0
    }

    pub const fn echo(self) -> bool {
        self.bits & Self::ECHO != 0
    }
}

/// A single character in the in-flight line buffer together with its
/// display width, future-proofing for wide characters (§4.6 step 3).
#[derive(Debug, Clone, Copy)]
struct LineChar {
    byte: u8,
    #[allow(dead_code)]
    width: u8,
}

/// Shared state between a pair's master and subordinate endpoints.
pub struct Shared {
    display_buffer: Mailbox,
    keybrd_buffer: Mailbox,
    flushed_buffer: Mailbox,
    termios: Mutex<Termios>,
    line_buffer: Mutex<Vec<LineChar>>,
    closed: core::sync::atomic::AtomicBool,
}

impl Shared {
    fn new() -> Self {
        Self {
            display_buffer: Mailbox::new(PTY_INTERNAL_BUFFER_SIZE),
            keybrd_buffer: Mailbox::new(PTY_INTERNAL_BUFFER_SIZE),
            flushed_buffer: Mailbox::new(PTY_FLUSHED_BUFFER_SIZE),
            termios: Mutex::new(Termios::default_for_subordinate()),
            line_buffer: Mutex::new(Vec::with_capacity(PTY_LINE_BUFFER_SIZE)),
            closed: core::sync::atomic::AtomicBool::new(false),
        }
    }

    fn is_closed(&self) -> bool {
        self.closed.load(core::sync::atomic::Ordering::Acquire)
    }
}

fn flush_line_buffer(shared: &Shared) {
    let mut line = shared.line_buffer.lock();
    for c in line.iter() {
        shared.flushed_buffer.blocking_put(c.byte);
    }
    line.clear();
}

fn remove_from_line_buffer(shared: &Shared) -> bool {
    let mut line = shared.line_buffer.lock();
    line.pop().is_some()
}

fn add_to_line_buffer(shared: &Shared, byte: u8, width: u8) {
    let mut line = shared.line_buffer.lock();
    if line.len() == PTY_LINE_BUFFER_SIZE {
        return; // overflow silently dropped (§4.6 step 3)
    }
    line.push(LineChar { byte, width });
}

/// One iteration of the line-processor thread's loop: consumes exactly one
/// keyboard byte and applies the termios policy (§4.6). Split out from the
/// thread entry point so it is directly unit-testable without a real
/// scheduler.
fn process_one_keystroke(shared: &Shared) {
    let termios = *shared.termios.lock();
    let echo = termios.echo();
    let canon = termios.canonical();

    let c = shared.keybrd_buffer.blocking_get();

    // Echo happens before any line-buffer mutation: the backspace check
    // below needs to observe the pre-mutation emptiness of the line.
    if echo {
        if c == b'\b' && canon {
            if !{
                let line = shared.line_buffer.lock();
                line.is_empty()
            } {
                shared.display_buffer.blocking_put(b'\b');
                shared.display_buffer.blocking_put(b' ');
                shared.display_buffer.blocking_put(b'\b');
            }
        } else {
            shared.display_buffer.blocking_put(c);
        }
    }

    if c == b'\b' && canon {
        remove_from_line_buffer(shared);
    } else {
        add_to_line_buffer(shared, c, 1);
    }

    if c == b'\n' || c == ETX || !canon {
        flush_line_buffer(shared);
    }
}

/// Entry point for the dedicated per-pair line-processor thread. Runs at an
/// elevated fixed priority so keystrokes are not starved by userland
/// (§4.6); this core treats scheduling priority as an external contract and
/// only documents the requirement here.
pub fn line_processor_main(shared: Arc<Shared>) -> ! {
    loop {
        if shared.is_closed() {
            crate::kernel::scheduler::yield_now();
            continue;
        }
        process_one_keystroke(&shared);
    }
}

/// The master endpoint: "the screen and the keyboard".
pub struct Master {
    shared: Arc<Shared>,
}

/// The subordinate endpoint: what a process opens as its controlling
/// terminal.
pub struct Subordinate {
    shared: Arc<Shared>,
}

impl Master {
    /// Drains one byte at a time from the display FIFO until `buf` is full
    /// (blocking when the FIFO is empty).
    fn read_blocking(&mut self, buf: &mut [u8]) -> FileResult<usize> {
        if self.shared.is_closed() {
            return Err(FileError::BrokenPipe);
        }
        for slot in buf.iter_mut() {
            *slot = self.shared.display_buffer.blocking_get();
        }
        Ok(buf.len())
    }

    /// Pushes bytes from `buf` onto the keyboard FIFO (blocking when full).
    fn write_blocking(&mut self, buf: &[u8]) -> FileResult<usize> {
        if self.shared.is_closed() {
            return Err(FileError::BrokenPipe);
        }
        for &byte in buf {
            self.shared.keybrd_buffer.blocking_put(byte);
        }
        Ok(buf.len())
    }
}

impl FileDescriptor for Master {
    fn read(&mut self, buf: &mut [u8]) -> FileResult<usize> {
        self.read_blocking(buf)
    }

    fn write(&mut self, buf: &[u8]) -> FileResult<usize> {
        self.write_blocking(buf)
    }

    fn close(&mut self) -> FileResult<()> {
        self.shared
            .closed
            .store(true, core::sync::atomic::Ordering::Release);
        Ok(())
    }
}

impl Subordinate {
    /// Blocks for the first byte from the flushed-line FIFO, then greedily
    /// drains any further immediately-available bytes without blocking
    /// (§4.6 Subordinate read).
    fn read_blocking(&mut self, buf: &mut [u8]) -> FileResult<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        if self.shared.is_closed() {
            return Err(FileError::BrokenPipe);
        }

        let mut n = 0;
        buf[0] = self.shared.flushed_buffer.blocking_get();
        n += 1;

        while n < buf.len() {
            match self
                .shared
                .flushed_buffer
                .get(crate::sync::mailbox::Timeout::Immediate)
            {
                Some(byte) => {
                    buf[n] = byte;
                    n += 1;
                }
                None => break,
            }
        }

        Ok(n)
    }

    /// Pushes bytes from `buf` into the display FIFO ("writing to stdout").
    fn write_blocking(&mut self, buf: &[u8]) -> FileResult<usize> {
        if self.shared.is_closed() {
            return Err(FileError::BrokenPipe);
        }
        for &byte in buf {
            self.shared.display_buffer.blocking_put(byte);
        }
        Ok(buf.len())
    }

    /// Reconfigures this subordinate's termios flags.
    pub fn set_termios(&self, termios: Termios) {
        *self.shared.termios.lock() = termios;
    }

    pub fn termios(&self) -> Termios {
        *self.shared.termios.lock()
    }
}

impl FileDescriptor for Subordinate {
    fn read(&mut self, buf: &mut [u8]) -> FileResult<usize> {
        self.read_blocking(buf)
    }

    fn write(&mut self, buf: &[u8]) -> FileResult<usize> {
        self.write_blocking(buf)
    }

    fn close(&mut self) -> FileResult<()> {
        self.shared
            .closed
            .store(true, core::sync::atomic::Ordering::Release);
        Ok(())
    }
}

/// Creates a linked master/subordinate pair. The caller is responsible for
/// spawning [`line_processor_main`] on a thread holding the returned
/// `Arc<Shared>` clone (thread creation is an external contract per §1).
pub fn create_pseudo_terminal() -> (Master, Subordinate, Arc<Shared>) {
    let shared = Arc::new(Shared::new());
    let master = Master {
        shared: shared.clone(),
    };
    let subordinate = Subordinate {
        shared: shared.clone(),
    };
    (master, subordinate, shared)
}

/// A torn-down pty pair reports [`PtyError::Closed`] rather than succeeding
/// silently; used by higher layers that need a `Result` rather than this
/// module's blocking-only [`FileDescriptor`] semantics (§4.5's process
/// teardown path, which must not block indefinitely on an abandoned pty).
pub fn ensure_open(shared: &Shared) -> Result<(), PtyError> {
    if shared.is_closed() {
        Err(PtyError::Closed)
    } else {
        Ok(())
    }
}

#[cfg(all(test, feature = "std-tests"))]
mod tests {
    use super::*;
    use alloc::string::String;

    fn drain_available(mbox: &Mailbox) -> String {
        let mut out = String::new();
        while let Some(b) = mbox.get(crate::sync::mailbox::Timeout::Immediate) {
            out.push(b as char);
        }
        out
    }

    #[test]
    fn simple_line_echoes_and_flushes_on_newline() {
        let shared = Shared::new();
        for &b in b"Hi\n" {
            shared.keybrd_buffer.blocking_put(b);
        }
        for _ in 0..3 {
            process_one_keystroke(&shared);
        }
        assert_eq!(drain_available(&shared.display_buffer), "Hi\n");
        assert_eq!(drain_available(&shared.flushed_buffer), "Hi\n");
    }

    #[test]
    fn backspace_on_empty_line_is_a_noop() {
        let shared = Shared::new();
        shared.keybrd_buffer.blocking_put(b'\b');
        process_one_keystroke(&shared);
        // No display bytes: echo only fires for backspace when the line is
        // non-empty.
        assert_eq!(drain_available(&shared.display_buffer), "");
        assert!(shared.line_buffer.lock().is_empty());
    }

    #[test]
    fn backspace_erases_last_char_and_echoes_erase_sequence() {
        let shared = Shared::new();
        for &b in b"Hel\x08\x08y\n" {
            shared.keybrd_buffer.blocking_put(b);
        }
        for _ in 0.."Hel\x08\x08y\n".len() {
            process_one_keystroke(&shared);
        }
        // H e l \b ' ' \b \b ' ' \b y \n  (matches §8 Property 8 and S5)
        assert_eq!(
            drain_available(&shared.display_buffer),
            "Hel\u{8} \u{8}\u{8} \u{8}y\n"
        );
        assert_eq!(drain_available(&shared.flushed_buffer), "Hy\n");
    }

    #[test]
    fn non_canonical_mode_flushes_every_byte() {
        let shared = Shared::new();
        shared.termios.lock().bits = 0; // no ICANON, no ECHO
        shared.keybrd_buffer.blocking_put(b'x');
        process_one_keystroke(&shared);
        assert_eq!(drain_available(&shared.display_buffer), "");
        assert_eq!(drain_available(&shared.flushed_buffer), "x");
    }

    #[test]
    fn etx_flushes_like_newline() {
        let shared = Shared::new();
        for &b in &[b'a', ETX] {
            shared.keybrd_buffer.blocking_put(b);
        }
        process_one_keystroke(&shared);
        process_one_keystroke(&shared);
        assert_eq!(drain_available(&shared.flushed_buffer), "a\u{3}");
    }

    #[test]
    fn overflow_is_silently_dropped() {
        let shared = Shared::new();
        shared.termios.lock().bits = Termios::ICANON; // canon, no echo
        for _ in 0..(PTY_LINE_BUFFER_SIZE + 5) {
            shared.keybrd_buffer.blocking_put(b'a');
        }
        for _ in 0..(PTY_LINE_BUFFER_SIZE + 5) {
            process_one_keystroke(&shared);
        }
        assert_eq!(shared.line_buffer.lock().len(), PTY_LINE_BUFFER_SIZE);
    }
}
