// src/kernel/logging.rs
//! [`log`] facade wiring.
//!
//! Routes every `log::{trace,debug,info,warn,error}!` call through the
//! existing serial-only `debug_print!` channel so new subsystems (transfer
//! layer, process lifecycle, cleaner, PTY line discipline, ELF loader,
//! syscall dispatch) get structured logging without a second console
//! abstraction. Never touches the screen, matching `debug_print!`'s
//! existing contract.

use core::sync::atomic::{AtomicBool, Ordering};
use log::{Level, LevelFilter, Metadata, Record};

struct KernelLogger;

static INSTALLED: AtomicBool = AtomicBool::new(false);

impl log::Log for KernelLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= max_level_for_build()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        crate::debug_println!(
            "[{}] {}: {}",
            level_tag(record.level()),
            record.target(),
            record.args()
        );
    }

    fn flush(&self) {}
}

const fn level_tag(level: Level) -> &'static str {
    match level {
        Level::Error => "ERROR",
        Level::Warn => "WARN",
        Level::Info => "INFO",
        Level::Debug => "DEBUG",
        Level::Trace => "TRACE",
    }
}

#[cfg(debug_assertions)]
const fn max_level_for_build() -> LevelFilter {
    LevelFilter::Debug
}

#[cfg(not(debug_assertions))]
const fn max_level_for_build() -> LevelFilter {
    LevelFilter::Info
}

static LOGGER: KernelLogger = KernelLogger;

/// Installs the kernel logger as the global [`log`] sink.
///
/// Idempotent: a second call is a no-op rather than a panic, since boot
/// sequences sometimes re-enter early init paths during testing.
pub fn install() {
    if INSTALLED.swap(true, Ordering::AcqRel) {
        return;
    }
    log::set_max_level(max_level_for_build());
    // SAFETY: `LOGGER` is `'static` and we guard against double-install
    // above; `set_logger` only fails if a logger was already installed,
    // which cannot happen given the guard.
    let _ = log::set_logger(&LOGGER);
}
