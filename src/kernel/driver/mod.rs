// src/kernel/driver/mod.rs
//! デバイスドライバモジュール

pub mod console;
pub mod keyboard;
pub mod pit;
pub mod serial;
pub mod vga;

pub use serial::SerialPort;
pub use vga::VgaTextMode;
pub use keyboard::PS2Keyboard;

pub use console::{write_console, write_debug};
pub use serial::SERIAL1;
pub use vga::{init_vga, vga};
