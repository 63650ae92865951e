// src/kernel/driver/serial.rs
//! シリアルポート (COM1) ドライバ
//!
//! CharDevice trait に基づいた型安全な実装。レジスタアクセスは
//! `crate::serial::backend::SerialHardware` の実装に委譲する。

use crate::kernel::core::{CharDevice, Device, DeviceError, KernelResult};
use crate::serial::backend::{DefaultBackend, Register, SerialHardware};
use core::fmt;
use spin::Mutex;

/// Line Status Register: Transmitter Holding Register Empty
const LSR_THR_EMPTY: u8 = 0x20;

/// シリアルポートドライバ (COM1)
pub struct SerialPort<B: SerialHardware = DefaultBackend> {
    hw: B,
}

impl<B: SerialHardware + Default> Default for SerialPort<B> {
    fn default() -> Self {
        Self { hw: B::default() }
    }
}

impl<B: SerialHardware + Default> SerialPort<B> {
    /// 既定のハードウェアバックエンドで作成
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl<B: SerialHardware> Device for SerialPort<B> {
    fn name(&self) -> &'static str {
        "Serial (COM1)"
    }

    fn init(&mut self) -> KernelResult<()> {
        Ok(())
    }

    fn reset(&mut self) -> KernelResult<()> {
        Ok(())
    }
}

impl<B: SerialHardware> CharDevice for SerialPort<B> {
    fn read_byte(&self) -> KernelResult<Option<u8>> {
        // 受信割り込みキューを持たないため未サポート
        Err(DeviceError::NotFound.into())
    }

    fn write_byte(&mut self, byte: u8) -> KernelResult<()> {
        while self.hw.read(Register::LineStatus) & LSR_THR_EMPTY == 0 {
            core::hint::spin_loop();
        }
        self.hw.write(Register::Data, byte);
        Ok(())
    }
}

impl<B: SerialHardware> fmt::Write for SerialPort<B> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for byte in s.bytes() {
            self.write_byte(byte).map_err(|_| fmt::Error)?;
        }
        Ok(())
    }
}

/// グローバルシリアルポート (COM1)。`console::write_debug` と
/// `syscall::sys_write`（stdout=fd 1）の両方が、画面を経由せずここへ
/// 直接書き込む。
pub static SERIAL1: Mutex<SerialPort> = Mutex::new(SerialPort {
    hw: DefaultBackend::new(),
});
