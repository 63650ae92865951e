// src/error.rs

//! Unified error types for the kernel
//!
//! This module provides a consistent error handling approach across
//! all kernel subsystems.

use core::fmt;

/// Top-level kernel error type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelError {
    /// VGA subsystem error
    Vga(VgaError),
    /// Serial subsystem error
    Serial(SerialError),
    /// Initialization error
    Init(InitError),
    /// Display subsystem error
    Display(DisplayError),
    /// User/kernel transfer layer error
    Transfer(TransferError),
    /// Process lifecycle error
    Process(ProcessError),
    /// PTY line discipline error
    Pty(PtyError),
    /// ELF loader error
    Elf(ElfError),
}

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KernelError::Vga(e) => write!(f, "VGA error: {}", e),
            KernelError::Serial(e) => write!(f, "Serial error: {}", e),
            KernelError::Init(e) => write!(f, "Init error: {}", e),
            KernelError::Display(e) => write!(f, "Display error: {}", e),
            KernelError::Transfer(e) => write!(f, "transfer error: {}", e),
            KernelError::Process(e) => write!(f, "process error: {}", e),
            KernelError::Pty(e) => write!(f, "pty error: {}", e),
            KernelError::Elf(e) => write!(f, "elf error: {}", e),
        }
    }
}

/// User/kernel transfer layer errors (§4.1)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferError {
    /// Buffer range fails the address-range or permission-bit predicate
    InvalidUserRange,
}

impl fmt::Display for TransferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferError::InvalidUserRange => write!(f, "invalid user-space range"),
        }
    }
}

impl From<TransferError> for KernelError {
    fn from(err: TransferError) -> Self {
        KernelError::Transfer(err)
    }
}

impl ErrorContext for TransferError {
    fn context(&self) -> &'static str {
        match self {
            TransferError::InvalidUserRange => {
                "user buffer range failed address bound or permission validation"
            }
        }
    }
}

/// Process lifecycle errors (§4.5)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessError {
    /// No process with the given PID is resident in the process table
    NoSuchProcess,
    /// Caller has no children to wait for
    NoChildren,
}

impl fmt::Display for ProcessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessError::NoSuchProcess => write!(f, "no such process"),
            ProcessError::NoChildren => write!(f, "no children"),
        }
    }
}

impl From<ProcessError> for KernelError {
    fn from(err: ProcessError) -> Self {
        KernelError::Process(err)
    }
}

impl ErrorContext for ProcessError {
    fn context(&self) -> &'static str {
        match self {
            ProcessError::NoSuchProcess => "PID not present in the global process table",
            ProcessError::NoChildren => "wait() called with an empty live-children set",
        }
    }
}

/// PTY line-discipline errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PtyError {
    /// A FIFO operation was attempted against a pair that has been torn down
    Closed,
}

impl fmt::Display for PtyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PtyError::Closed => write!(f, "pty endpoint closed"),
        }
    }
}

impl From<PtyError> for KernelError {
    fn from(err: PtyError) -> Self {
        KernelError::Pty(err)
    }
}

impl ErrorContext for PtyError {
    fn context(&self) -> &'static str {
        match self {
            PtyError::Closed => "operation attempted on a torn-down pty pair",
        }
    }
}

/// ELF loader errors (§4.7)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElfError {
    /// Magic number or identity fields did not match ELF32 little-endian
    BadMagic,
    /// Image lacks program headers or section headers required for driver load
    MissingHeaders,
    /// A relocation section was `SHT_RELA` or of unsupported type/name
    UnsupportedRelocationSection,
    /// An unsupported `R_386_*` relocation type was encountered
    UnsupportedRelocationType,
    /// Symbol resolution failed and the symbol was not `STB_WEAK`
    UndefinedSymbol,
    /// Address arithmetic over/under-ran the mapped image
    OutOfRange,
}

impl fmt::Display for ElfError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElfError::BadMagic => write!(f, "bad ELF magic"),
            ElfError::MissingHeaders => write!(f, "missing program or section headers"),
            ElfError::UnsupportedRelocationSection => {
                write!(f, "unsupported relocation section (expected SHT_REL .rel.dyn)")
            }
            ElfError::UnsupportedRelocationType => write!(f, "unsupported relocation type"),
            ElfError::UndefinedSymbol => write!(f, "undefined non-weak symbol"),
            ElfError::OutOfRange => write!(f, "address arithmetic out of mapped range"),
        }
    }
}

impl From<ElfError> for KernelError {
    fn from(err: ElfError) -> Self {
        KernelError::Elf(err)
    }
}

impl ErrorContext for ElfError {
    fn context(&self) -> &'static str {
        match self {
            ElfError::BadMagic => "image does not begin with the ELF32 little-endian magic",
            ElfError::MissingHeaders => "driver load requires both program and section headers",
            ElfError::UnsupportedRelocationSection => {
                "only SHT_REL sections named .rel.dyn are honoured; SHT_RELA is rejected"
            }
            ElfError::UnsupportedRelocationType => {
                "only R_386_32, R_386_PC32 and R_386_RELATIVE are implemented"
            }
            ElfError::UndefinedSymbol => "symbol has no definition and is not STB_WEAK",
            ElfError::OutOfRange => "computed offset falls outside the mapped image bounds",
        }
    }
}

/// VGA subsystem errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VgaError {
    /// Buffer not accessible
    BufferNotAccessible,
    /// Invalid position
    InvalidPosition,
    /// Write operation failed
    WriteFailure,
    /// Not initialized
    NotInitialized,
    /// Writer not locked
    NotLocked,
    /// Buffer overflow
    BufferOverflow,
}

impl VgaError {
    pub const fn as_str(&self) -> &'static str {
        match self {
            VgaError::BufferNotAccessible => "buffer not accessible",
            VgaError::InvalidPosition => "invalid position",
            VgaError::WriteFailure => "write failure",
            VgaError::NotInitialized => "not initialized",
            VgaError::NotLocked => "writer not locked",
            VgaError::BufferOverflow => "buffer overflow",
        }
    }
}

impl fmt::Display for VgaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<VgaError> for KernelError {
    fn from(err: VgaError) -> Self {
        KernelError::Vga(err)
    }
}

/// Serial subsystem errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SerialError {
    /// Port already initialized
    AlreadyInitialized,
    /// Hardware not present
    PortNotPresent,
    /// Timeout during operation
    Timeout,
    /// Configuration failed
    ConfigurationFailed,
    /// Hardware access failed
    HardwareAccessFailed,
    /// Too many initialization attempts
    TooManyAttempts,
    /// Invalid baud rate
    InvalidBaudRate,
    /// FIFO error
    FifoError,
}

impl fmt::Display for SerialError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SerialError::AlreadyInitialized => write!(f, "already initialized"),
            SerialError::PortNotPresent => write!(f, "hardware not present"),
            SerialError::Timeout => write!(f, "operation timeout"),
            SerialError::ConfigurationFailed => write!(f, "configuration failed"),
            SerialError::HardwareAccessFailed => write!(f, "hardware access failed"),
            SerialError::TooManyAttempts => write!(f, "too many attempts"),
            SerialError::InvalidBaudRate => write!(f, "invalid baud rate"),
            SerialError::FifoError => write!(f, "FIFO error"),
        }
    }
}

impl From<SerialError> for KernelError {
    fn from(err: SerialError) -> Self {
        KernelError::Serial(err)
    }
}

/// Initialization errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitError {
    /// VGA initialization failed
    VgaFailed(VgaError),
    /// Serial initialization failed
    SerialFailed(SerialError),
    /// Already initialized
    AlreadyInitialized,
    /// Prerequisites not met
    PrerequisitesNotMet,
}

impl fmt::Display for InitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InitError::VgaFailed(e) => write!(f, "VGA init failed: {}", e),
            InitError::SerialFailed(e) => write!(f, "Serial init failed: {}", e),
            InitError::AlreadyInitialized => write!(f, "already initialized"),
            InitError::PrerequisitesNotMet => write!(f, "prerequisites not met"),
        }
    }
}

impl From<InitError> for KernelError {
    fn from(err: InitError) -> Self {
        KernelError::Init(err)
    }
}

/// Display subsystem errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayError {
    /// No output available
    NoOutputAvailable,
    /// Format error
    FormatError,
    /// Underlying subsystem error
    SubsystemError,
}

impl fmt::Display for DisplayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayError::NoOutputAvailable => write!(f, "no output available"),
            DisplayError::FormatError => write!(f, "format error"),
            DisplayError::SubsystemError => write!(f, "subsystem error"),
        }
    }
}

impl From<DisplayError> for KernelError {
    fn from(err: DisplayError) -> Self {
        KernelError::Display(err)
    }
}

/// Result type alias for kernel operations
pub type Result<T> = core::result::Result<T, KernelError>;

/// Additional conversions for VgaError
impl From<VgaError> for InitError {
    fn from(err: VgaError) -> Self {
        InitError::VgaFailed(err)
    }
}

/// Additional conversions for SerialError
impl From<SerialError> for InitError {
    fn from(err: SerialError) -> Self {
        InitError::SerialFailed(err)
    }
}

/// Helper trait for error context
pub trait ErrorContext {
    /// Get a detailed description of the error
    fn context(&self) -> &'static str;
}

impl ErrorContext for KernelError {
    fn context(&self) -> &'static str {
        match self {
            KernelError::Vga(_) => "Error occurred in VGA buffer subsystem",
            KernelError::Serial(_) => "Error occurred in serial port subsystem",
            KernelError::Init(_) => "Error occurred during kernel initialization",
            KernelError::Display(_) => "Error occurred in display subsystem",
            KernelError::Transfer(e) => e.context(),
            KernelError::Process(e) => e.context(),
            KernelError::Pty(e) => e.context(),
            KernelError::Elf(e) => e.context(),
        }
    }
}

impl ErrorContext for VgaError {
    fn context(&self) -> &'static str {
        match self {
            VgaError::BufferNotAccessible => "VGA buffer memory could not be accessed",
            VgaError::InvalidPosition => "Attempted to write to invalid screen position",
            VgaError::WriteFailure => "Failed to write to VGA buffer",
            VgaError::NotInitialized => "VGA writer must be initialized before use",
            VgaError::NotLocked => "VGA writer lock must be acquired before writing",
            VgaError::BufferOverflow => "VGA buffer capacity exceeded",
        }
    }
}

impl ErrorContext for SerialError {
    fn context(&self) -> &'static str {
        match self {
            SerialError::AlreadyInitialized => "Serial port cannot be initialized twice",
            SerialError::PortNotPresent => "Serial port hardware is not available",
            SerialError::Timeout => "Serial operation timed out waiting for hardware",
            SerialError::ConfigurationFailed => "Failed to configure serial port registers",
            SerialError::HardwareAccessFailed => "Could not access serial port I/O registers",
            SerialError::TooManyAttempts => "Exceeded maximum retry attempts for serial operation",
            SerialError::InvalidBaudRate => "Specified baud rate is not supported",
            SerialError::FifoError => "Serial FIFO buffer encountered an error",
        }
    }
}

impl ErrorContext for InitError {
    fn context(&self) -> &'static str {
        match self {
            InitError::VgaFailed(_) => "VGA subsystem initialization failed",
            InitError::SerialFailed(_) => "Serial subsystem initialization failed",
            InitError::AlreadyInitialized => "Kernel subsystems are already initialized",
            InitError::PrerequisitesNotMet => {
                "Required conditions for initialization not satisfied"
            }
        }
    }
}

impl ErrorContext for DisplayError {
    fn context(&self) -> &'static str {
        match self {
            DisplayError::NoOutputAvailable => "No display output methods are available",
            DisplayError::FormatError => "Failed to format output string",
            DisplayError::SubsystemError => "Underlying display subsystem error",
        }
    }
}
