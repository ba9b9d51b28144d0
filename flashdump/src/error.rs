//! Error types for flashdump.

use std::io;
use thiserror::Error;

/// Result type for flashdump operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for flashdump operations.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error (dump files, output streams).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Serial port error.
    #[cfg(feature = "native")]
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// Rejected user input (address, length, format name).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Malformed Intel HEX or S-record line.
    #[error("Invalid record on line {line}: {reason}")]
    InvalidRecord {
        /// 1-based line number.
        line: usize,
        /// What was wrong with the record.
        reason: String,
    },

    /// Record checksum mismatch.
    #[error("Checksum mismatch on line {line}: expected {expected:#04x}, got {actual:#04x}")]
    ChecksumMismatch {
        /// 1-based line number.
        line: usize,
        /// Checksum stored in the record.
        expected: u8,
        /// Checksum computed over the record.
        actual: u8,
    },

    /// Read outside the memory a source can serve.
    #[error("Address range {start:#010x}..{end:#010x} is outside the source")]
    OutOfRange {
        /// First requested address.
        start: u32,
        /// One past the last requested address.
        end: u64,
    },

    /// No serial device found.
    #[error("Device not found")]
    DeviceNotFound,

    /// The embedding application requested cancellation.
    #[error("Operation interrupted")]
    Interrupted,

    /// Unsupported operation on this platform or build.
    #[error("Unsupported: {0}")]
    Unsupported(String),
}
