//! Dump request validation.
//!
//! Address and length arrive as user text. They are checked here, before any
//! source is read or encoder called; the encoders themselves never fail.

use crate::error::{Error, Result};
use crate::format::DumpFormat;

/// Largest dump accepted in one request (16 MiB).
pub const MAX_DUMP_LENGTH: usize = 16 * 1024 * 1024;

/// Parse a hexadecimal address (`0x` prefix and `_` separators optional).
pub fn parse_address(s: &str) -> Result<u32> {
    let s = s.trim();
    if s.starts_with('-') {
        return Err(Error::InvalidInput(format!("address must not be negative: '{s}'")));
    }
    let digits = strip_hex_prefix(s).unwrap_or(s);
    let digits: String = digits.chars().filter(|c| *c != '_').collect();
    if digits.is_empty() {
        return Err(Error::InvalidInput("address is empty".into()));
    }
    u32::from_str_radix(&digits, 16)
        .map_err(|e| Error::InvalidInput(format!("invalid address '{s}': {e}")))
}

/// Parse a dump length.
///
/// Decimal by default, hexadecimal with a `0x` prefix, and an optional `k`
/// suffix multiplying by 1024. Zero is a valid (empty) length.
pub fn parse_length(s: &str) -> Result<usize> {
    let s = s.trim();
    if s.starts_with('-') {
        return Err(Error::InvalidInput(format!("length must not be negative: '{s}'")));
    }

    let (number, multiplier) = match s.strip_suffix(['k', 'K']) {
        Some(rest) => (rest, 1024),
        None => (s, 1),
    };
    let number: String = number.chars().filter(|c| *c != '_').collect();

    let value = match strip_hex_prefix(&number) {
        Some(hex) => usize::from_str_radix(hex, 16),
        None => number.parse::<usize>(),
    }
    .map_err(|e| Error::InvalidInput(format!("invalid length '{s}': {e}")))?;

    let length = value
        .checked_mul(multiplier)
        .filter(|len| *len <= MAX_DUMP_LENGTH)
        .ok_or_else(|| {
            Error::InvalidInput(format!(
                "length '{s}' exceeds the maximum of {MAX_DUMP_LENGTH} bytes"
            ))
        })?;
    Ok(length)
}

fn strip_hex_prefix(s: &str) -> Option<&str> {
    s.strip_prefix("0x").or_else(|| s.strip_prefix("0X"))
}

/// A validated dump request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DumpRequest {
    /// First address to read.
    pub address: u32,
    /// Number of bytes to read.
    pub length: usize,
    /// Output format.
    pub format: DumpFormat,
}

impl DumpRequest {
    /// Build a request, checking that the range fits in 32-bit address space.
    pub fn new(address: u32, length: usize, format: DumpFormat) -> Result<Self> {
        let request = Self {
            address,
            length,
            format,
        };
        request.end_address()?;
        Ok(request)
    }

    /// Parse and validate a request from user text.
    pub fn parse(address: &str, length: &str, format: &str) -> Result<Self> {
        Self::new(parse_address(address)?, parse_length(length)?, format.parse()?)
    }

    /// One past the last address read.
    pub fn end_address(&self) -> Result<u64> {
        let end = u64::from(self.address) + self.length as u64;
        if end > 1 << 32 {
            return Err(Error::InvalidInput(format!(
                "range {:#010X} + {:#X} runs past the 32-bit address space",
                self.address, self.length
            )));
        }
        Ok(end)
    }
}
