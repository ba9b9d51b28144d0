//! Motorola S-record encoder (S3/S7 subset).
//!
//! Each data record is `S3` + byte count + 32-bit big-endian address + data
//! + checksum. The byte count covers address, data and checksum; the
//! checksum is the one's complement of the low byte of the sum of count,
//! address and data.
//!
//! The default terminator is the fixed record `S70500000000FA` with no count
//! record. [`SRecordOptions::computed_terminator`] emits an S5/S6 count
//! record and an S7 carrying the base address as the start address.

use byteorder::{BigEndian, ByteOrder};
use log::trace;

use super::{RECORD_DATA_LEN, push_hex_upper};

/// Fixed termination record.
pub const TERMINATOR_RECORD: &str = "S70500000000FA";

/// S-record encoder options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SRecordOptions {
    /// Emit a count record and compute the S7 start address from the base
    /// address instead of the fixed terminator.
    pub computed_terminator: bool,
}

impl SRecordOptions {
    /// Enable or disable the computed terminator.
    #[must_use]
    pub fn with_computed_terminator(mut self, enabled: bool) -> Self {
        self.computed_terminator = enabled;
        self
    }
}

/// Number of address bytes for a record type digit (`0..=9`).
pub fn address_width(record_type: u8) -> Option<usize> {
    match record_type {
        0 | 1 | 5 | 9 => Some(2),
        2 | 6 | 8 => Some(3),
        3 | 7 => Some(4),
        _ => None,
    }
}

/// One's complement of the low byte of the byte sum.
pub fn checksum(bytes: impl IntoIterator<Item = u8>) -> u8 {
    !bytes.into_iter().fold(0u8, u8::wrapping_add)
}

/// Format one record from its type digit, address bytes and data.
pub fn format_record(record_type: u8, address: &[u8], data: &[u8]) -> String {
    let count = (address.len() + data.len() + 1) as u8;
    let cc = checksum(
        std::iter::once(count)
            .chain(address.iter().copied())
            .chain(data.iter().copied()),
    );

    let mut line = String::with_capacity(4 + usize::from(count) * 2);
    line.push('S');
    line.push(char::from(b'0' + record_type));
    push_hex_upper(&mut line, &[count]);
    push_hex_upper(&mut line, address);
    push_hex_upper(&mut line, data);
    push_hex_upper(&mut line, &[cc]);
    line
}

/// Encode `bytes` read from `base_address` as S3 records with the fixed
/// terminator.
pub fn encode_srecord(bytes: &[u8], base_address: u32) -> String {
    encode_srecord_with(bytes, base_address, SRecordOptions::default())
}

/// Encode `bytes` read from `base_address` as S3 records.
pub fn encode_srecord_with(bytes: &[u8], base_address: u32, options: SRecordOptions) -> String {
    let mut out = String::with_capacity((bytes.len() / RECORD_DATA_LEN + 2) * 48);
    let mut address = [0u8; 4];
    let mut records = 0usize;

    for (i, chunk) in bytes.chunks(RECORD_DATA_LEN).enumerate() {
        let offset = (i * RECORD_DATA_LEN) as u32;
        BigEndian::write_u32(&mut address, base_address.wrapping_add(offset));
        out.push_str(&format_record(3, &address, chunk));
        out.push('\n');
        records += 1;
    }

    if !options.computed_terminator {
        out.push_str(TERMINATOR_RECORD);
        return out;
    }

    trace!("Computed S-record terminator after {records} data records");
    if records <= 0xFFFF {
        let mut count = [0u8; 2];
        BigEndian::write_u16(&mut count, records as u16);
        out.push_str(&format_record(5, &count, &[]));
        out.push('\n');
    } else if records <= 0xFF_FFFF {
        let mut count = [0u8; 3];
        BigEndian::write_u24(&mut count, records as u32);
        out.push_str(&format_record(6, &count, &[]));
        out.push('\n');
    }
    BigEndian::write_u32(&mut address, base_address);
    out.push_str(&format_record(7, &address, &[]));
    out
}
