//! Intel HEX encoder.
//!
//! ## Record layout
//!
//! ```text
//! :LL AAAA TT DD..DD CC
//!  |   |   |    |    +-- two's complement of the sum of all previous bytes
//!  |   |   |    +------- data, LL bytes
//!  |   |   +------------ record type (00 data, 01 EOF, 04 extended linear)
//!  |   +---------------- 16-bit address, big-endian
//!  +-------------------- data length
//! ```
//!
//! By default only data records and the EOF record are emitted. The address
//! field holds the low 16 bits of the absolute address, so dumps above
//! 0xFFFF (or crossing a 64 KiB boundary) alias onto the first bank. Set
//! [`IntelHexOptions::extended_linear`] to emit type-04 records instead.

use log::trace;

use super::{RECORD_DATA_LEN, push_hex_upper};

/// Data record type.
pub const RECORD_DATA: u8 = 0x00;
/// End-of-file record type.
pub const RECORD_EOF: u8 = 0x01;
/// Extended segment address record type.
pub const RECORD_EXTENDED_SEGMENT: u8 = 0x02;
/// Start segment address record type.
pub const RECORD_START_SEGMENT: u8 = 0x03;
/// Extended linear address record type.
pub const RECORD_EXTENDED_LINEAR: u8 = 0x04;
/// Start linear address record type.
pub const RECORD_START_LINEAR: u8 = 0x05;

/// Fixed end-of-file record.
pub const EOF_RECORD: &str = ":00000001FF";

const BANK_SIZE: usize = 0x1_0000;

/// Intel HEX encoder options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IntelHexOptions {
    /// Emit extended linear address records (type 04) so addresses above
    /// 0xFFFF survive. Off by default, which truncates addresses to 16 bits.
    pub extended_linear: bool,
}

impl IntelHexOptions {
    /// Enable or disable extended linear address records.
    #[must_use]
    pub fn with_extended_linear(mut self, enabled: bool) -> Self {
        self.extended_linear = enabled;
        self
    }
}

/// Checksum of a record: two's complement of the low byte of the byte sum.
pub fn checksum(bytes: impl IntoIterator<Item = u8>) -> u8 {
    bytes
        .into_iter()
        .fold(0u8, u8::wrapping_add)
        .wrapping_neg()
}

/// Format one record, without a line terminator.
pub fn format_record(record_type: u8, address: u16, data: &[u8]) -> String {
    let [addr_hi, addr_lo] = address.to_be_bytes();
    let header = [data.len() as u8, addr_hi, addr_lo, record_type];
    let cc = checksum(header.iter().chain(data).copied());

    let mut line = String::with_capacity(11 + data.len() * 2);
    line.push(':');
    push_hex_upper(&mut line, &header);
    push_hex_upper(&mut line, data);
    push_hex_upper(&mut line, &[cc]);
    line
}

/// Encode `bytes` read from `base_address` as Intel HEX, 16-bit addressing.
///
/// Addresses wrap at 16 bits; see the module docs.
pub fn encode_intel_hex(bytes: &[u8], base_address: u32) -> String {
    encode_intel_hex_with(bytes, base_address, IntelHexOptions::default())
}

/// Encode `bytes` read from `base_address` as Intel HEX.
pub fn encode_intel_hex_with(bytes: &[u8], base_address: u32, options: IntelHexOptions) -> String {
    let mut out = String::with_capacity((bytes.len() / RECORD_DATA_LEN + 2) * 45);
    let mut upper: u16 = 0;
    let mut offset = 0usize;

    while offset < bytes.len() {
        let address = base_address.wrapping_add(offset as u32);
        let mut len = RECORD_DATA_LEN.min(bytes.len() - offset);

        if options.extended_linear {
            let bank = (address >> 16) as u16;
            if bank != upper {
                trace!("Extended linear address {bank:#06X} at offset {offset:#X}");
                out.push_str(&format_record(
                    RECORD_EXTENDED_LINEAR,
                    0,
                    &bank.to_be_bytes(),
                ));
                out.push('\n');
                upper = bank;
            }
            // Keep each record inside its 64 KiB bank
            len = len.min(BANK_SIZE - (address as usize & 0xFFFF));
        }

        out.push_str(&format_record(
            RECORD_DATA,
            address as u16,
            &bytes[offset..offset + len],
        ));
        out.push('\n');
        offset += len;
    }

    out.push_str(EOF_RECORD);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hex_bytes(s: &str) -> Vec<u8> {
        (0..s.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&s[i..i + 2], 16).unwrap())
            .collect()
    }

    #[test]
    fn test_eof_record_matches_formatter() {
        assert_eq!(format_record(RECORD_EOF, 0, &[]), EOF_RECORD);
    }

    #[test]
    fn test_empty_input_is_eof_only() {
        assert_eq!(encode_intel_hex(&[], 0x1234), ":00000001FF");
    }

    #[test]
    fn test_sixteen_bytes_at_zero() {
        let data: Vec<u8> = (0x00..=0x0F).collect();
        assert_eq!(
            encode_intel_hex(&data, 0),
            ":10000000000102030405060708090A0B0C0D0E0F78\n:00000001FF"
        );
    }

    #[test]
    fn test_partial_last_record_and_address_advance() {
        let data = vec![0x55u8; 20];
        let text = encode_intel_hex(&data, 0x0100);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with(":10010000"));
        assert!(lines[1].starts_with(":04011000"));
        assert_eq!(lines[2], EOF_RECORD);
    }

    #[test]
    fn test_output_is_uppercase() {
        let text = encode_intel_hex(&[0xab, 0xcd, 0xef], 0xabcd);
        assert!(!text.chars().any(|c| c.is_ascii_lowercase()));
    }

    #[test]
    fn test_every_record_sums_to_zero() {
        let data: Vec<u8> = (0..300).map(|i| (i * 31 + 7) as u8).collect();
        let text = encode_intel_hex(&data, 0x0800_0000);
        for line in text.lines() {
            let bytes = hex_bytes(&line[1..]);
            assert_eq!(bytes.iter().fold(0u8, |a, b| a.wrapping_add(*b)), 0, "{line}");
        }
    }

    #[test]
    fn test_address_truncates_to_16_bits_by_default() {
        let text = encode_intel_hex(&[0x01], 0x0801_2345);
        assert!(text.starts_with(":01234500"));
        assert!(!text.contains(":02000004"));
    }

    #[test]
    fn test_address_wraps_past_0xffff() {
        let data = vec![0u8; 32];
        let text = encode_intel_hex(&data, 0xFFF0);
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[0].starts_with(":10FFF000"));
        assert!(lines[1].starts_with(":10000000"));
    }

    #[test]
    fn test_extended_linear_announces_bank() {
        let options = IntelHexOptions::default().with_extended_linear(true);
        let text = encode_intel_hex_with(&[0x01], 0x0800_0000, options);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], ":020000040800F2");
        assert!(lines[1].starts_with(":01000000"));
        assert_eq!(lines[2], EOF_RECORD);
    }

    #[test]
    fn test_extended_linear_skips_bank_zero_announcement() {
        let options = IntelHexOptions::default().with_extended_linear(true);
        let data: Vec<u8> = (0x00..=0x0F).collect();
        assert_eq!(
            encode_intel_hex_with(&data, 0, options),
            encode_intel_hex(&data, 0)
        );
    }

    #[test]
    fn test_extended_linear_splits_at_bank_boundary() {
        let options = IntelHexOptions::default().with_extended_linear(true);
        let data = vec![0xAAu8; 16];
        let text = encode_intel_hex_with(&data, 0x0000_FFF8, options);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with(":08FFF800"));
        assert_eq!(lines[1], ":020000040001F9");
        assert!(lines[2].starts_with(":08000000"));
        assert_eq!(lines[3], EOF_RECORD);
    }
}
