//! Intel HEX and S-record readers.
//!
//! Used to inspect produced dumps and to check that an encoded stream loads
//! back into the original bytes. Checksums and byte counts are verified on
//! every line; any failure aborts with the offending 1-based line number.

use log::{debug, trace};

use super::{DumpFormat, ihex, srec};
use crate::error::{Error, Result};

/// Contiguous run of bytes at an absolute address.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Segment {
    /// Address of the first byte.
    pub address: u32,
    /// Segment contents.
    pub data: Vec<u8>,
}

impl Segment {
    /// One past the last address, as u64 so a segment ending at 4 GiB fits.
    pub fn end(&self) -> u64 {
        u64::from(self.address) + self.data.len() as u64
    }
}

/// Decoded record file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Decoded {
    /// Data segments, sorted by address, adjacent runs merged, never
    /// overlapping.
    pub segments: Vec<Segment>,
    /// Start/entry address, if the file carries one.
    pub start_address: Option<u32>,
    /// Number of data records read.
    pub data_records: usize,
}

impl Decoded {
    /// Total number of data bytes.
    pub fn total_len(&self) -> usize {
        self.segments.iter().map(|s| s.data.len()).sum()
    }
}

/// Guess the record format from the first non-empty line.
pub fn detect_format(text: &str) -> Option<DumpFormat> {
    let first = text.lines().map(str::trim).find(|l| !l.is_empty())?;
    if first.starts_with(':') {
        Some(DumpFormat::IntelHex)
    } else if first.starts_with('S') && first.len() >= 2 && first.as_bytes()[1].is_ascii_digit() {
        Some(DumpFormat::SRecord)
    } else {
        None
    }
}

/// Decode a record file of either format.
pub fn decode(text: &str) -> Result<Decoded> {
    match detect_format(text) {
        Some(DumpFormat::IntelHex) => decode_intel_hex(text),
        Some(DumpFormat::SRecord) => decode_srecord(text),
        _ => Err(Error::InvalidRecord {
            line: 1,
            reason: "not an Intel HEX or S-record file".into(),
        }),
    }
}

/// Concatenate segment payloads in address order.
pub fn flatten(segments: &[Segment]) -> Vec<u8> {
    let mut sorted: Vec<&Segment> = segments.iter().collect();
    sorted.sort_by_key(|s| s.address);
    sorted.into_iter().flat_map(|s| s.data.iter().copied()).collect()
}

/// Parse hex digit pairs into bytes.
fn parse_hex_bytes(digits: &str, line: usize) -> Result<Vec<u8>> {
    if digits.len() % 2 != 0 {
        return Err(Error::InvalidRecord {
            line,
            reason: "odd number of hex digits".into(),
        });
    }
    (0..digits.len())
        .step_by(2)
        .map(|i| {
            digits
                .get(i..i + 2)
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                .ok_or_else(|| Error::InvalidRecord {
                    line,
                    reason: format!("invalid hex digits at column {}", i + 1),
                })
        })
        .collect()
}

/// Accumulates data records into merged segments.
///
/// Each pending segment remembers the line of its first record so overlaps
/// can be reported against the file.
#[derive(Default)]
struct SegmentBuilder {
    segments: Vec<(Segment, usize)>,
}

impl SegmentBuilder {
    fn push(&mut self, address: u32, data: &[u8], line: usize) {
        if data.is_empty() {
            return;
        }
        if let Some((last, _)) = self.segments.last_mut() {
            if last.end() == u64::from(address) {
                last.data.extend_from_slice(data);
                return;
            }
        }
        self.segments.push((
            Segment {
                address,
                data: data.to_vec(),
            },
            line,
        ));
    }

    /// Sort, merge adjacent runs and reject overlapping data.
    fn finish(mut self) -> Result<Vec<Segment>> {
        self.segments.sort_by_key(|(s, _)| s.address);
        let mut merged: Vec<Segment> = Vec::with_capacity(self.segments.len());
        for (segment, line) in self.segments {
            match merged.last_mut() {
                Some(last) if last.end() > u64::from(segment.address) => {
                    return Err(Error::InvalidRecord {
                        line,
                        reason: format!(
                            "data at {:#010X} overlaps an earlier record",
                            segment.address
                        ),
                    });
                },
                Some(last) if last.end() == u64::from(segment.address) => {
                    last.data.extend(segment.data);
                },
                _ => merged.push(segment),
            }
        }
        Ok(merged)
    }
}

/// Decode an Intel HEX file.
pub fn decode_intel_hex(text: &str) -> Result<Decoded> {
    let mut builder = SegmentBuilder::default();
    let mut decoded = Decoded::default();
    let mut upper: u32 = 0;
    let mut saw_eof = false;

    for (index, raw) in text.lines().enumerate() {
        let line = index + 1;
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }
        if saw_eof {
            return Err(Error::InvalidRecord {
                line,
                reason: "data after end-of-file record".into(),
            });
        }

        let body = raw.strip_prefix(':').ok_or_else(|| Error::InvalidRecord {
            line,
            reason: "missing ':' start code".into(),
        })?;
        let bytes = parse_hex_bytes(body, line)?;
        if bytes.len() < 5 {
            return Err(Error::InvalidRecord {
                line,
                reason: "record shorter than 5 bytes".into(),
            });
        }

        let len = usize::from(bytes[0]);
        if bytes.len() != len + 5 {
            return Err(Error::InvalidRecord {
                line,
                reason: format!("length field {len} does not match {} data bytes", bytes.len() - 5),
            });
        }

        let (fields, stored) = bytes.split_at(bytes.len() - 1);
        let actual = ihex::checksum(fields.iter().copied());
        if actual != stored[0] {
            return Err(Error::ChecksumMismatch {
                line,
                expected: stored[0],
                actual,
            });
        }

        let offset = u32::from(u16::from_be_bytes([bytes[1], bytes[2]]));
        let record_type = bytes[3];
        let data = &fields[4..];
        trace!("ihex line {line}: type {record_type:02X}, {len} bytes @ {offset:#06X}");

        match record_type {
            ihex::RECORD_DATA => {
                builder.push(upper.wrapping_add(offset), data, line);
                decoded.data_records += 1;
            },
            ihex::RECORD_EOF => saw_eof = true,
            ihex::RECORD_EXTENDED_SEGMENT | ihex::RECORD_EXTENDED_LINEAR if len == 2 => {
                let value = u32::from(u16::from_be_bytes([data[0], data[1]]));
                upper = if record_type == ihex::RECORD_EXTENDED_LINEAR {
                    value << 16
                } else {
                    value << 4
                };
            },
            ihex::RECORD_START_SEGMENT | ihex::RECORD_START_LINEAR if len == 4 => {
                decoded.start_address = Some(u32::from_be_bytes([data[0], data[1], data[2], data[3]]));
            },
            other => {
                return Err(Error::InvalidRecord {
                    line,
                    reason: format!("unsupported record type {other:02X} with length {len}"),
                });
            },
        }
    }

    if !saw_eof {
        return Err(Error::InvalidRecord {
            line: text.lines().count().max(1),
            reason: "missing end-of-file record".into(),
        });
    }

    decoded.segments = builder.finish()?;
    debug!(
        "Decoded Intel HEX: {} records, {} segments, {} bytes",
        decoded.data_records,
        decoded.segments.len(),
        decoded.total_len()
    );
    Ok(decoded)
}

/// Decode a Motorola S-record file.
pub fn decode_srecord(text: &str) -> Result<Decoded> {
    let mut builder = SegmentBuilder::default();
    let mut decoded = Decoded::default();
    let mut terminated = false;

    for (index, raw) in text.lines().enumerate() {
        let line = index + 1;
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }
        if terminated {
            return Err(Error::InvalidRecord {
                line,
                reason: "data after termination record".into(),
            });
        }

        let mut chars = raw.chars();
        let record_type = match (chars.next(), chars.next()) {
            (Some('S'), Some(digit)) => digit.to_digit(10).map(|d| d as u8),
            _ => None,
        }
        .ok_or_else(|| Error::InvalidRecord {
            line,
            reason: "missing 'S<n>' record type".into(),
        })?;
        let width = srec::address_width(record_type).ok_or_else(|| Error::InvalidRecord {
            line,
            reason: format!("unsupported record type S{record_type}"),
        })?;

        let bytes = parse_hex_bytes(&raw[2..], line)?;
        if bytes.len() < width + 2 || usize::from(bytes[0]) != bytes.len() - 1 {
            return Err(Error::InvalidRecord {
                line,
                reason: "byte count does not match record length".into(),
            });
        }

        let (fields, stored) = bytes.split_at(bytes.len() - 1);
        let actual = srec::checksum(fields.iter().copied());
        if actual != stored[0] {
            return Err(Error::ChecksumMismatch {
                line,
                expected: stored[0],
                actual,
            });
        }

        let address = fields[1..=width]
            .iter()
            .fold(0u32, |acc, b| (acc << 8) | u32::from(*b));
        let data = &fields[width + 1..];
        trace!("srec line {line}: S{record_type}, {} bytes @ {address:#010X}", data.len());

        match record_type {
            0 => {},
            1..=3 => {
                builder.push(address, data, line);
                decoded.data_records += 1;
            },
            5 | 6 => {
                if address as usize != decoded.data_records {
                    return Err(Error::InvalidRecord {
                        line,
                        reason: format!(
                            "count record says {address} data records, found {}",
                            decoded.data_records
                        ),
                    });
                }
            },
            _ => {
                decoded.start_address = Some(address);
                terminated = true;
            },
        }
    }

    if !terminated {
        return Err(Error::InvalidRecord {
            line: text.lines().count().max(1),
            reason: "missing S7/S8/S9 termination record".into(),
        });
    }

    decoded.segments = builder.finish()?;
    debug!(
        "Decoded S-record: {} records, {} segments, {} bytes",
        decoded.data_records,
        decoded.segments.len(),
        decoded.total_len()
    );
    Ok(decoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{
        IntelHexOptions, SRecordOptions, encode_intel_hex, encode_intel_hex_with, encode_srecord,
        encode_srecord_with,
    };

    fn sample(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 37 + 11) as u8).collect()
    }

    #[test]
    fn test_detect_format() {
        assert_eq!(detect_format("\n:00000001FF"), Some(DumpFormat::IntelHex));
        assert_eq!(detect_format("S70500000000FA"), Some(DumpFormat::SRecord));
        assert_eq!(detect_format("00 01 02"), None);
        assert_eq!(detect_format(""), None);
    }

    #[test]
    fn test_intel_hex_roundtrip() {
        for len in [0usize, 1, 16, 17, 1000] {
            let data = sample(len);
            let decoded = decode_intel_hex(&encode_intel_hex(&data, 0x1000)).unwrap();
            assert_eq!(flatten(&decoded.segments), data, "len {len}");
            if len > 0 {
                assert_eq!(decoded.segments[0].address, 0x1000);
            }
        }
    }

    #[test]
    fn test_intel_hex_extended_roundtrip_above_64k() {
        let data = sample(0x300);
        let options = IntelHexOptions::default().with_extended_linear(true);
        let text = encode_intel_hex_with(&data, 0x0800_FF00, options);
        let decoded = decode_intel_hex(&text).unwrap();
        assert_eq!(decoded.segments.len(), 1);
        assert_eq!(decoded.segments[0].address, 0x0800_FF00);
        assert_eq!(decoded.segments[0].data, data);
    }

    #[test]
    fn test_srecord_roundtrip() {
        for len in [0usize, 2, 16, 33, 4096] {
            let data = sample(len);
            let decoded = decode_srecord(&encode_srecord(&data, 0x2000_0000)).unwrap();
            assert_eq!(flatten(&decoded.segments), data, "len {len}");
            assert_eq!(decoded.start_address, Some(0));
        }
    }

    #[test]
    fn test_srecord_computed_terminator_roundtrip() {
        let data = sample(100);
        let options = SRecordOptions::default().with_computed_terminator(true);
        let decoded = decode_srecord(&encode_srecord_with(&data, 0x0800_0000, options)).unwrap();
        assert_eq!(decoded.data_records, 7);
        assert_eq!(decoded.start_address, Some(0x0800_0000));
        assert_eq!(flatten(&decoded.segments), data);
    }

    #[test]
    fn test_intel_hex_checksum_mismatch() {
        let err = decode_intel_hex(":0100000001FF\n:00000001FF").unwrap_err();
        assert!(matches!(
            err,
            Error::ChecksumMismatch {
                line: 1,
                expected: 0xFF,
                actual: 0xFE
            }
        ));
    }

    #[test]
    fn test_intel_hex_missing_eof() {
        let err = decode_intel_hex(":0100000001FE").unwrap_err();
        assert!(matches!(err, Error::InvalidRecord { .. }));
    }

    #[test]
    fn test_intel_hex_bad_length() {
        let err = decode_intel_hex(":0200000001FD\n:00000001FF").unwrap_err();
        assert!(matches!(err, Error::InvalidRecord { line: 1, .. }));
    }

    #[test]
    fn test_intel_hex_start_linear_address() {
        let text = ":0400000508000131BD\n:00000001FF";
        let decoded = decode_intel_hex(text).unwrap();
        assert_eq!(decoded.start_address, Some(0x0800_0131));
        assert!(decoded.segments.is_empty());
    }

    #[test]
    fn test_srecord_checksum_mismatch() {
        let err = decode_srecord("S30700000100AABB93\nS70500000000FA").unwrap_err();
        assert!(matches!(err, Error::ChecksumMismatch { line: 1, .. }));
    }

    #[test]
    fn test_srecord_s1_and_header() {
        // S0 header "HDR", S1 at 0x0010 with two bytes, S9 terminator
        let text = "S00600004844521B\nS1050010AABB85\nS9030000FC";
        let decoded = decode_srecord(text).unwrap();
        assert_eq!(decoded.segments.len(), 1);
        assert_eq!(decoded.segments[0].address, 0x0010);
        assert_eq!(decoded.segments[0].data, vec![0xAA, 0xBB]);
    }

    #[test]
    fn test_srecord_wrong_count_record() {
        let text = "S30700000100AABB92\nS5030002FA\nS70500000000FA";
        let err = decode_srecord(text).unwrap_err();
        assert!(matches!(err, Error::InvalidRecord { line: 2, .. }));
    }

    #[test]
    fn test_flatten_sorts_by_address() {
        let segments = vec![
            Segment {
                address: 0x20,
                data: vec![3, 4],
            },
            Segment {
                address: 0x10,
                data: vec![1, 2],
            },
        ];
        assert_eq!(flatten(&segments), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_intel_hex_extended_segment_address() {
        // Segment base 0x1000 shifts by 4 bits: data lands at 0x10000 + 0x10
        let text = ":020000021000EC\n:04001000DEADBEEFB4\n:00000001FF";
        let decoded = decode_intel_hex(text).unwrap();
        assert_eq!(decoded.segments.len(), 1);
        assert_eq!(decoded.segments[0].address, 0x0001_0010);
        assert_eq!(decoded.segments[0].data, vec![0xDE, 0xAD, 0xBE, 0xEF]);
    }

    #[test]
    fn test_intel_hex_start_segment_address() {
        let text = ":0400000312345678E5\n:00000001FF";
        let decoded = decode_intel_hex(text).unwrap();
        assert_eq!(decoded.start_address, Some(0x1234_5678));
        assert_eq!(decoded.data_records, 0);
    }

    #[test]
    fn test_intel_hex_overlapping_records() {
        let err = decode_intel_hex(":0100000011EE\n:0100000011EE\n:00000001FF").unwrap_err();
        assert!(matches!(err, Error::InvalidRecord { line: 2, .. }));
    }

    #[test]
    fn test_srecord_s2_with_s6_count_and_s8_terminator() {
        let text = "S20612345601025A\nS604000001FA\nS8041234565F";
        let decoded = decode_srecord(text).unwrap();
        assert_eq!(decoded.data_records, 1);
        assert_eq!(decoded.segments.len(), 1);
        assert_eq!(decoded.segments[0].address, 0x12_3456);
        assert_eq!(decoded.segments[0].data, vec![0x01, 0x02]);
        assert_eq!(decoded.start_address, Some(0x12_3456));
    }

    #[test]
    fn test_srecord_s6_count_mismatch() {
        let text = "S20612345601025A\nS604000002F9\nS8041234565F";
        let err = decode_srecord(text).unwrap_err();
        assert!(matches!(err, Error::InvalidRecord { line: 2, .. }));
    }

    #[test]
    fn test_srecord_missing_terminator() {
        let err = decode_srecord("S30700000100AABB92\n").unwrap_err();
        assert!(matches!(err, Error::InvalidRecord { line: 1, .. }));
    }

    #[test]
    fn test_total_len_counts_each_byte_once() {
        // Two records back to back at 0x00 and 0x01 merge into one run
        let decoded = decode_intel_hex(":0100000011EE\n:0100010022DC\n:00000001FF").unwrap();
        assert_eq!(decoded.segments.len(), 1);
        assert_eq!(decoded.total_len(), 2);
    }

    #[test]
    fn test_decode_rejects_plain_text() {
        assert!(decode("00 01 02").is_err());
    }
}
