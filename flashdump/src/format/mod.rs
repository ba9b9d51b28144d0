//! Dump output formats.
//!
//! A dump is a byte buffer read from target memory plus the base address it
//! was read from. This module turns that pair into one of four outputs:
//!
//! | Format      | Output | Records                               |
//! |-------------|--------|---------------------------------------|
//! | `Binary`    | bytes  | none, byte-for-byte passthrough        |
//! | `IntelHex`  | text   | `:LLAAAA00..CC` data records + `:00000001FF` |
//! | `SRecord`   | text   | `S3` data records + `S70500000000FA`   |
//! | `HexText`   | text   | 16 space-separated lowercase octets per line |
//!
//! Every encoder is a pure function of its inputs. Record-based formats carry
//! at most [`RECORD_DATA_LEN`] data bytes per line.
//!
//! ## Example
//!
//! ```rust
//! use flashdump::format::{DumpFormat, encode};
//!
//! let out = encode(&[0xAA, 0xBB], 0x100, DumpFormat::SRecord);
//! assert_eq!(
//!     out.as_bytes(),
//!     b"S30700000100AABB92\nS70500000000FA"
//! );
//! ```

pub mod decode;
pub mod hex_text;
pub mod ihex;
pub mod srec;

use std::fmt;
use std::io::Write;

use crate::error::{Error, Result};

pub use hex_text::encode_hex_text;
pub use ihex::{IntelHexOptions, encode_intel_hex, encode_intel_hex_with};
pub use srec::{SRecordOptions, encode_srecord, encode_srecord_with};

/// Maximum number of data bytes carried by one record or text line.
pub const RECORD_DATA_LEN: usize = 16;

/// Output format of a dump.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum DumpFormat {
    /// Raw bytes, unchanged.
    Binary,
    /// Intel HEX data records.
    #[default]
    IntelHex,
    /// Motorola S-record, S3 data records.
    SRecord,
    /// Human-readable hex text.
    HexText,
}

impl DumpFormat {
    /// All formats, in display order.
    pub const ALL: [Self; 4] = [Self::Binary, Self::IntelHex, Self::SRecord, Self::HexText];

    /// Look up a format by one of its names (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "bin" | "binary" | "raw" => Some(Self::Binary),
            "hex" | "ihex" | "intel" | "intel-hex" => Some(Self::IntelHex),
            "srec" | "s3" | "mot" | "motorola" | "s-record" => Some(Self::SRecord),
            "txt" | "text" | "hexdump" | "hex-text" => Some(Self::HexText),
            _ => None,
        }
    }

    /// Conventional file extension, without the dot.
    #[must_use]
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Binary => "bin",
            Self::IntelHex => "hex",
            Self::SRecord => "srec",
            Self::HexText => "txt",
        }
    }

    /// Whether the encoded output is text.
    #[must_use]
    pub fn is_text(&self) -> bool {
        !matches!(self, Self::Binary)
    }
}

impl fmt::Display for DumpFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Binary => write!(f, "bin"),
            Self::IntelHex => write!(f, "ihex"),
            Self::SRecord => write!(f, "srec"),
            Self::HexText => write!(f, "text"),
        }
    }
}

impl std::str::FromStr for DumpFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_name(s).ok_or_else(|| {
            Error::InvalidInput(format!(
                "unknown format '{s}' (expected one of: bin, ihex, srec, text)"
            ))
        })
    }
}

/// Encoded dump.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Encoded {
    /// Raw bytes.
    Binary(Vec<u8>),
    /// Record or dump text.
    Text(String),
}

impl Encoded {
    /// Raw bytes of the output (UTF-8 bytes for text).
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Binary(data) => data,
            Self::Text(text) => text.as_bytes(),
        }
    }

    /// Text of the output, if this is a text format.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Binary(_) => None,
            Self::Text(text) => Some(text),
        }
    }

    /// Output length in bytes.
    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    /// Whether the output is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Write the output to a stream.
    ///
    /// Text outputs get a trailing newline when non-empty so the file ends
    /// cleanly; binary outputs are written unchanged.
    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<()> {
        writer.write_all(self.as_bytes())?;
        if matches!(self, Self::Text(text) if !text.is_empty()) {
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// Encoder options for the record formats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EncodeOptions {
    /// Intel HEX options.
    pub intel_hex: IntelHexOptions,
    /// S-record options.
    pub srecord: SRecordOptions,
}

/// Raw binary passthrough.
pub fn encode_binary(bytes: &[u8]) -> Encoded {
    Encoded::Binary(bytes.to_vec())
}

/// Encode `bytes`, read from `base_address`, with default options.
pub fn encode(bytes: &[u8], base_address: u32, format: DumpFormat) -> Encoded {
    encode_with(bytes, base_address, format, &EncodeOptions::default())
}

/// Encode `bytes`, read from `base_address`, with explicit options.
pub fn encode_with(
    bytes: &[u8],
    base_address: u32,
    format: DumpFormat,
    options: &EncodeOptions,
) -> Encoded {
    match format {
        DumpFormat::Binary => encode_binary(bytes),
        DumpFormat::IntelHex => {
            Encoded::Text(encode_intel_hex_with(bytes, base_address, options.intel_hex))
        },
        DumpFormat::SRecord => {
            Encoded::Text(encode_srecord_with(bytes, base_address, options.srecord))
        },
        DumpFormat::HexText => Encoded::Text(encode_hex_text(bytes)),
    }
}

/// Append `bytes` as uppercase hex digits.
pub(crate) fn push_hex_upper(out: &mut String, bytes: &[u8]) {
    use fmt::Write as _;
    for byte in bytes {
        let _ = write!(out, "{byte:02X}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binary_is_identity() {
        let data: Vec<u8> = (0..=255).collect();
        assert_eq!(encode_binary(&data), Encoded::Binary(data.clone()));
        assert_eq!(encode_binary(&[]), Encoded::Binary(Vec::new()));
    }

    #[test]
    fn test_format_from_name() {
        assert_eq!(DumpFormat::from_name("bin"), Some(DumpFormat::Binary));
        assert_eq!(DumpFormat::from_name("RAW"), Some(DumpFormat::Binary));
        assert_eq!(DumpFormat::from_name("ihex"), Some(DumpFormat::IntelHex));
        assert_eq!(DumpFormat::from_name("Hex"), Some(DumpFormat::IntelHex));
        assert_eq!(DumpFormat::from_name("srec"), Some(DumpFormat::SRecord));
        assert_eq!(DumpFormat::from_name("mot"), Some(DumpFormat::SRecord));
        assert_eq!(DumpFormat::from_name(" text "), Some(DumpFormat::HexText));
        assert_eq!(DumpFormat::from_name("elf"), None);
    }

    #[test]
    fn test_format_from_str_error() {
        let err = "uf2".parse::<DumpFormat>().unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_format_display_roundtrips_through_from_name() {
        for format in DumpFormat::ALL {
            assert_eq!(DumpFormat::from_name(&format.to_string()), Some(format));
        }
    }

    #[test]
    fn test_format_extension_and_kind() {
        assert_eq!(DumpFormat::Binary.extension(), "bin");
        assert_eq!(DumpFormat::IntelHex.extension(), "hex");
        assert_eq!(DumpFormat::SRecord.extension(), "srec");
        assert_eq!(DumpFormat::HexText.extension(), "txt");
        assert!(!DumpFormat::Binary.is_text());
        assert!(DumpFormat::SRecord.is_text());
    }

    #[test]
    fn test_encode_dispatch() {
        let data = [0x01, 0x02];
        assert_eq!(
            encode(&data, 0, DumpFormat::Binary),
            Encoded::Binary(vec![0x01, 0x02])
        );
        assert_eq!(
            encode(&data, 0, DumpFormat::HexText),
            Encoded::Text("01 02".to_string())
        );
        assert_eq!(
            encode(&data, 0, DumpFormat::IntelHex).as_text(),
            Some(":020000000102FB\n:00000001FF")
        );
    }

    #[test]
    fn test_encode_is_deterministic() {
        let data: Vec<u8> = (0..100).map(|i| (i * 7) as u8).collect();
        for format in DumpFormat::ALL {
            assert_eq!(
                encode(&data, 0x0800_0000, format),
                encode(&data, 0x0800_0000, format)
            );
        }
    }

    #[test]
    fn test_write_to_appends_newline_for_text() {
        let mut out = Vec::new();
        Encoded::Text("ab".into()).write_to(&mut out).unwrap();
        assert_eq!(out, b"ab\n");

        let mut out = Vec::new();
        Encoded::Text(String::new()).write_to(&mut out).unwrap();
        assert!(out.is_empty());

        let mut out = Vec::new();
        Encoded::Binary(vec![0x0A, 0x00]).write_to(&mut out).unwrap();
        assert_eq!(out, vec![0x0A, 0x00]);
    }
}
