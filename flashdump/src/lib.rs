//! # flashdump
//!
//! Turn microcontroller memory dumps into files standard tools can load.
//!
//! A dump is a byte buffer plus the base address it was read from. This crate
//! provides:
//!
//! - Encoders for raw binary, Intel HEX, Motorola S-record (S3) and plain hex
//!   text
//! - Intel HEX / S-record readers with checksum verification
//! - Validation of user-supplied addresses and lengths
//! - Dump sources: a mock board with synthetic patterns and raw image files
//! - Serial port discovery (Flipper Zero, ESP32 native USB, USB-UART bridges)
//!
//! ## Features
//!
//! - `native` (default): serial port discovery via the `serialport` crate
//! - `serde`: serialization support for formats and segments
//!
//! ## Example
//!
//! ```rust
//! use flashdump::{DumpRequest, MockPattern, MockSource, encode, read_dump};
//!
//! fn main() -> flashdump::Result<()> {
//!     let request = DumpRequest::parse("0x08000000", "32", "ihex")?;
//!     let mut source = MockSource::new(MockPattern::Ramp);
//!     let bytes = read_dump(&mut source, &request, &mut |_, _| {})?;
//!
//!     let hex = encode(&bytes, request.address, request.format);
//!     assert!(hex.as_text().unwrap().ends_with(":00000001FF"));
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

use std::sync::{Arc, OnceLock};

pub mod device;
pub mod error;
pub mod format;
pub mod request;
pub mod source;

static INTERRUPT_CHECKER: OnceLock<Arc<dyn Fn() -> bool + Send + Sync>> = OnceLock::new();

/// Register a global interruption checker used by long-running reads.
///
/// The checker should return `true` when the current operation should stop
/// (for example after receiving Ctrl-C in CLI applications). Only the first
/// registration takes effect.
pub fn set_interrupt_checker<F>(checker: F)
where
    F: Fn() -> bool + Send + Sync + 'static,
{
    let _ = INTERRUPT_CHECKER.set(Arc::new(checker));
}

/// Returns whether interruption was requested by the embedding application.
#[must_use]
pub fn is_interrupted_requested() -> bool {
    INTERRUPT_CHECKER
        .get()
        .is_some_and(|checker| checker())
}

pub use {
    device::{DetectedPort, DeviceKind, auto_detect_port, detect_ports, format_port_list},
    error::{Error, Result},
    format::{
        DumpFormat, EncodeOptions, Encoded, IntelHexOptions, RECORD_DATA_LEN, SRecordOptions,
        decode::{Decoded, Segment, decode, decode_intel_hex, decode_srecord, flatten},
        encode, encode_binary, encode_hex_text, encode_intel_hex, encode_srecord, encode_with,
    },
    request::{DumpRequest, MAX_DUMP_LENGTH, parse_address, parse_length},
    source::{DumpSource, FileSource, MockPattern, MockSource, read_dump},
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interrupt_checker_default_false() {
        // Nothing in the library's own tests registers a checker.
        assert!(!is_interrupted_requested());
    }

    #[test]
    fn test_mock_dump_to_srecord() {
        let request = DumpRequest::parse("100", "2", "srec").unwrap();
        let mut source = MockSource::new(MockPattern::Fill(0xAA));
        let bytes = read_dump(&mut source, &request, &mut |_, _| {}).unwrap();
        let out = encode(&bytes, request.address, request.format);
        assert_eq!(out.as_text(), Some("S30700000100AAAAA3\nS70500000000FA"));
    }

    #[test]
    fn test_file_dump_roundtrips_through_intel_hex() {
        let image: Vec<u8> = (0..200).map(|i| (i * 3) as u8).collect();
        let mut source = FileSource::from_bytes("image", 0x2000, image.clone());
        let request = DumpRequest::new(0x2000, image.len(), DumpFormat::IntelHex).unwrap();
        let bytes = read_dump(&mut source, &request, &mut |_, _| {}).unwrap();

        let text = encode(&bytes, request.address, request.format);
        let decoded = decode(text.as_text().unwrap()).unwrap();
        assert_eq!(flatten(&decoded.segments), image);
    }
}
