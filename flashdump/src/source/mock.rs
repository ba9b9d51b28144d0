//! Synthetic memory for running dumps without hardware.

use std::fmt;

use crate::error::{Error, Result};

use super::DumpSource;

/// Byte pattern produced by [`MockSource`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MockPattern {
    /// Low byte of each address: `00 01 02 .. ff 00 ..`.
    #[default]
    Ramp,
    /// Each aligned 32-bit word holds its own address, big-endian.
    Address,
    /// Constant byte.
    Fill(u8),
    /// Erased flash, all `0xFF`.
    Erased,
}

impl MockPattern {
    /// Parse a pattern name: `ramp`, `address`, `erased` or `fill=<byte>`.
    pub fn from_name(name: &str) -> Result<Self> {
        let name = name.trim().to_lowercase();
        match name.as_str() {
            "ramp" => Ok(Self::Ramp),
            "address" | "addr" => Ok(Self::Address),
            "erased" | "ff" => Ok(Self::Erased),
            _ => {
                let value = name
                    .strip_prefix("fill=")
                    .ok_or_else(|| Error::InvalidInput(format!("unknown mock pattern '{name}'")))?;
                let value = value.strip_prefix("0x").unwrap_or(value);
                u8::from_str_radix(value, 16)
                    .map(Self::Fill)
                    .map_err(|e| Error::InvalidInput(format!("invalid fill byte '{value}': {e}")))
            },
        }
    }

    /// Byte at `address`.
    #[must_use]
    pub fn byte_at(&self, address: u32) -> u8 {
        match self {
            Self::Ramp => address as u8,
            Self::Address => (address & !3).to_be_bytes()[(address & 3) as usize],
            Self::Fill(value) => *value,
            Self::Erased => 0xFF,
        }
    }
}

impl fmt::Display for MockPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ramp => write!(f, "ramp"),
            Self::Address => write!(f, "address"),
            Self::Fill(value) => write!(f, "fill={value:02x}"),
            Self::Erased => write!(f, "erased"),
        }
    }
}

/// Deterministic stand-in for a connected board.
#[derive(Debug, Clone)]
pub struct MockSource {
    pattern: MockPattern,
    name: String,
}

impl MockSource {
    /// Create a mock serving `pattern` at every address.
    pub fn new(pattern: MockPattern) -> Self {
        Self {
            pattern,
            name: format!("mock:{pattern}"),
        }
    }

    /// The pattern being served.
    pub fn pattern(&self) -> MockPattern {
        self.pattern
    }
}

impl Default for MockSource {
    fn default() -> Self {
        Self::new(MockPattern::default())
    }
}

impl DumpSource for MockSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn read(&mut self, address: u32, buf: &mut [u8]) -> Result<()> {
        for (i, byte) in buf.iter_mut().enumerate() {
            *byte = self.pattern.byte_at(address.wrapping_add(i as u32));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ramp() {
        let mut source = MockSource::new(MockPattern::Ramp);
        let mut buf = [0u8; 4];
        source.read(0x08FE, &mut buf).unwrap();
        assert_eq!(buf, [0xFE, 0xFF, 0x00, 0x01]);
    }

    #[test]
    fn test_address_pattern() {
        let mut source = MockSource::new(MockPattern::Address);
        let mut buf = [0u8; 8];
        source.read(0x0800_0000, &mut buf).unwrap();
        assert_eq!(buf, [0x08, 0x00, 0x00, 0x00, 0x08, 0x00, 0x00, 0x04]);
    }

    #[test]
    fn test_address_pattern_unaligned_start() {
        let mut source = MockSource::new(MockPattern::Address);
        let mut buf = [0u8; 3];
        source.read(0x1232, &mut buf).unwrap();
        assert_eq!(buf, [0x12, 0x30, 0x00]);
    }

    #[test]
    fn test_fill_and_erased() {
        let mut buf = [0u8; 3];
        MockSource::new(MockPattern::Fill(0xA5))
            .read(0, &mut buf)
            .unwrap();
        assert_eq!(buf, [0xA5; 3]);
        MockSource::new(MockPattern::Erased)
            .read(0, &mut buf)
            .unwrap();
        assert_eq!(buf, [0xFF; 3]);
    }

    #[test]
    fn test_pattern_from_name() {
        assert_eq!(MockPattern::from_name("ramp").unwrap(), MockPattern::Ramp);
        assert_eq!(MockPattern::from_name("Address").unwrap(), MockPattern::Address);
        assert_eq!(MockPattern::from_name("erased").unwrap(), MockPattern::Erased);
        assert_eq!(MockPattern::from_name("fill=0xA5").unwrap(), MockPattern::Fill(0xA5));
        assert_eq!(MockPattern::from_name("fill=00").unwrap(), MockPattern::Fill(0));
        assert!(MockPattern::from_name("noise").is_err());
        assert!(MockPattern::from_name("fill=zz").is_err());
    }

    #[test]
    fn test_pattern_display_roundtrip() {
        for pattern in [
            MockPattern::Ramp,
            MockPattern::Address,
            MockPattern::Fill(0x3C),
            MockPattern::Erased,
        ] {
            assert_eq!(MockPattern::from_name(&pattern.to_string()).unwrap(), pattern);
        }
    }

    #[test]
    fn test_same_read_is_deterministic() {
        let mut a = [0u8; 64];
        let mut b = [0u8; 64];
        MockSource::default().read(0x40, &mut a).unwrap();
        MockSource::default().read(0x40, &mut b).unwrap();
        assert_eq!(a, b);
    }
}
