//! Plain hex text, one line per 16 bytes.

use std::fmt::Write as _;

use super::RECORD_DATA_LEN;

/// Render bytes as lowercase hex octets, 16 per line.
///
/// Octets are separated by a single space and lines by `\n`. The last line
/// is not padded and there is no trailing newline, so an empty buffer gives
/// an empty string.
pub fn encode_hex_text(bytes: &[u8]) -> String {
    // "xx " per byte, newline replaces the last space of each line
    let mut out = String::with_capacity(bytes.len() * 3);

    for (i, chunk) in bytes.chunks(RECORD_DATA_LEN).enumerate() {
        if i > 0 {
            out.push('\n');
        }
        for (j, byte) in chunk.iter().enumerate() {
            if j > 0 {
                out.push(' ');
            }
            let _ = write!(out, "{byte:02x}");
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty() {
        assert_eq!(encode_hex_text(&[]), "");
    }

    #[test]
    fn test_single_partial_line() {
        assert_eq!(encode_hex_text(&[0x00, 0xab, 0xff]), "00 ab ff");
    }

    #[test]
    fn test_full_line_has_no_trailing_newline() {
        let data: Vec<u8> = (0..16).collect();
        assert_eq!(
            encode_hex_text(&data),
            "00 01 02 03 04 05 06 07 08 09 0a 0b 0c 0d 0e 0f"
        );
    }

    #[test]
    fn test_line_and_token_counts() {
        for len in [1usize, 15, 16, 17, 31, 32, 33, 100] {
            let data: Vec<u8> = (0..len).map(|i| i as u8).collect();
            let text = encode_hex_text(&data);
            let lines: Vec<&str> = text.split('\n').collect();
            assert_eq!(lines.len(), len.div_ceil(16), "len {len}");

            let mut remaining = len;
            for line in lines {
                let tokens: Vec<&str> = line.split(' ').collect();
                assert_eq!(tokens.len(), remaining.min(16));
                for token in tokens {
                    assert_eq!(token.len(), 2);
                    assert!(token.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f')));
                }
                remaining -= remaining.min(16);
            }
        }
    }

    #[test]
    fn test_second_line_starts_at_byte_16() {
        let data: Vec<u8> = (0..18).collect();
        let text = encode_hex_text(&data);
        assert_eq!(text.lines().nth(1), Some("10 11"));
    }
}
