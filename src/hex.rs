//! Hex inspection helpers for manual analysis of suspect strings. Not used
//! by the deobfuscation pipeline itself.

use crate::{Result, UnvmError};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

lazy_static! {
    static ref HEX_SEGMENT_RE: Regex =
        Regex::new(r#"["']([0-9a-fA-F]{10,})["']"#).expect("hex segment pattern");
}

pub fn bytes_to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02X}")).collect()
}

/// Decodes a hex string, ignoring any non-hex characters. An odd number of
/// remaining digits is an error.
pub fn hex_to_bytes(text: &str) -> Result<Vec<u8>> {
    let cleaned: String = text.chars().filter(char::is_ascii_hexdigit).collect();

    if cleaned.len() % 2 != 0 {
        return Err(UnvmError::InvalidHex(format!(
            "odd number of hex digits ({})",
            cleaned.len()
        )));
    }

    (0..cleaned.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&cleaned[i..i + 2], 16)
                .map_err(|e| UnvmError::InvalidHex(e.to_string()))
        })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct HexMatch {
    pub position: usize,
    pub hex: String,
    pub decoded: String,
}

/// Finds quoted segments of 10+ hex characters whose decoded form is mostly
/// printable, and reports them with their byte position in the input.
pub fn find_hex_encoded_text(text: &str) -> Vec<HexMatch> {
    let mut found = Vec::new();

    for caps in HEX_SEGMENT_RE.captures_iter(text) {
        let (Some(whole), Some(segment)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let Ok(bytes) = hex_to_bytes(segment.as_str()) else {
            continue;
        };
        if bytes.is_empty() {
            continue;
        }

        let decoded = String::from_utf8_lossy(&bytes);
        let total = decoded.chars().count();
        let printable = decoded.chars().filter(|c| !c.is_control()).count();

        if printable * 2 > total {
            found.push(HexMatch {
                position: whole.start(),
                hex: segment.as_str().to_string(),
                decoded: decoded.into_owned(),
            });
        }
    }

    found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_roundtrip() {
        let bytes = vec![0x00, 0x7F, 0xAB, 0xFF];
        let hex = bytes_to_hex(&bytes);
        assert_eq!(hex, "007FABFF");
        assert_eq!(hex_to_bytes(&hex).expect("valid hex"), bytes);
    }

    #[test]
    fn test_hex_to_bytes_strips_noise() {
        let bytes = hex_to_bytes("48 65:6c-6c 6f").expect("valid after stripping");
        assert_eq!(bytes, b"Hello");
    }

    #[test]
    fn test_hex_to_bytes_rejects_odd_length() {
        assert!(matches!(
            hex_to_bytes("abc"),
            Err(UnvmError::InvalidHex(_))
        ));
    }

    #[test]
    fn test_find_hex_encoded_text() {
        // "Hello world" = 48656c6c6f20776f726c64 (22 hex chars)
        let source = "local s = \"48656c6c6f20776f726c64\" local t = 2";
        let found = find_hex_encoded_text(source);

        assert_eq!(found.len(), 1, "Should find one readable segment");
        assert_eq!(found[0].decoded, "Hello world");
        assert_eq!(found[0].position, 10);
    }

    #[test]
    fn test_find_skips_unreadable_segments() {
        // Control bytes decode to mostly unprintable text.
        let source = "local s = '01020304050607080901'";
        assert!(
            find_hex_encoded_text(source).is_empty(),
            "Mostly-control bytes should be rejected"
        );
    }

    #[test]
    fn test_find_ignores_short_segments() {
        let source = "local s = \"48656c6c\"";
        assert!(find_hex_encoded_text(source).is_empty());
    }
}
