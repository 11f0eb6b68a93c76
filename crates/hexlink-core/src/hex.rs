//! Fixed-width hex/decimal rendering and hex-digit parsing
//!
//! Output is always uppercase. Input digits are accepted in either case.

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

const DIGITS: &[u8; 16] = b"0123456789ABCDEF";

/// Render a byte as two uppercase hex digits
pub fn byte(value: u8) -> String {
    format!("{:02X}", value)
}

/// Render a 16-bit value as four uppercase hex digits
pub fn word(value: u16) -> String {
    format!("{:04X}", value)
}

/// Render a 32-bit value as eight uppercase hex digits
pub fn dword(value: u32) -> String {
    format!("{:08X}", value)
}

/// Render an unsigned value in decimal
pub fn decimal(value: u64) -> String {
    format!("{}", value)
}

/// Append a byte as two uppercase hex digits
pub fn push_byte(out: &mut String, value: u8) {
    out.push(DIGITS[(value >> 4) as usize] as char);
    out.push(DIGITS[(value & 0x0F) as usize] as char);
}

/// Value of a single hex digit
pub fn nibble(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

/// Failure to turn a string of hex digit pairs into bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairError {
    /// The number of digits is odd
    OddLength {
        /// Number of digits found
        digits: usize,
    },
    /// A character is not a hex digit
    InvalidDigit {
        /// 0-based character position
        position: usize,
        /// Offending character
        found: char,
    },
}

/// Decode a string of hex digit pairs ("nibble pairs") into bytes
pub fn parse_pairs(text: &str) -> Result<Vec<u8>, PairError> {
    let raw = text.as_bytes();
    if raw.len() % 2 != 0 {
        return Err(PairError::OddLength { digits: raw.len() });
    }

    let mut out = Vec::with_capacity(raw.len() / 2);
    for (i, pair) in raw.chunks_exact(2).enumerate() {
        let hi = nibble(pair[0]).ok_or(PairError::InvalidDigit {
            position: i * 2,
            found: pair[0] as char,
        })?;
        let lo = nibble(pair[1]).ok_or(PairError::InvalidDigit {
            position: i * 2 + 1,
            found: pair[1] as char,
        })?;
        out.push((hi << 4) | lo);
    }
    Ok(out)
}

/// Parse a number that can be hex (0x...) or decimal
pub fn parse_number(s: &str) -> Result<u64, String> {
    let s = s.trim();
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16).map_err(|e| format!("invalid hex value: {}", e))
    } else {
        s.parse::<u64>()
            .map_err(|e| format!("invalid number: {}", e))
    }
}
