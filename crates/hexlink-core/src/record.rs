//! Intel HEX records
//!
//! A record is one line of the text format:
//!
//! ```text
//! :LLOOOOTT<payload>CC
//! ```
//!
//! `LL` is the payload length, `OOOO` the big-endian load offset, `TT` the
//! record type and `CC` the two's complement of the 8-bit sum of all
//! preceding bytes.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use crate::hex;

/// Record mark that starts every line
pub const RECORD_MARK: char = ':';

/// The fixed End-Of-File record
pub const EOF_LINE: &str = ":00000001FF";

/// Bytes in a record besides the payload (length, offset, type, checksum)
pub const RECORD_OVERHEAD: usize = 5;

/// Record type field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum RecordType {
    /// Payload bytes at base + offset
    Data = 0x00,
    /// End of file
    EndOfFile = 0x01,
    /// Base = value << 4
    ExtendedSegmentAddress = 0x02,
    /// CS:IP entry point
    StartSegmentAddress = 0x03,
    /// Base = value << 16
    ExtendedLinearAddress = 0x04,
    /// EIP entry point
    StartLinearAddress = 0x05,
}

impl TryFrom<u8> for RecordType {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0x00 => RecordType::Data,
            0x01 => RecordType::EndOfFile,
            0x02 => RecordType::ExtendedSegmentAddress,
            0x03 => RecordType::StartSegmentAddress,
            0x04 => RecordType::ExtendedLinearAddress,
            0x05 => RecordType::StartLinearAddress,
            other => return Err(other),
        })
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RecordType::Data => "Data",
            RecordType::EndOfFile => "End Of File",
            RecordType::ExtendedSegmentAddress => "Extended Segment Address",
            RecordType::StartSegmentAddress => "Start Segment Address",
            RecordType::ExtendedLinearAddress => "Extended Linear Address",
            RecordType::StartLinearAddress => "Start Linear Address",
        };
        f.write_str(name)
    }
}

/// Why a line's bytes do not form a usable record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordError {
    /// Fewer bytes than length + offset + type + checksum
    TooShort {
        /// Bytes found on the line
        found: usize,
    },
    /// Sum of all bytes is not zero
    Checksum {
        /// Checksum the line should carry
        calculated: u8,
        /// Checksum found on the line
        found: u8,
    },
    /// Length field disagrees with the payload on the line
    LengthMismatch {
        /// Length field value
        declared: u8,
        /// Payload bytes actually present
        actual: usize,
    },
    /// Record type outside 0x00..=0x05
    UnknownType(u8),
}

/// Two's complement of the 8-bit sum of `bytes`
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes
        .iter()
        .fold(0u8, |acc, &b| acc.wrapping_add(b))
        .wrapping_neg()
}

/// A single record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Record type
    pub kind: RecordType,
    /// 16-bit load offset
    pub offset: u16,
    /// Payload bytes (at most 255)
    pub payload: Vec<u8>,
}

impl Record {
    /// Data record; `payload` must not exceed 255 bytes
    pub fn data(offset: u16, payload: &[u8]) -> Self {
        debug_assert!(payload.len() <= u8::MAX as usize);
        Self {
            kind: RecordType::Data,
            offset,
            payload: payload.to_vec(),
        }
    }

    /// End-Of-File record
    pub fn end_of_file() -> Self {
        Self {
            kind: RecordType::EndOfFile,
            offset: 0,
            payload: Vec::new(),
        }
    }

    /// Extended Segment Address record carrying `segment` (base >> 4)
    pub fn extended_segment(segment: u16) -> Self {
        Self {
            kind: RecordType::ExtendedSegmentAddress,
            offset: 0,
            payload: segment.to_be_bytes().to_vec(),
        }
    }

    /// Extended Linear Address record carrying `upper` (base >> 16)
    pub fn extended_linear(upper: u16) -> Self {
        Self {
            kind: RecordType::ExtendedLinearAddress,
            offset: 0,
            payload: upper.to_be_bytes().to_vec(),
        }
    }

    /// Start Segment Address record
    pub fn start_segment(cs: u16, ip: u16) -> Self {
        let mut payload = Vec::with_capacity(4);
        payload.extend_from_slice(&cs.to_be_bytes());
        payload.extend_from_slice(&ip.to_be_bytes());
        Self {
            kind: RecordType::StartSegmentAddress,
            offset: 0,
            payload,
        }
    }

    /// Start Linear Address record
    pub fn start_linear(eip: u32) -> Self {
        Self {
            kind: RecordType::StartLinearAddress,
            offset: 0,
            payload: eip.to_be_bytes().to_vec(),
        }
    }

    /// Build a record from the decoded bytes of one line (mark stripped)
    ///
    /// Validation order: size, checksum, length field, record type.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, RecordError> {
        if bytes.len() < RECORD_OVERHEAD {
            return Err(RecordError::TooShort { found: bytes.len() });
        }

        let (body, tail) = bytes.split_at(bytes.len() - 1);
        if bytes.iter().fold(0u8, |acc, &b| acc.wrapping_add(b)) != 0 {
            return Err(RecordError::Checksum {
                calculated: checksum(body),
                found: tail[0],
            });
        }

        let declared = body[0];
        let payload = &body[4..];
        if payload.len() != declared as usize {
            return Err(RecordError::LengthMismatch {
                declared,
                actual: payload.len(),
            });
        }

        let kind = RecordType::try_from(body[3]).map_err(RecordError::UnknownType)?;

        Ok(Self {
            kind,
            offset: u16::from_be_bytes([body[1], body[2]]),
            payload: payload.to_vec(),
        })
    }

    /// All bytes of the record including the checksum
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.payload.len() + RECORD_OVERHEAD);
        bytes.push(self.payload.len() as u8);
        bytes.extend_from_slice(&self.offset.to_be_bytes());
        bytes.push(self.kind as u8);
        bytes.extend_from_slice(&self.payload);
        bytes.push(checksum(&bytes));
        bytes
    }

    /// Checksum byte of this record
    pub fn checksum(&self) -> u8 {
        let bytes = self.to_bytes();
        bytes[bytes.len() - 1]
    }

    /// Append the text form (without line terminator) to `out`
    pub fn write_line(&self, out: &mut String) {
        out.push(RECORD_MARK);
        for b in self.to_bytes() {
            hex::push_byte(out, b);
        }
    }

    /// Text form without line terminator
    pub fn to_line(&self) -> String {
        let mut line = String::with_capacity(1 + 2 * (self.payload.len() + RECORD_OVERHEAD));
        self.write_line(&mut line);
        line
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_line())
    }
}
