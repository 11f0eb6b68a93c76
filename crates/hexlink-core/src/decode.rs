//! Intel HEX decoding
//!
//! Decoding is best-effort: every malformed line is reported through
//! [`Diagnostics`] and skipped, and decoding continues with the next line.
//! The only condition that stops decoding early is a first record line
//! without the `:` record mark, which is taken to mean the input is not
//! Intel HEX at all.

use alloc::format;

use crate::diag::Diagnostics;
use crate::hex::{self, PairError};
use crate::image::{AddressingMode, EntryPoint, MemoryImage};
use crate::record::{Record, RecordError, RecordType, RECORD_MARK};

/// Outcome of a decode session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Decoded {
    /// The decoded address space
    pub image: MemoryImage,
    /// Warnings and errors raised while decoding
    pub diagnostics: Diagnostics,
    /// Number of record lines that were read
    pub lines: usize,
}

impl Decoded {
    /// True when decoding raised no error
    pub fn is_ok(&self) -> bool {
        self.diagnostics.is_ok()
    }
}

/// Decode a complete HEX text
pub fn decode_str(text: &str) -> Decoded {
    decode_lines(text.lines())
}

/// Decode a sequence of lines
pub fn decode_lines<'a, I>(lines: I) -> Decoded
where
    I: IntoIterator<Item = &'a str>,
{
    let mut decoder = Decoder::new();
    for line in lines {
        if decoder.feed(line) == Flow::Stop {
            break;
        }
    }
    decoder.finish()
}

/// Decode HEX text from a buffered reader
///
/// Malformed content is reported through the returned diagnostics; only
/// read failures produce an `Err`.
#[cfg(feature = "std")]
pub fn decode_reader<R: std::io::BufRead>(reader: R) -> std::io::Result<Decoded> {
    let mut decoder = Decoder::new();
    for line in reader.split(b'\n') {
        if decoder.feed_bytes(&line?) == Flow::Stop {
            break;
        }
    }
    Ok(decoder.finish())
}

/// Decode a HEX file from disk
#[cfg(feature = "std")]
pub fn decode_file(path: impl AsRef<std::path::Path>) -> std::io::Result<Decoded> {
    let file = std::fs::File::open(path)?;
    decode_reader(std::io::BufReader::new(file))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Stop,
}

/// Line-by-line decoder state
struct Decoder {
    image: MemoryImage,
    diag: Diagnostics,
    /// Current base; low 16 bits are replaced by each Data record's offset
    base: u32,
    eof_seen: bool,
    /// Physical line number of the last line fed
    line_no: usize,
    /// Record lines read so far
    records: usize,
    aborted: bool,
}

impl Decoder {
    fn new() -> Self {
        Self {
            image: MemoryImage::new(),
            diag: Diagnostics::new(),
            base: 0,
            eof_seen: false,
            line_no: 0,
            records: 0,
            aborted: false,
        }
    }

    /// Feed one raw line; bytes that are not text make the line unreadable
    #[cfg(feature = "std")]
    fn feed_bytes(&mut self, raw: &[u8]) -> Flow {
        match core::str::from_utf8(raw) {
            Ok(line) => self.feed(line),
            Err(e) => {
                self.line_no += 1;
                self.records += 1;
                if self.records == 1 {
                    self.diag
                        .add_error("Intel HEX File decode aborted; ':' missing in first line.");
                    self.aborted = true;
                    return Flow::Stop;
                }
                self.diag.add_error(format!(
                    "Can't convert byte 0x{} at column {} to text @ line {}",
                    hex::byte(raw[e.valid_up_to()]),
                    e.valid_up_to() + 1,
                    self.line_no
                ));
                Flow::Continue
            }
        }
    }

    fn feed(&mut self, raw: &str) -> Flow {
        self.line_no += 1;
        let line = raw.trim();

        if line.is_empty() {
            // Leading blank lines are skipped, a later one ends the stream
            return if self.records == 0 {
                Flow::Continue
            } else {
                Flow::Stop
            };
        }
        self.records += 1;

        let digits = match line.strip_prefix(RECORD_MARK) {
            Some(rest) => rest,
            None => {
                self.diag.add_warning(format!(
                    "Line without record mark ':' found @ line {}",
                    self.line_no
                ));
                if self.records == 1 {
                    self.diag
                        .add_error("Intel HEX File decode aborted; ':' missing in first line.");
                    self.aborted = true;
                    return Flow::Stop;
                }
                line
            }
        };

        let bytes = match hex::parse_pairs(digits) {
            Ok(bytes) => bytes,
            Err(PairError::OddLength { .. }) => {
                self.diag.add_error(format!(
                    "Odd number of characters in line {}",
                    self.line_no
                ));
                return Flow::Continue;
            }
            Err(PairError::InvalidDigit { position, found }) => {
                self.diag.add_error(format!(
                    "Can't convert '{}' at column {} to hex @ line {}",
                    found,
                    position + 2,
                    self.line_no
                ));
                return Flow::Continue;
            }
        };

        match Record::from_bytes(&bytes) {
            Ok(record) => self.apply(record),
            Err(e) => self.report(e),
        }
        Flow::Continue
    }

    fn report(&mut self, error: RecordError) {
        let line = self.line_no;
        match error {
            RecordError::TooShort { found } => self.diag.add_error(format!(
                "Record @ line {} too short; {} bytes found",
                line, found
            )),
            RecordError::Checksum { calculated, found } => self.diag.add_error(format!(
                "Checksum error @ line {}; calculated 0x{} found 0x{}",
                line,
                hex::byte(calculated),
                hex::byte(found)
            )),
            RecordError::LengthMismatch { declared, actual } => self.diag.add_error(format!(
                "Record length @ line {} is {} but {} data bytes present",
                line, declared, actual
            )),
            RecordError::UnknownType(kind) => self.diag.add_error(format!(
                "Unknown Intel HEX record type 0x{} @ line {}",
                hex::byte(kind),
                line
            )),
        }
    }

    fn apply(&mut self, record: Record) {
        let line = self.line_no;
        if self.eof_seen && record.kind != RecordType::EndOfFile {
            self.diag
                .add_warning(format!("{} record after End Of File @ line {}", record.kind, line));
        }

        let len = record.payload.len();
        match record.kind {
            RecordType::Data => {
                self.base = (self.base & !0xFFFF) + record.offset as u32;
                log::trace!(
                    "Data record @ line {}: {} bytes at 0x{}",
                    line,
                    len,
                    hex::dword(self.base)
                );
                self.base = self
                    .image
                    .write_bytes(self.base, &record.payload, &mut self.diag);
            }
            RecordType::EndOfFile => {
                if self.eof_seen {
                    self.diag.add_error(format!(
                        "Additional End Of File record @ line {} found.",
                        line
                    ));
                }
                self.eof_seen = true;
                log::trace!("End of File @ line {}", line);
            }
            RecordType::ExtendedSegmentAddress => {
                if len == 2 {
                    let segment = u16::from_be_bytes([record.payload[0], record.payload[1]]);
                    self.base = (segment as u32) << 4;
                    self.image.set_mode(AddressingMode::Segmented);
                    log::debug!("Ext. Seg. Address found: 0x{}", hex::dword(self.base));
                } else {
                    self.diag.add_error(format!(
                        "Extended Segment Address @ line {} not 2 bytes as required.",
                        line
                    ));
                }
            }
            RecordType::ExtendedLinearAddress => {
                if len == 2 {
                    let upper = u16::from_be_bytes([record.payload[0], record.payload[1]]);
                    self.base = (upper as u32) << 16;
                    self.image.set_mode(AddressingMode::Linear);
                    log::debug!("Ext. Lin. Address found: 0x{}", hex::dword(self.base));
                } else {
                    self.diag.add_error(format!(
                        "Extended Linear Address @ line {} not 2 bytes as required.",
                        line
                    ));
                }
            }
            RecordType::StartSegmentAddress | RecordType::StartLinearAddress => {
                self.apply_start(record.kind, &record.payload)
            }
        }
    }

    fn apply_start(&mut self, kind: RecordType, payload: &[u8]) {
        let line = self.line_no;
        let segment = kind == RecordType::StartSegmentAddress;
        let (exists, other_exists) = {
            let entries = self.image.entry_points();
            if segment {
                (entries.has_segment(), entries.has_linear())
            } else {
                (entries.has_linear(), entries.has_segment())
            }
        };
        let other = if segment {
            RecordType::StartLinearAddress
        } else {
            RecordType::StartSegmentAddress
        };

        if let Ok(raw) = <[u8; 4]>::try_from(payload) {
            if !exists {
                let entry = if segment {
                    EntryPoint::Segment {
                        cs: u16::from_be_bytes([raw[0], raw[1]]),
                        ip: u16::from_be_bytes([raw[2], raw[3]]),
                    }
                } else {
                    EntryPoint::Linear {
                        eip: u32::from_be_bytes(raw),
                    }
                };
                self.image.record_entry(entry);
                log::debug!("{} found: {}", kind, entry);
            }
        }

        if exists {
            self.diag.add_error(format!(
                "{} record appears again @ line {}; repeated record ignored.",
                kind, line
            ));
        }
        if other_exists {
            self.diag.add_error(format!(
                "{} record found @ line {} but {} already exists.",
                kind, line, other
            ));
        }
        if payload.len() != 4 {
            self.diag.add_error(format!(
                "{} @ line {} not 4 bytes as required.",
                kind, line
            ));
        }
    }

    fn finish(mut self) -> Decoded {
        if !self.aborted && self.records > 0 && !self.eof_seen {
            self.diag.add_warning("No End Of File record found");
        }
        log::debug!(
            "Decoded {} lines, {} bytes, {} warnings, {} errors",
            self.records,
            self.image.len(),
            self.diag.warning_count(),
            self.diag.error_count()
        );
        Decoded {
            image: self.image,
            diagnostics: self.diag,
            lines: self.records,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    #[test]
    fn test_decode_example() {
        let decoded = decode_str(":0300300002337A1E\n:00000001FF\n");
        assert!(decoded.is_ok());
        assert_eq!(decoded.diagnostics.warning_count(), 0);
        assert_eq!(decoded.image.get(0x30), Some(0x02));
        assert_eq!(decoded.image.get(0x31), Some(0x33));
        assert_eq!(decoded.image.get(0x32), Some(0x7A));
        assert_eq!(decoded.image.len(), 3);
        assert_eq!(decoded.lines, 2);
    }

    #[test]
    fn test_lowercase_digits() {
        let decoded = decode_str(":0300300002337a1e\n:00000001ff\n");
        assert!(decoded.is_ok());
        assert_eq!(decoded.image.get(0x32), Some(0x7A));
    }

    #[test]
    fn test_first_line_without_mark_aborts() {
        let decoded = decode_str("0300300002337A1E\n:0300300002337A1E\n:00000001FF\n");
        assert!(decoded.image.is_empty());
        assert_eq!(decoded.diagnostics.error_count(), 1);
        assert!(decoded.diagnostics.errors()[0].contains("decode aborted"));
    }

    #[test]
    fn test_leading_blank_lines_are_skipped() {
        let decoded = decode_str("\n   \n:0300300002337A1E\n:00000001FF\n");
        assert!(decoded.is_ok());
        assert_eq!(decoded.image.len(), 3);
    }

    #[test]
    fn test_later_line_without_mark_warns() {
        let text = ":0100000011EE\n0100010022DC\n:0100020033CA\n:00000001FF\n";
        let decoded = decode_str(text);
        assert!(decoded.is_ok());
        assert_eq!(decoded.diagnostics.warning_count(), 1);
        assert_eq!(decoded.image.get(0x00), Some(0x11));
        assert_eq!(decoded.image.get(0x01), Some(0x22));
        assert_eq!(decoded.image.get(0x02), Some(0x33));
    }

    #[test]
    fn test_blank_line_ends_stream() {
        let decoded = decode_str(":0100000011EE\n\n:0100020033CA\n:00000001FF\n");
        assert_eq!(decoded.image.len(), 1);
        // the EOF record was never reached
        assert_eq!(decoded.diagnostics.warning_count(), 1);
    }

    #[test]
    fn test_checksum_error_skips_record() {
        let decoded = decode_str(":0300300002337A1F\n:00000001FF\n");
        assert!(decoded.image.is_empty());
        assert_eq!(decoded.diagnostics.error_count(), 1);
        assert_eq!(
            decoded.diagnostics.errors()[0],
            "1 Error: Checksum error @ line 1; calculated 0x1E found 0x1F"
        );
    }

    #[test]
    fn test_odd_digit_count() {
        let decoded = decode_str(":0300300002337A1\n:00000001FF\n");
        assert_eq!(decoded.diagnostics.error_count(), 1);
        assert!(decoded.diagnostics.errors()[0].contains("Odd number"));
        assert!(decoded.image.is_empty());
    }

    #[test]
    fn test_unknown_record_type() {
        let decoded = decode_str(":00000007F9\n:00000001FF\n");
        assert_eq!(decoded.diagnostics.error_count(), 1);
        assert!(decoded.diagnostics.errors()[0].contains("Unknown"));
    }

    #[test]
    fn test_additional_eof() {
        let decoded = decode_str(":00000001FF\n:00000001FF\n");
        assert_eq!(decoded.diagnostics.error_count(), 1);
        assert!(decoded.diagnostics.errors()[0].contains("Additional End Of File"));
    }

    #[test]
    fn test_extended_linear_address() {
        let decoded = decode_str(":020000040800F2\n:01001000559A\n:00000001FF\n");
        assert!(decoded.is_ok());
        assert_eq!(decoded.image.get(0x0800_0010), Some(0x55));
        assert_eq!(decoded.image.mode(), AddressingMode::Linear);
    }

    #[test]
    fn test_extended_segment_address() {
        let decoded = decode_str(":020000021000EC\n:01001000559A\n:00000001FF\n");
        assert!(decoded.is_ok());
        assert_eq!(decoded.image.get(0x1_0010), Some(0x55));
        assert_eq!(decoded.image.mode(), AddressingMode::Segmented);
    }

    #[test]
    fn test_extension_with_wrong_length_keeps_base() {
        // ELA with three payload bytes, then data at offset 0x10
        let decoded = decode_str(":03000004080000F1\n:01001000559A\n:00000001FF\n");
        assert_eq!(decoded.diagnostics.error_count(), 1);
        assert!(decoded.diagnostics.errors()[0].contains("not 2 bytes"));
        assert_eq!(decoded.image.get(0x10), Some(0x55));
    }

    #[test]
    fn test_start_linear_address() {
        let decoded = decode_str(":04000005080000C12E\n:00000001FF\n");
        assert!(decoded.is_ok());
        assert_eq!(decoded.image.entry_points().linear(), Some(0x0800_00C1));
    }

    #[test]
    fn test_repeated_start_record_is_ignored() {
        let text = ":0400000300003800C1\n:0400000300004000B9\n:00000001FF\n";
        let decoded = decode_str(text);
        assert_eq!(decoded.diagnostics.error_count(), 1);
        assert!(decoded.diagnostics.errors()[0].contains("repeated record ignored"));
        assert_eq!(decoded.image.entry_points().segment(), Some((0x0000, 0x3800)));
    }

    #[test]
    fn test_start_records_are_mutually_exclusive() {
        let text = ":0400000300003800C1\n:04000005080000C12E\n:00000001FF\n";
        let decoded = decode_str(text);
        assert!(decoded.diagnostics.error_count() >= 1);
        let entries = decoded.image.entry_points();
        assert!(entries.has_segment());
        assert!(entries.has_linear());
    }

    #[test]
    fn test_start_record_wrong_length() {
        let decoded = decode_str(":03000005080000F0\n:00000001FF\n");
        assert_eq!(decoded.diagnostics.error_count(), 1);
        assert!(decoded.diagnostics.errors()[0].contains("not 4 bytes"));
        assert!(!decoded.image.entry_points().has_linear());
    }

    #[test]
    fn test_duplicate_and_conflicting_data() {
        let text = ":0100000011EE\n:0100000011EE\n:0100000022DD\n:00000001FF\n";
        let decoded = decode_str(text);
        assert_eq!(decoded.diagnostics.warning_count(), 1);
        assert_eq!(decoded.diagnostics.error_count(), 1);
        assert_eq!(decoded.image.get(0), Some(0x11));
    }

    #[test]
    fn test_record_order_does_not_matter() {
        let records = [":0100000011EE", ":0100020033CA", ":020010000102EB"];
        let mut forward: Vec<&str> = records.to_vec();
        forward.push(":00000001FF");
        let mut reversed: Vec<&str> = records.iter().rev().copied().collect();
        reversed.push(":00000001FF");

        let a = decode_lines(forward);
        let b = decode_lines(reversed);
        assert!(a.is_ok() && b.is_ok());
        let a_bytes: Vec<(u32, u8)> = a.image.iter().collect();
        let b_bytes: Vec<(u32, u8)> = b.image.iter().collect();
        assert_eq!(a_bytes, b_bytes);
    }

    #[test]
    fn test_missing_eof_warns() {
        let decoded = decode_str(":0100000011EE\n");
        assert!(decoded.is_ok());
        assert_eq!(decoded.diagnostics.warning_count(), 1);
    }

    #[test]
    fn test_record_after_eof_is_decoded_with_warning() {
        let decoded = decode_str(":00000001FF\n:0100000011EE\n");
        assert!(decoded.is_ok());
        assert_eq!(decoded.diagnostics.warning_count(), 1);
        assert!(decoded.diagnostics.warnings()[0].contains("Data record after End Of File"));
        assert_eq!(decoded.image.get(0), Some(0x11));
    }

    #[test]
    fn test_invalid_digit_skips_line() {
        let decoded = decode_str(":01000000G1EE\n:00000001FF\n");
        assert_eq!(decoded.diagnostics.error_count(), 1);
        assert!(decoded.diagnostics.errors()[0].contains("Can't convert 'G'"));
        assert!(decoded.image.is_empty());
    }

    #[test]
    fn test_segment_extension_with_wrong_length_keeps_base() {
        // ESA with three payload bytes, then data at offset 0x10
        let decoded = decode_str(":03000002100000EB\n:01001000559A\n:00000001FF\n");
        assert_eq!(decoded.diagnostics.error_count(), 1);
        assert!(decoded.diagnostics.errors()[0].contains("Extended Segment Address"));
        assert_eq!(decoded.image.get(0x10), Some(0x55));
        assert_eq!(decoded.image.mode(), AddressingMode::Linear);
    }

    #[test]
    fn test_start_records_exclusive_linear_first() {
        let text = ":04000005080000C12E\n:0400000300003800C1\n:00000001FF\n";
        let decoded = decode_str(text);
        assert_eq!(decoded.diagnostics.error_count(), 1);
        assert!(decoded.diagnostics.errors()[0].contains("Start Linear Address already exists"));
        let entries = decoded.image.entry_points();
        assert!(entries.has_linear());
        assert!(entries.has_segment());
        assert_eq!(entries.primary(), Some(EntryPoint::Linear { eip: 0x0800_00C1 }));
    }

    #[cfg(feature = "std")]
    #[test]
    fn test_reader_salvages_lines_that_are_not_text() {
        let input = std::io::Cursor::new(
            &b":0300300002337A1E\n\xFF\xFE\n:0100000011EE\n:00000001FF\n"[..],
        );
        let decoded = decode_reader(input).unwrap();
        assert_eq!(decoded.diagnostics.error_count(), 1);
        assert!(decoded.diagnostics.errors()[0].contains("Can't convert byte 0xFF"));
        assert!(decoded.diagnostics.errors()[0].contains("line 2"));
        assert_eq!(decoded.image.len(), 4);
        assert_eq!(decoded.image.get(0x00), Some(0x11));
        assert_eq!(decoded.image.get(0x32), Some(0x7A));
        assert_eq!(decoded.lines, 4);
    }

    #[cfg(feature = "std")]
    #[test]
    fn test_reader_first_line_not_text_aborts() {
        let input = std::io::Cursor::new(&b"\xFF:0100000011EE\n:00000001FF\n"[..]);
        let decoded = decode_reader(input).unwrap();
        assert_eq!(decoded.diagnostics.error_count(), 1);
        assert!(decoded.image.is_empty());
    }

    #[cfg(feature = "std")]
    #[test]
    fn test_decode_reader() {
        let input = std::io::Cursor::new(":0300300002337A1E\r\n:00000001FF\r\n");
        let decoded = decode_reader(input).unwrap();
        assert!(decoded.is_ok());
        assert_eq!(decoded.image.len(), 3);
    }
}
