//! Intel HEX encoding
//!
//! Produces the minimal record stream for a [`MemoryImage`]: one extension
//! record per address window, Data records of up to 16 consecutive bytes,
//! start address records, and the End-Of-File record.

use alloc::format;
use alloc::string::String;
use core::fmt;

use crate::diag::Diagnostics;
use crate::hex;
use crate::image::{AddressingMode, MemoryImage};
use crate::record::Record;

/// Maximum payload of an emitted Data record
pub const DATA_RECORD_SIZE: usize = 16;

/// Highest address representable with segmented addressing
const SEGMENTED_LIMIT: u32 = 0xF_FFFF;

/// Outcome of an encode session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Encoded {
    /// Record text, one newline-terminated record per line
    pub text: String,
    /// Problems found while encoding
    pub diagnostics: Diagnostics,
    /// Number of records written
    pub records: usize,
}

impl Encoded {
    /// True when encoding raised no error
    pub fn is_ok(&self) -> bool {
        self.diagnostics.is_ok()
    }
}

/// Encode an image into HEX text
pub fn encode(image: &MemoryImage) -> Encoded {
    let mut text = String::new();
    let mut diagnostics = Diagnostics::new();
    // Writing into a String cannot fail
    let records = write_records(image, &mut text, &mut diagnostics).unwrap_or_default();
    Encoded {
        text,
        diagnostics,
        records,
    }
}

/// Write the records for `image` into `out`
///
/// Returns the number of records written.
pub fn write_records<W: fmt::Write>(
    image: &MemoryImage,
    out: &mut W,
    diag: &mut Diagnostics,
) -> Result<usize, fmt::Error> {
    let mut writer = RecordWriter { out, count: 0 };
    let mode = image.mode();
    let mut window: Option<u32> = None;
    let mut reported_window: Option<u32> = None;
    let mut bytes = image.iter().peekable();
    let mut payload = [0u8; DATA_RECORD_SIZE];

    while let Some((start, first)) = bytes.next() {
        let current = window_of(mode, start);
        if window != Some(current) {
            if mode == AddressingMode::Segmented
                && start > SEGMENTED_LIMIT
                && reported_window != Some(start >> 16)
            {
                reported_window = Some(start >> 16);
                diag.add_error(format!(
                    "Address 0x{} exceeds the segmented address space",
                    hex::dword(start)
                ));
            }
            writer.emit(&extension_record(mode, current))?;
            window = Some(current);
        }

        payload[0] = first;
        let mut len = 1;
        let mut last = start;
        while len < DATA_RECORD_SIZE {
            match bytes.peek() {
                Some(&(next, value)) if continues(last, next) => {
                    payload[len] = value;
                    len += 1;
                    last = next;
                    bytes.next();
                }
                _ => break,
            }
        }
        writer.emit(&Record::data(start as u16, &payload[..len]))?;
    }

    let entries = image.entry_points();
    if let Some((cs, ip)) = entries.segment() {
        writer.emit(&Record::start_segment(cs, ip))?;
    }
    if let Some(eip) = entries.linear() {
        writer.emit(&Record::start_linear(eip))?;
    }
    writer.emit(&Record::end_of_file())?;

    log::debug!("Encoded {} bytes into {} records", image.len(), writer.count);
    Ok(writer.count)
}

/// Window that a single extension record covers
fn window_of(mode: AddressingMode, address: u32) -> u32 {
    match mode {
        AddressingMode::Linear => address >> 16,
        AddressingMode::Segmented => address >> 4,
    }
}

fn extension_record(mode: AddressingMode, window: u32) -> Record {
    match mode {
        AddressingMode::Linear => Record::extended_linear(window as u16),
        AddressingMode::Segmented => Record::extended_segment(window as u16),
    }
}

/// Whether `next` may share a Data record with `last`
///
/// A record never spans a gap or the wrap of its 16-bit load offset.
fn continues(last: u32, next: u32) -> bool {
    last.checked_add(1) == Some(next) && next & 0xFFFF != 0
}

struct RecordWriter<'a, W: fmt::Write> {
    out: &'a mut W,
    count: usize,
}

impl<W: fmt::Write> RecordWriter<'_, W> {
    fn emit(&mut self, record: &Record) -> fmt::Result {
        log::trace!("{}", record);
        writeln!(self.out, "{}", record)?;
        self.count += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::decode_str;
    use crate::hex::parse_pairs;
    use crate::image::EntryPoint;
    use alloc::vec::Vec;

    fn image_from(bytes: &[(u32, u8)], mode: AddressingMode) -> MemoryImage {
        let mut image = MemoryImage::with_mode(mode);
        for &(a, v) in bytes {
            image.write_byte(a, v);
        }
        image
    }

    fn contents(image: &MemoryImage) -> Vec<(u32, u8)> {
        image.iter().collect()
    }

    #[test]
    fn test_encode_example() {
        let decoded = decode_str(":0300300002337A1E\n:00000001FF\n");
        let encoded = encode(&decoded.image);
        assert!(encoded.is_ok());
        assert_eq!(
            encoded.text,
            ":020000040000FA\n:0300300002337A1E\n:00000001FF\n"
        );
        assert_eq!(encoded.records, 3);
    }

    #[test]
    fn test_empty_image() {
        let encoded = encode(&MemoryImage::new());
        assert_eq!(encoded.text, ":00000001FF\n");
    }

    #[test]
    fn test_sixteen_bytes_per_record() {
        let bytes: Vec<(u32, u8)> = (0..40u32).map(|a| (a, a as u8)).collect();
        let encoded = encode(&image_from(&bytes, AddressingMode::Linear));
        let lines: Vec<&str> = encoded.text.lines().collect();
        // extension, 16 + 16 + 8, eof
        assert_eq!(lines.len(), 5);
        assert!(lines[1].starts_with(":10000000"));
        assert!(lines[2].starts_with(":10001000"));
        assert!(lines[3].starts_with(":08002000"));
    }

    #[test]
    fn test_gap_starts_new_record() {
        let encoded = encode(&image_from(
            &[(0x00, 1), (0x01, 2), (0x05, 3)],
            AddressingMode::Linear,
        ));
        let lines: Vec<&str> = encoded.text.lines().collect();
        assert_eq!(lines[1], ":020000000102FB");
        assert_eq!(lines[2], ":0100050003F7");
    }

    #[test]
    fn test_every_line_sums_to_zero() {
        let mut bytes: Vec<(u32, u8)> = (0xFFF0..0x1_0020u32)
            .map(|a| (a, (a * 7) as u8))
            .collect();
        bytes.push((0x0800_0000, 0xAB));
        let mut image = image_from(&bytes, AddressingMode::Linear);
        image.record_entry(EntryPoint::Linear { eip: 0x0800_0000 });

        let encoded = encode(&image);
        for line in encoded.text.lines() {
            let raw = parse_pairs(&line[1..]).unwrap();
            let sum = raw.iter().fold(0u8, |acc, &b| acc.wrapping_add(b));
            assert_eq!(sum, 0, "line {}", line);
        }
        assert!(encoded.text.ends_with(":00000001FF\n"));
    }

    #[test]
    fn test_linear_round_trip_across_windows() {
        let mut bytes: Vec<(u32, u8)> = (0xFFF8..0x1_0008u32).map(|a| (a, a as u8)).collect();
        bytes.extend((0x2000_0000..0x2000_0003u32).map(|a| (a, 0x5A)));
        let image = image_from(&bytes, AddressingMode::Linear);

        let encoded = encode(&image);
        let decoded = decode_str(&encoded.text);
        assert!(decoded.is_ok(), "{}", decoded.diagnostics);
        assert_eq!(contents(&decoded.image), contents(&image));
        assert_eq!(decoded.image.mode(), AddressingMode::Linear);
    }

    #[test]
    fn test_segmented_round_trip() {
        let bytes: Vec<(u32, u8)> = (0x1_2340..0x1_2368u32).map(|a| (a, !(a as u8))).collect();
        let image = image_from(&bytes, AddressingMode::Segmented);

        let encoded = encode(&image);
        assert!(encoded.text.starts_with(":020000021234B6\n"));
        let decoded = decode_str(&encoded.text);
        assert!(decoded.is_ok(), "{}", decoded.diagnostics);
        assert_eq!(contents(&decoded.image), contents(&image));
        assert_eq!(decoded.image.mode(), AddressingMode::Segmented);
    }

    #[test]
    fn test_segmented_out_of_range_is_reported() {
        let image = image_from(&[(0x10_0000, 1), (0x10_0001, 2)], AddressingMode::Segmented);
        let encoded = encode(&image);
        assert_eq!(encoded.diagnostics.error_count(), 1);
    }

    #[test]
    fn test_entry_points_are_emitted() {
        let mut image = MemoryImage::new();
        image.record_entry(EntryPoint::Segment { cs: 0x0000, ip: 0x3800 });
        image.record_entry(EntryPoint::Linear { eip: 0x0800_00C1 });

        let encoded = encode(&image);
        assert_eq!(
            encoded.text,
            ":0400000300003800C1\n:04000005080000C12E\n:00000001FF\n"
        );
    }
}
