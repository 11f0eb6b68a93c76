//! Sparse address-space model built by the decoder
//!
//! A [`MemoryImage`] maps 32-bit absolute addresses to single bytes and keeps
//! the addressing mode and entry points that came with them. Iteration is
//! always in ascending address order, which both the encoder and the upload
//! streamer depend on.

mod entry;

pub use entry::{EntryPoint, EntryPoints};

use alloc::collections::BTreeMap;
use core::fmt;
use core::ops::RangeInclusive;

use crate::diag::Diagnostics;
use crate::hex;

/// How upper address bits are expressed in the record stream
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum AddressingMode {
    /// Extended Linear Address records, base = value << 16
    #[default]
    Linear,
    /// Extended Segment Address records, base = value << 4
    Segmented,
}

impl fmt::Display for AddressingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressingMode::Linear => write!(f, "linear"),
            AddressingMode::Segmented => write!(f, "segmented"),
        }
    }
}

/// Result of storing one byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Address was empty and now holds the byte
    Inserted,
    /// Address already held the same byte
    Duplicate,
    /// Address already held a different byte, which was kept
    Conflict {
        /// The byte that remains stored
        existing: u8,
    },
}

/// Sparse memory image
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryImage {
    data: BTreeMap<u32, u8>,
    mode: AddressingMode,
    entry: EntryPoints,
}

impl MemoryImage {
    /// Create an empty image in linear mode
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty image using the given addressing mode
    pub fn with_mode(mode: AddressingMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    /// Store a byte unless the address is already occupied
    ///
    /// An occupied address is never overwritten.
    pub fn write_byte(&mut self, address: u32, value: u8) -> WriteOutcome {
        match self.data.get(&address) {
            None => {
                self.data.insert(address, value);
                WriteOutcome::Inserted
            }
            Some(&existing) if existing == value => WriteOutcome::Duplicate,
            Some(&existing) => WriteOutcome::Conflict { existing },
        }
    }

    /// Store consecutive bytes starting at `start`, reporting overlaps
    ///
    /// Duplicates become warnings and conflicts become errors in `diag`. The
    /// address advances for every byte, conflicting or not. Returns the
    /// address following the last byte.
    pub fn write_bytes(&mut self, start: u32, bytes: &[u8], diag: &mut Diagnostics) -> u32 {
        let mut address = start;
        for &value in bytes {
            match self.write_byte(address, value) {
                WriteOutcome::Inserted => {}
                WriteOutcome::Duplicate => diag.add_warning(alloc::format!(
                    "Location 0x{} already contains data 0x{}",
                    hex::dword(address),
                    hex::byte(value)
                )),
                WriteOutcome::Conflict { existing } => diag.add_error(alloc::format!(
                    "Couldn't add 0x{} @ 0x{}; already contains 0x{}",
                    hex::byte(value),
                    hex::dword(address),
                    hex::byte(existing)
                )),
            }
            address = address.wrapping_add(1);
        }
        address
    }

    /// Byte stored at `address`
    pub fn get(&self, address: u32) -> Option<u8> {
        self.data.get(&address).copied()
    }

    /// Number of stored bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True when no byte is stored
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Stored bytes in ascending address order
    pub fn iter(&self) -> impl Iterator<Item = (u32, u8)> + '_ {
        self.data.iter().map(|(&a, &v)| (a, v))
    }

    /// Lowest stored address
    pub fn first_address(&self) -> Option<u32> {
        self.data.keys().next().copied()
    }

    /// Highest stored address
    pub fn last_address(&self) -> Option<u32> {
        self.data.keys().next_back().copied()
    }

    /// Inclusive range spanned by the stored bytes
    pub fn address_range(&self) -> Option<RangeInclusive<u32>> {
        Some(self.first_address()?..=self.last_address()?)
    }

    /// Address-derived size: one past the highest stored address
    ///
    /// This is the amount of target memory the image occupies when loaded
    /// from address 0, gaps included.
    pub fn end_address(&self) -> u64 {
        self.last_address().map_or(0, |a| a as u64 + 1)
    }

    /// Number of contiguous runs of bytes
    pub fn segment_count(&self) -> usize {
        let mut count = 0;
        let mut previous: Option<u32> = None;
        for &address in self.data.keys() {
            if previous.map_or(true, |p| p.wrapping_add(1) != address) {
                count += 1;
            }
            previous = Some(address);
        }
        count
    }

    /// Addressing mode used when encoding
    pub fn mode(&self) -> AddressingMode {
        self.mode
    }

    /// Change the addressing mode used when encoding
    pub fn set_mode(&mut self, mode: AddressingMode) {
        self.mode = mode;
    }

    /// Recorded entry points
    pub fn entry_points(&self) -> &EntryPoints {
        &self.entry
    }

    /// Record an entry point; `false` if one of the same kind exists
    pub fn record_entry(&mut self, entry: EntryPoint) -> bool {
        self.entry.record(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_write_warns_once() {
        let mut image = MemoryImage::new();
        let mut diag = Diagnostics::new();
        image.write_bytes(0x10, &[0xAA], &mut diag);
        image.write_bytes(0x10, &[0xAA], &mut diag);

        assert_eq!(diag.warning_count(), 1);
        assert_eq!(diag.error_count(), 0);
        assert_eq!(image.get(0x10), Some(0xAA));
        assert_eq!(image.len(), 1);
    }

    #[test]
    fn test_conflict_keeps_original() {
        let mut image = MemoryImage::new();
        let mut diag = Diagnostics::new();
        image.write_bytes(0x10, &[0xAA], &mut diag);
        image.write_bytes(0x10, &[0x55], &mut diag);

        assert_eq!(diag.error_count(), 1);
        assert_eq!(diag.warning_count(), 0);
        assert_eq!(image.get(0x10), Some(0xAA));
        assert_eq!(
            diag.errors()[0],
            "1 Error: Couldn't add 0x55 @ 0x00000010; already contains 0xAA"
        );
    }

    #[test]
    fn test_cursor_advances_past_conflict() {
        let mut image = MemoryImage::new();
        let mut diag = Diagnostics::new();
        image.write_byte(0x01, 0xFF);
        let next = image.write_bytes(0x00, &[0x10, 0x11, 0x12], &mut diag);

        assert_eq!(next, 0x03);
        assert_eq!(image.get(0x00), Some(0x10));
        assert_eq!(image.get(0x01), Some(0xFF));
        assert_eq!(image.get(0x02), Some(0x12));
    }

    #[test]
    fn test_ranges_and_segments() {
        let mut image = MemoryImage::new();
        assert_eq!(image.end_address(), 0);
        assert_eq!(image.address_range(), None);

        for a in [0x100u32, 0x101, 0x102, 0x200] {
            image.write_byte(a, 0);
        }
        assert_eq!(image.address_range(), Some(0x100..=0x200));
        assert_eq!(image.end_address(), 0x201);
        assert_eq!(image.segment_count(), 2);
    }

    #[test]
    fn test_iteration_is_ascending() {
        let mut image = MemoryImage::new();
        image.write_byte(0x30, 3);
        image.write_byte(0x10, 1);
        image.write_byte(0x20, 2);
        let addresses: alloc::vec::Vec<u32> = image.iter().map(|(a, _)| a).collect();
        assert_eq!(addresses, [0x10, 0x20, 0x30]);
    }
}
