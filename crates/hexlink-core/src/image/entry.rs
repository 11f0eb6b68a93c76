//! Program entry point metadata (Start Segment / Start Linear Address)

use core::fmt;

/// Designated program start address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryPoint {
    /// 8086-style CS:IP pair from a Start Segment Address record
    Segment {
        /// Code segment register
        cs: u16,
        /// Instruction pointer register
        ip: u16,
    },
    /// Flat 32-bit EIP from a Start Linear Address record
    Linear {
        /// Extended instruction pointer
        eip: u32,
    },
}

impl EntryPoint {
    /// True for the segment variant
    pub fn is_segment(&self) -> bool {
        matches!(self, EntryPoint::Segment { .. })
    }

    /// Absolute address this entry point refers to
    pub fn absolute(&self) -> u32 {
        match *self {
            EntryPoint::Segment { cs, ip } => ((cs as u32) << 4) + ip as u32,
            EntryPoint::Linear { eip } => eip,
        }
    }
}

impl fmt::Display for EntryPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryPoint::Segment { cs, ip } => write!(f, "CS:IP {:04X}:{:04X}", cs, ip),
            EntryPoint::Linear { eip } => write!(f, "EIP 0x{:08X}", eip),
        }
    }
}

/// Entry points recorded for one image
///
/// Holds at most one entry per variant. The first recorded entry is the
/// primary one; a second entry of the other variant is kept so that a
/// conflicting file can be reported and re-encoded faithfully.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntryPoints {
    slots: [Option<EntryPoint>; 2],
}

impl EntryPoints {
    /// Record an entry point
    ///
    /// Returns `false` (and changes nothing) if an entry of the same variant
    /// already exists.
    pub fn record(&mut self, entry: EntryPoint) -> bool {
        if self.find(entry.is_segment()).is_some() {
            return false;
        }
        match self.slots {
            [None, _] => self.slots[0] = Some(entry),
            _ => self.slots[1] = Some(entry),
        }
        true
    }

    /// The first entry point recorded, if any
    pub fn primary(&self) -> Option<EntryPoint> {
        self.slots[0]
    }

    /// True when both variants were recorded
    pub fn is_conflicting(&self) -> bool {
        self.slots[1].is_some()
    }

    /// Segment entry as `(cs, ip)`
    pub fn segment(&self) -> Option<(u16, u16)> {
        match self.find(true) {
            Some(EntryPoint::Segment { cs, ip }) => Some((cs, ip)),
            _ => None,
        }
    }

    /// Linear entry EIP
    pub fn linear(&self) -> Option<u32> {
        match self.find(false) {
            Some(EntryPoint::Linear { eip }) => Some(eip),
            _ => None,
        }
    }

    /// Whether a segment entry exists
    pub fn has_segment(&self) -> bool {
        self.segment().is_some()
    }

    /// Whether a linear entry exists
    pub fn has_linear(&self) -> bool {
        self.linear().is_some()
    }

    /// Recorded entries in recording order
    pub fn iter(&self) -> impl Iterator<Item = EntryPoint> + '_ {
        self.slots.iter().flatten().copied()
    }

    fn find(&self, segment: bool) -> Option<EntryPoint> {
        self.iter().find(|e| e.is_segment() == segment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeat_is_ignored() {
        let mut entries = EntryPoints::default();
        assert!(entries.record(EntryPoint::Linear { eip: 0x100 }));
        assert!(!entries.record(EntryPoint::Linear { eip: 0x200 }));
        assert_eq!(entries.linear(), Some(0x100));
        assert!(!entries.is_conflicting());
    }

    #[test]
    fn test_both_variants_retained() {
        let mut entries = EntryPoints::default();
        assert!(entries.record(EntryPoint::Segment { cs: 0x1000, ip: 0x10 }));
        assert!(entries.record(EntryPoint::Linear { eip: 0x8000 }));

        assert!(entries.has_segment());
        assert!(entries.has_linear());
        assert!(entries.is_conflicting());
        assert_eq!(
            entries.primary(),
            Some(EntryPoint::Segment { cs: 0x1000, ip: 0x10 })
        );
    }

    #[test]
    fn test_absolute_address() {
        assert_eq!(EntryPoint::Segment { cs: 0x1234, ip: 0x0010 }.absolute(), 0x12350);
        assert_eq!(EntryPoint::Linear { eip: 0xDEAD_BEEF }.absolute(), 0xDEAD_BEEF);
    }
}
