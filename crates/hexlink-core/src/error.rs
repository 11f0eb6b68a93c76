//! Error types for hexlink-core
//!
//! Malformed HEX input never produces an `Error`: the decoder reports it
//! through [`Diagnostics`](crate::diag::Diagnostics) instead. This type covers
//! the conditions that stop an operation outright, mostly during upload.

use core::fmt;

/// Core error type - no_std compatible, Copy for efficiency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    // Upload preconditions
    /// The image failed to decode cleanly or did not fit the target
    ImageNotReady,
    /// Image needs more space than the target provides
    CapacityExceeded {
        /// Address-derived image size in bytes
        size: u64,
        /// Capacity declared for the target
        capacity: u64,
    },
    /// Size header does not fit into one burst
    SizeHeaderOverflow {
        /// Size value that had to be encoded
        size: u64,
        /// Width of the header in bytes
        bytes_per_burst: usize,
    },
    /// The upload was already streamed (or a stream attempt was interrupted)
    AlreadyStreamed,

    // Transport errors
    /// The sink failed to accept a byte
    TransportError,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ImageNotReady => write!(f, "image is not ready for upload"),
            Self::CapacityExceeded { size, capacity } => write!(
                f,
                "unable to write {} bytes in the available space of {} bytes",
                size, capacity
            ),
            Self::SizeHeaderOverflow {
                size,
                bytes_per_burst,
            } => write!(
                f,
                "image size {} does not fit into a {}-byte size header",
                size, bytes_per_burst
            ),
            Self::AlreadyStreamed => write!(f, "upload has already been streamed"),
            Self::TransportError => write!(f, "transport write failed"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// Result type alias using the core Error type
pub type Result<T> = core::result::Result<T, Error>;
