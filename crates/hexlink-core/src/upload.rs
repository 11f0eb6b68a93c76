//! Size-prefixed upload of a decoded image
//!
//! An upload writes a size header exactly one burst wide, followed by every
//! stored byte in ascending address order:
//!
//! ```text
//! [ size (bytes_per_burst bytes, big-endian) ][ image bytes ... ]
//! ```
//!
//! Capacity and header-width checks happen before the first byte is written.
//! Transport failures stop the stream and are returned as-is; nothing is
//! retried.

use alloc::vec;
use alloc::vec::Vec;

use crate::decode::Decoded;
use crate::error::{Error, Result};
use crate::image::MemoryImage;

/// Destination of an upload
///
/// Implementations decide how bytes are grouped on the wire; the streamer
/// only needs the burst width to size the header.
pub trait ByteSink {
    /// Number of bytes the sink transfers per burst
    fn bytes_per_burst(&self) -> usize;

    /// Queue a single byte for transfer
    fn buffered_write(&mut self, byte: u8) -> Result<()>;
}

impl<S: ByteSink + ?Sized> ByteSink for &mut S {
    fn bytes_per_burst(&self) -> usize {
        (**self).bytes_per_burst()
    }

    fn buffered_write(&mut self, byte: u8) -> Result<()> {
        (**self).buffered_write(byte)
    }
}

/// Callback for progress reporting during an upload
pub trait UploadProgress {
    /// Called once the header is about to be written
    fn started(&mut self, total_bytes: usize);

    /// Called before each image byte with `written / total * 100`, and once
    /// with exactly 100 after the last byte
    fn percent(&mut self, percent: f64);

    /// Called when every byte has been handed to the sink
    fn complete(&mut self, stats: &UploadStats);
}

/// A no-op progress reporter
pub struct NoProgress;

impl UploadProgress for NoProgress {
    fn started(&mut self, _total_bytes: usize) {}
    fn percent(&mut self, _percent: f64) {}
    fn complete(&mut self, _stats: &UploadStats) {}
}

/// Byte counts of a finished upload
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UploadStats {
    /// Bytes in the size header
    pub header_bytes: usize,
    /// Image bytes streamed after the header
    pub payload_bytes: usize,
}

/// Upload lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadState {
    /// Image cannot be uploaded, with the reason
    NotReady(Error),
    /// Validated, nothing written yet
    Ready,
    /// Header or image bytes are being written
    Streaming,
    /// All bytes handed to the sink
    Done,
}

/// One upload of one image
#[derive(Debug)]
pub struct Upload<'a> {
    image: &'a MemoryImage,
    state: UploadState,
}

impl<'a> Upload<'a> {
    /// Prepare an upload of a decoded image
    ///
    /// The upload is `NotReady` if decoding reported errors or if the image
    /// extends past `capacity` bytes.
    pub fn new(decoded: &'a Decoded, capacity: u64) -> Self {
        if !decoded.is_ok() {
            log::error!(
                "There were {} errors while parsing the hex file",
                decoded.diagnostics.error_count()
            );
            return Self {
                image: &decoded.image,
                state: UploadState::NotReady(Error::ImageNotReady),
            };
        }
        Self::from_image(&decoded.image, capacity)
    }

    /// Prepare an upload of an image built without a decode session
    pub fn from_image(image: &'a MemoryImage, capacity: u64) -> Self {
        let size = image.end_address();
        let state = if size > capacity {
            let e = Error::CapacityExceeded { size, capacity };
            log::error!("{}", e);
            UploadState::NotReady(e)
        } else {
            UploadState::Ready
        };
        Self { image, state }
    }

    /// Current state
    pub fn state(&self) -> UploadState {
        self.state
    }

    /// True while nothing has been written and the image is valid
    pub fn is_ready(&self) -> bool {
        self.state == UploadState::Ready
    }

    /// Value carried by the size header: the number of image bytes
    ///
    /// This counts stored bytes, not the address span. For a sparse image it
    /// is smaller than [`MemoryImage::end_address`], so a bootloader that
    /// expects the highest address + 1 will see a short length.
    pub fn size(&self) -> u64 {
        self.image.len() as u64
    }

    /// Write the header and the image to `sink`
    pub fn stream<S, P>(&mut self, sink: &mut S, progress: &mut P) -> Result<UploadStats>
    where
        S: ByteSink + ?Sized,
        P: UploadProgress + ?Sized,
    {
        match self.state {
            UploadState::NotReady(e) => return Err(e),
            UploadState::Streaming | UploadState::Done => return Err(Error::AlreadyStreamed),
            UploadState::Ready => {}
        }

        let bytes_per_burst = sink.bytes_per_burst();
        let size = self.size();
        let header = size_header(size, bytes_per_burst).ok_or(Error::SizeHeaderOverflow {
            size,
            bytes_per_burst,
        })?;

        self.state = UploadState::Streaming;
        let total = self.image.len();
        progress.started(total);
        log::debug!(
            "Streaming {} bytes behind a {}-byte size header",
            total,
            header.len()
        );

        for &b in &header {
            sink.buffered_write(b)?;
        }

        for (written, (_, value)) in self.image.iter().enumerate() {
            progress.percent(written as f64 / total as f64 * 100.0);
            sink.buffered_write(value)?;
        }
        progress.percent(100.0);

        let stats = UploadStats {
            header_bytes: header.len(),
            payload_bytes: total,
        };
        self.state = UploadState::Done;
        progress.complete(&stats);
        log::info!("Uploaded {} bytes", total);

        Ok(stats)
    }
}

/// Encode `size` as exactly `width` big-endian bytes
///
/// Returns `None` if the value needs more than `width` bytes.
pub fn size_header(size: u64, width: usize) -> Option<Vec<u8>> {
    let significant = 8 - size.leading_zeros() as usize / 8;
    if significant > width {
        return None;
    }
    let mut header = vec![0u8; width];
    header[width - significant..].copy_from_slice(&size.to_be_bytes()[8 - significant..]);
    Some(header)
}
