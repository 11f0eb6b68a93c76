//! Burst framing on top of a transport
//!
//! Bytes handed to a [`BurstSink`] are queued until a full burst is
//! available and then written as one frame:
//!
//! ```text
//! [ sync_byte x sync_byte_amount ][ preamble ][ payload (bytes_per_burst) ]
//! ```
//!
//! The last frame of an upload may carry a shorter payload; it is written by
//! [`BurstSink::finish`].

use hexlink_core::config::DeviceProfile;
use hexlink_core::upload::ByteSink;

use crate::error::TransportError;
use crate::transport::Transport;

/// Framing parameters of a burst
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BurstFormat {
    /// Byte repeated at the start of every frame
    pub sync_byte: u8,
    /// Number of sync bytes per frame
    pub sync_byte_amount: usize,
    /// Byte following the sync bytes
    pub preamble: u8,
    /// Payload bytes per frame
    pub bytes_per_burst: usize,
}

impl From<&DeviceProfile> for BurstFormat {
    fn from(profile: &DeviceProfile) -> Self {
        Self {
            sync_byte: profile.sync_byte,
            sync_byte_amount: profile.sync_len(),
            preamble: profile.preamble,
            bytes_per_burst: profile.burst_len(),
        }
    }
}

/// [`ByteSink`] that frames bytes into bursts
pub struct BurstSink<T: Transport> {
    transport: T,
    format: BurstFormat,
    frame: Vec<u8>,
    queued: usize,
    bursts: usize,
    error: Option<TransportError>,
}

impl<T: Transport> BurstSink<T> {
    /// Create a sink writing frames of `format` to `transport`
    pub fn new(transport: T, format: BurstFormat) -> Self {
        let header_len = format.sync_byte_amount + 1;
        let mut frame = Vec::with_capacity(header_len + format.bytes_per_burst);
        frame.resize(format.sync_byte_amount, format.sync_byte);
        frame.push(format.preamble);
        Self {
            transport,
            format,
            frame,
            queued: 0,
            bursts: 0,
            error: None,
        }
    }

    /// Create a sink using the framing of a device profile
    pub fn from_profile(transport: T, profile: &DeviceProfile) -> Self {
        Self::new(transport, BurstFormat::from(profile))
    }

    /// Framing parameters
    pub fn format(&self) -> BurstFormat {
        self.format
    }

    /// Number of frames written so far
    pub fn bursts(&self) -> usize {
        self.bursts
    }

    /// Transport error that stopped the sink, if any
    pub fn error(&self) -> Option<&TransportError> {
        self.error.as_ref()
    }

    /// Write a trailing partial burst, flush the transport and return it
    pub fn finish(mut self) -> Result<T, TransportError> {
        if let Some(e) = self.error.take() {
            return Err(e);
        }
        if self.queued > 0 {
            self.send_burst()?;
        }
        self.transport.flush()?;
        log::debug!("Wrote {} bursts", self.bursts);
        Ok(self.transport)
    }

    fn send_burst(&mut self) -> Result<(), TransportError> {
        log::trace!("Burst {}: {:02X?}", self.bursts, &self.frame);
        self.transport.write(&self.frame)?;
        self.frame.truncate(self.format.sync_byte_amount + 1);
        self.queued = 0;
        self.bursts += 1;
        Ok(())
    }
}

impl<T: Transport> ByteSink for BurstSink<T> {
    fn bytes_per_burst(&self) -> usize {
        self.format.bytes_per_burst
    }

    fn buffered_write(&mut self, byte: u8) -> hexlink_core::Result<()> {
        if self.error.is_some() {
            return Err(hexlink_core::Error::TransportError);
        }

        self.frame.push(byte);
        self.queued += 1;
        if self.queued < self.format.bytes_per_burst {
            return Ok(());
        }

        self.send_burst().map_err(|e| {
            log::error!("Burst {} failed: {}", self.bursts, e);
            self.error = Some(e);
            hexlink_core::Error::TransportError
        })
    }
}
