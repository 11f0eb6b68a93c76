//! Transport layer abstraction for uploads
//!
//! This module provides a unified interface for serial, TCP and in-memory
//! transports. Uploads only ever write, so the interface is write and flush.

use crate::error::{Result, TransportError};

/// Default baud rate when neither the command line nor the profile sets one
pub const DEFAULT_BAUD: u32 = 115_200;

/// Transport trait for writing bytes
pub trait Transport {
    /// Write all bytes to the transport
    fn write(&mut self, data: &[u8]) -> Result<()>;

    /// Flush any buffered data
    fn flush(&mut self) -> Result<()>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn write(&mut self, data: &[u8]) -> Result<()> {
        (**self).write(data)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }
}

pub mod serial {
    //! Serial port transport implementation

    use super::*;
    use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
    use std::io::Write;
    use std::time::Duration;

    /// Serial port transport
    pub struct SerialTransport {
        port: Box<dyn SerialPort>,
    }

    impl SerialTransport {
        /// Open a serial port at 8N1 without flow control
        ///
        /// `None` selects [`DEFAULT_BAUD`].
        pub fn open(device: &str, baud: Option<u32>) -> Result<Self> {
            let baud_rate = baud.unwrap_or(DEFAULT_BAUD);

            let port = serialport::new(device, baud_rate)
                .data_bits(DataBits::Eight)
                .parity(Parity::None)
                .stop_bits(StopBits::One)
                .flow_control(FlowControl::None)
                .timeout(Duration::from_secs(5))
                .open()?;

            log::info!("Opened serial port {} at {} baud", device, baud_rate);

            Ok(Self { port })
        }
    }

    impl Transport for SerialTransport {
        fn write(&mut self, data: &[u8]) -> Result<()> {
            self.port.write_all(data)?;
            Ok(())
        }

        fn flush(&mut self) -> Result<()> {
            self.port.flush()?;
            Ok(())
        }
    }
}

pub mod tcp {
    //! TCP socket transport for serial-over-network bridges

    use super::*;
    use std::io::Write;
    use std::net::TcpStream;
    use std::time::Duration;

    /// TCP socket transport
    pub struct TcpTransport {
        stream: TcpStream,
    }

    impl TcpTransport {
        /// Connect to a bridge at the specified host and port
        pub fn connect(host: &str, port: u16) -> Result<Self> {
            let addr = format!("{}:{}", host, port);
            log::info!("Connecting to {}", addr);

            let stream = TcpStream::connect(&addr)
                .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;

            stream.set_nodelay(true).map_err(|e| {
                TransportError::ConnectionFailed(format!("Failed to set TCP_NODELAY: {}", e))
            })?;
            stream
                .set_write_timeout(Some(Duration::from_secs(5)))
                .map_err(|e| {
                    TransportError::ConnectionFailed(format!("Failed to set write timeout: {}", e))
                })?;

            log::info!("Connected to {}", addr);

            Ok(Self { stream })
        }
    }

    impl Transport for TcpTransport {
        fn write(&mut self, data: &[u8]) -> Result<()> {
            self.stream.write_all(data)?;
            Ok(())
        }

        fn flush(&mut self) -> Result<()> {
            self.stream.flush()?;
            Ok(())
        }
    }
}

/// Transport that keeps everything written to it
///
/// Used for dry runs and tests. An optional write limit makes it fail like a
/// disconnected port once that many bytes have been accepted.
#[derive(Debug, Clone, Default)]
pub struct MemoryTransport {
    data: Vec<u8>,
    writes: usize,
    flushes: usize,
    limit: Option<usize>,
}

impl MemoryTransport {
    /// Create an empty transport with no write limit
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a transport that refuses writes past `limit` bytes
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            ..Self::default()
        }
    }

    /// Everything written so far
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Number of successful write calls
    pub fn writes(&self) -> usize {
        self.writes
    }

    /// Number of flush calls
    pub fn flushes(&self) -> usize {
        self.flushes
    }
}

impl Transport for MemoryTransport {
    fn write(&mut self, data: &[u8]) -> Result<()> {
        if let Some(limit) = self.limit {
            if self.data.len() + data.len() > limit {
                return Err(TransportError::Closed);
            }
        }
        self.data.extend_from_slice(data);
        self.writes += 1;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.flushes += 1;
        Ok(())
    }
}
