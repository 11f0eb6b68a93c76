//! hexlink-serial - Transports and burst framing for uploads
//!
//! This crate connects the upload streamer from `hexlink-core` to a real
//! target: a serial port, or a TCP bridge that forwards to one.
//!
//! # Supported Transports
//!
//! - Serial port: `/dev/ttyUSB0`, `/dev/ttyACM0`, `COM1`, etc.
//! - TCP socket: `tcp:host:port`
//!
//! # Example
//!
//! ```no_run
//! use hexlink_core::config::DeviceDatabase;
//! use hexlink_core::{decode_file, NoProgress, Upload};
//! use hexlink_serial::{BurstSink, SerialTransport};
//!
//! let mut db = DeviceDatabase::new();
//! db.load_dir("devices".as_ref())?;
//! let profile = db.get("avr-boot")?;
//!
//! let decoded = decode_file("firmware.hex")?;
//! let mut upload = Upload::new(&decoded, profile.max_size);
//!
//! let transport = SerialTransport::open("/dev/ttyUSB0", profile.baud_rate)?;
//! let mut sink = BurstSink::from_profile(transport, profile);
//! upload.stream(&mut sink, &mut NoProgress)?;
//! sink.finish()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod error;
pub mod sink;
pub mod transport;

pub use error::{Result, TransportError};
pub use sink::{BurstFormat, BurstSink};
pub use transport::serial::SerialTransport;
pub use transport::tcp::TcpTransport;
pub use transport::{MemoryTransport, Transport, DEFAULT_BAUD};

/// Where an upload is sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Connection {
    /// Serial port connection
    Serial {
        /// Device path (e.g., "/dev/ttyUSB0" or "COM1")
        device: String,
    },
    /// TCP socket connection
    Tcp {
        /// Hostname or IP address
        host: String,
        /// Port number
        port: u16,
    },
}

impl Connection {
    /// Parse a port string
    ///
    /// Formats:
    /// - `tcp:host:port` - TCP connection
    /// - anything else - serial device path
    pub fn parse(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Err(TransportError::InvalidPort("empty port name".to_string()));
        }

        if let Some(addr) = s.strip_prefix("tcp:") {
            let (host, port_str) = addr
                .rsplit_once(':')
                .ok_or_else(|| TransportError::InvalidPort(format!("missing port in {}", s)))?;
            if host.is_empty() {
                return Err(TransportError::InvalidPort(format!("missing host in {}", s)));
            }
            let port = port_str.parse().map_err(|_| {
                TransportError::InvalidPort(format!("invalid TCP port: {}", port_str))
            })?;
            Ok(Connection::Tcp {
                host: host.to_string(),
                port,
            })
        } else {
            Ok(Connection::Serial {
                device: s.to_string(),
            })
        }
    }

    /// Open the connection
    ///
    /// `baud` only applies to serial ports.
    pub fn open(&self, baud: Option<u32>) -> Result<Box<dyn Transport>> {
        match self {
            Connection::Serial { device } => Ok(Box::new(SerialTransport::open(device, baud)?)),
            Connection::Tcp { host, port } => Ok(Box::new(TcpTransport::connect(host, *port)?)),
        }
    }
}

impl std::fmt::Display for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Connection::Serial { device } => write!(f, "{}", device),
            Connection::Tcp { host, port } => write!(f, "tcp:{}:{}", host, port),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_serial() {
        assert_eq!(
            Connection::parse("/dev/ttyUSB0").unwrap(),
            Connection::Serial {
                device: "/dev/ttyUSB0".to_string()
            }
        );
    }

    #[test]
    fn test_parse_tcp() {
        let conn = Connection::parse("tcp:localhost:2217").unwrap();
        assert_eq!(
            conn,
            Connection::Tcp {
                host: "localhost".to_string(),
                port: 2217
            }
        );
        assert_eq!(conn.to_string(), "tcp:localhost:2217");
    }

    #[test]
    fn test_parse_invalid() {
        assert!(Connection::parse("").is_err());
        assert!(Connection::parse("tcp:localhost").is_err());
        assert!(Connection::parse("tcp::2217").is_err());
        assert!(Connection::parse("tcp:localhost:http").is_err());
    }
}
