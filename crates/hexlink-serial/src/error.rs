//! Error types for transports

use thiserror::Error;

/// Transport errors
#[derive(Debug, Error)]
pub enum TransportError {
    /// Failed to connect to the target or bridge
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Port specification could not be parsed
    #[error("Invalid port: {0}")]
    InvalidPort(String),

    /// I/O error during communication
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serial port error
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// The transport refuses further writes
    #[error("Transport closed")]
    Closed,
}

/// Result type for transport operations
pub type Result<T> = core::result::Result<T, TransportError>;
