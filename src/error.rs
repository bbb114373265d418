//! # Error Types
//!
//! Custom error types for the MMDVM host link using `thiserror`.
//!
//! Wire-level NAK codes live in [`crate::mmdvm::protocol::ErrorCode`]; this type
//! covers everything around the protocol core (configuration, serial I/O,
//! host-side decoding).

use thiserror::Error;

/// Main error type for the host link
#[derive(Debug, Error)]
pub enum HostLinkError {
    /// MMDVM protocol errors (malformed replies on the host side)
    #[error("MMDVM protocol error: {0}")]
    Protocol(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// Serial port errors
    #[error("Serial error: {0}")]
    Serial(String),

    /// None of the candidate serial devices could be opened
    #[error("No serial device found (tried: {0})")]
    SerialPortNotFound(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for the host link
pub type Result<T> = std::result::Result<T, HostLinkError>;
