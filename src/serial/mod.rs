//! # Serial Communication Module
//!
//! Carries MMDVM frames between the modem and its host over a USB or UART
//! serial device.
//!
//! This module handles:
//! - Opening the serial port (8N1, no flow control)
//! - Reading raw bytes for the frame reassembler
//! - Writing outbound frames, flushing when the frame asks for it

pub mod port_trait;

use crate::error::{HostLinkError, Result};
use port_trait::{SerialPortIO, TokioSerialPort};
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info, trace, warn};

/// Default host link baud rate
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Default device paths to try (in order of preference)
pub const DEFAULT_DEVICE_PATHS: &[&str] = &[
    "/dev/ttyACM0", // USB CDC devices
    "/dev/ttyUSB0", // USB-to-serial adapters
];

/// Device paths to try for a configured port, configured one first
fn candidate_paths(configured: &str) -> Vec<&str> {
    let mut paths = vec![configured];
    paths.extend(DEFAULT_DEVICE_PATHS.iter().copied().filter(|p| *p != configured));
    paths
}

/// Serial side of the host link
pub struct HostSerial {
    /// Serial port handle
    port: Box<dyn SerialPortIO>,
    /// Device path (e.g., /dev/ttyACM0)
    device_path: String,
}

impl std::fmt::Debug for HostSerial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostSerial")
            .field("device_path", &self.device_path)
            .finish_non_exhaustive()
    }
}

impl HostSerial {
    /// Open a specific device
    ///
    /// # Errors
    ///
    /// Returns [`HostLinkError::Serial`] if the device cannot be opened
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use mmdvm_hostlink::serial::HostSerial;
    ///
    /// fn main() -> anyhow::Result<()> {
    ///     let serial = HostSerial::open("/dev/ttyACM0", 115_200)?;
    ///     println!("{}", serial.device_path());
    ///     Ok(())
    /// }
    /// ```
    pub fn open(path: &str, baud_rate: u32) -> Result<Self> {
        let port = Self::open_port(path, baud_rate)?;
        info!("Opened serial device {} at {} baud", path, baud_rate);
        Ok(Self::from_port(Box::new(TokioSerialPort::new(port)), path))
    }

    /// Try each path in turn and keep the first one that opens
    ///
    /// # Errors
    ///
    /// Returns [`HostLinkError::SerialPortNotFound`] listing every path tried
    pub fn open_with_paths(paths: &[&str], baud_rate: u32) -> Result<Self> {
        for path in paths {
            debug!("Trying to open serial port: {}", path);

            match Self::open(path, baud_rate) {
                Ok(serial) => return Ok(serial),
                Err(e) => {
                    warn!("Failed to open {}: {}", path, e);
                    continue;
                }
            }
        }

        Err(HostLinkError::SerialPortNotFound(paths.join(", ")))
    }

    /// Open the configured device, falling back to the default paths
    ///
    /// The configured path is tried first; the defaults follow in order,
    /// skipping a duplicate of the configured one.
    ///
    /// # Errors
    ///
    /// Returns [`HostLinkError::SerialPortNotFound`] listing every path tried
    pub fn open_or_detect(path: &str, baud_rate: u32) -> Result<Self> {
        Self::open_with_paths(&candidate_paths(path), baud_rate)
    }

    fn open_port(path: &str, baud_rate: u32) -> Result<tokio_serial::SerialStream> {
        let port = tokio_serial::new(path, baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(|e| HostLinkError::Serial(format!("Failed to open {}: {}", path, e)))?;

        Ok(port)
    }

    /// Wrap an already opened port
    pub fn from_port(port: Box<dyn SerialPortIO>, device_path: &str) -> Self {
        Self {
            port,
            device_path: device_path.to_string(),
        }
    }

    /// Read the bytes currently available
    ///
    /// Returns `Ok(0)` when the device has gone away.
    pub async fn read_available(&mut self, buf: &mut [u8]) -> Result<usize> {
        let n = self
            .port
            .read(buf)
            .await
            .map_err(|e| HostLinkError::Serial(format!("Failed to read: {}", e)))?;

        if n > 0 {
            trace!("Received {} bytes", n);
        }
        Ok(n)
    }

    /// Write one outbound frame
    pub async fn send_frame(&mut self, frame: &[u8], flush: bool) -> Result<()> {
        self.port
            .write_all(frame)
            .await
            .map_err(|e| HostLinkError::Serial(format!("Failed to write frame: {}", e)))?;

        if flush {
            self.port
                .flush()
                .await
                .map_err(|e| HostLinkError::Serial(format!("Failed to flush serial port: {}", e)))?;
        }

        trace!("Sent frame ({} bytes, flush={})", frame.len(), flush);
        Ok(())
    }

    /// Path of the opened device
    pub fn device_path(&self) -> &str {
        &self.device_path
    }
}
