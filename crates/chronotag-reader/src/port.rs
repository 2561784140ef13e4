//! Device handle abstraction and serial implementation.
//!
//! [`ReaderPort`] is the seam between the pipeline and the physical
//! device: the acquisition loop, the inventory controller, and the tests
//! all talk to it rather than to the serialport crate directly. The mock
//! implementation lives in [`crate::mock`].

use crate::config::ConnectionConfig;
use crate::error::{ReaderError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{Read, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, trace};

/// Byte-level operations the pipeline needs from a reader device.
pub trait ReaderPort: Send {
    /// Number of bytes ready to read without blocking.
    fn bytes_available(&mut self) -> Result<usize>;

    /// Read into `buf`, returning the number of bytes read.
    fn read_bytes(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Write a complete command frame.
    fn write_all_bytes(&mut self, data: &[u8]) -> Result<()>;

    /// Discard anything pending in the device's input buffer.
    fn clear_input(&mut self) -> Result<()>;
}

/// The device handle as shared between the control path and the
/// acquisition loop.
///
/// The mutex serializes byte-level access; it does not serialize the
/// protocol-level command sequences issued from the two paths.
pub type SharedPort = Arc<Mutex<Box<dyn ReaderPort>>>;

/// Serial implementation over a real device.
pub struct SerialReaderPort {
    inner: Box<dyn serialport::SerialPort>,
}

impl fmt::Debug for SerialReaderPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerialReaderPort").finish_non_exhaustive()
    }
}

impl SerialReaderPort {
    /// Open the serial device described by `config`: 8 data bits, no
    /// parity, one stop bit, hardware flow control (if configured), 2 s
    /// read/write timeout.
    ///
    /// # Errors
    /// Returns `ReaderError::Connection` carrying the underlying cause;
    /// the caller decides whether to retry.
    pub fn open(config: &ConnectionConfig) -> Result<Self> {
        let flow_control = if config.hardware_flow_control {
            serialport::FlowControl::Hardware
        } else {
            serialport::FlowControl::None
        };

        let inner = serialport::new(&config.port, config.baud_rate)
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .flow_control(flow_control)
            .timeout(Duration::from_millis(config.timeout_ms))
            .open()
            .map_err(|source| ReaderError::connection(&config.port, source))?;

        debug!(port = %config.port, baud = config.baud_rate, "serial port opened");
        Ok(Self { inner })
    }
}

impl ReaderPort for SerialReaderPort {
    fn bytes_available(&mut self) -> Result<usize> {
        Ok(self.inner.bytes_to_read()? as usize)
    }

    fn read_bytes(&mut self, buf: &mut [u8]) -> Result<usize> {
        let n = self.inner.read(buf)?;
        trace!(bytes = n, "serial read");
        Ok(n)
    }

    fn write_all_bytes(&mut self, data: &[u8]) -> Result<()> {
        self.inner.write_all(data)?;
        self.inner.flush()?;
        trace!(bytes = data.len(), "serial write");
        Ok(())
    }

    fn clear_input(&mut self) -> Result<()> {
        self.inner.clear(serialport::ClearBuffer::Input)?;
        Ok(())
    }
}

/// Availability of an enumerated serial port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortStatus {
    /// The port could be opened.
    Connected,

    /// The port exists but could not be opened (busy or gone).
    Disconnected,
}

impl fmt::Display for PortStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PortStatus::Connected => write!(f, "Connected"),
            PortStatus::Disconnected => write!(f, "Disconnected"),
        }
    }
}

/// One enumerated serial port candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerialPortStatus {
    /// Device path.
    pub device: String,

    /// Human-readable description from the port type (USB product name
    /// where available).
    pub description: String,

    /// Probe result.
    pub status: PortStatus,
}

/// Enumerate serial ports and probe each for availability.
///
/// Purely informational: each candidate is opened briefly and closed
/// again; the active connection (if any) is not touched. Probing a port
/// that is held open elsewhere reports it `Disconnected`.
///
/// # Errors
/// Returns `ReaderError::Serial` only if enumeration itself fails.
pub fn list_serial_ports() -> Result<Vec<SerialPortStatus>> {
    let mut ports = Vec::new();

    for info in serialport::available_ports()? {
        let description = describe_port_type(&info.port_type);
        let status = match serialport::new(&info.port_name, 9600)
            .timeout(Duration::from_millis(50))
            .open()
        {
            Ok(_) => PortStatus::Connected,
            Err(_) => PortStatus::Disconnected,
        };

        ports.push(SerialPortStatus {
            device: info.port_name,
            description,
            status,
        });
    }

    Ok(ports)
}

fn describe_port_type(port_type: &serialport::SerialPortType) -> String {
    match port_type {
        serialport::SerialPortType::UsbPort(usb) => usb
            .product
            .clone()
            .unwrap_or_else(|| format!("USB device {:04x}:{:04x}", usb.vid, usb.pid)),
        serialport::SerialPortType::BluetoothPort => "Bluetooth serial".to_string(),
        serialport::SerialPortType::PciPort => "PCI serial".to_string(),
        serialport::SerialPortType::Unknown => "Unknown".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_status_display() {
        assert_eq!(PortStatus::Connected.to_string(), "Connected");
        assert_eq!(PortStatus::Disconnected.to_string(), "Disconnected");
    }

    #[test]
    fn opening_a_nonexistent_port_reports_the_cause() {
        let config = ConnectionConfig::new("/dev/does-not-exist-chronotag", 57_600);
        let err = SerialReaderPort::open(&config).unwrap_err();
        assert!(matches!(err, ReaderError::Connection { .. }));
        assert!(err.to_string().contains("/dev/does-not-exist-chronotag"));
    }
}
