//! Connection and session configuration.

use chronotag_core::{Gate, constants::{DEFAULT_BAUD_RATE, SERIAL_TIMEOUT_MS}};
use chronotag_protocol::CommandSet;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Serial link parameters, fixed for the lifetime of one connection.
///
/// Framing is always 8N1 with hardware flow control enabled when the
/// adapter supports it; the reader hardware accepts nothing else. A new
/// `ConnectionConfig` is created per successful connect and torn down with
/// it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Device path, e.g. `/dev/ttyUSB0` or `COM3`.
    pub port: String,

    /// Line rate; the reader ships configured for 57600.
    pub baud_rate: u32,

    /// Read and write timeout in milliseconds.
    pub timeout_ms: u64,

    /// Enable RTS/CTS hardware flow control.
    pub hardware_flow_control: bool,
}

impl ConnectionConfig {
    /// Connection parameters for the given port at the given baud rate,
    /// with the standard timeouts and flow control.
    #[must_use]
    pub fn new(port: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            port: port.into(),
            baud_rate,
            timeout_ms: SERIAL_TIMEOUT_MS,
            hardware_flow_control: true,
        }
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self::new(String::new(), DEFAULT_BAUD_RATE)
    }
}

/// Session-level settings: where detections are persisted and which gate
/// they are recorded against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Append-only detection log path.
    pub event_log_path: PathBuf,

    /// Directory of the structured region store.
    pub store_dir: PathBuf,

    /// Gate new detections are recorded against.
    pub gate: Gate,

    /// Device command templates; override per firmware revision when the
    /// default antenna-config/query byte layouts do not match.
    pub command_set: CommandSet,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            event_log_path: PathBuf::from("rfid_data.csv"),
            store_dir: PathBuf::from("race_store"),
            gate: Gate::Start,
            command_set: CommandSet::default(),
        }
    }
}
