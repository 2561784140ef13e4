//! Error types for the acquisition pipeline.

use thiserror::Error;

/// Result type alias for reader operations.
pub type Result<T> = std::result::Result<T, ReaderError>;

/// Errors surfaced by the reader pipeline.
///
/// Only the caller-invoked operations return these; the worker loops
/// absorb their own failures (log, back off, continue) for as long as the
/// running flag is set.
#[derive(Debug, Error)]
pub enum ReaderError {
    /// Opening the serial device failed; carries the underlying cause.
    #[error("Cannot connect to {port}: {source}")]
    Connection {
        port: String,
        #[source]
        source: serialport::Error,
    },

    /// An operation that needs an open connection was called without one.
    #[error("Serial connection not established")]
    NotConnected,

    /// The reader is running; stop it before reconfiguring.
    #[error("Reader is running; stop it first")]
    Busy,

    /// Serial device error after the connection was established.
    #[error("Serial error: {0}")]
    Serial(#[from] serialport::Error),

    /// Generic I/O error on the device handle.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Persistence failure surfaced from a caller-invoked operation.
    #[error("Storage error: {0}")]
    Storage(#[from] chronotag_storage::StorageError),
}

impl ReaderError {
    /// Create a connection error for the named port.
    pub fn connection(port: impl Into<String>, source: serialport::Error) -> Self {
        Self::Connection {
            port: port.into(),
            source,
        }
    }
}
