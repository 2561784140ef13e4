//! Protocol and cadence constants shared across the chronotag workspace.
//!
//! The wire-level values describe the Chaofan-style UHF reader's tag report
//! frame; the cadence values bound the acquisition pipeline's polling,
//! re-trigger, and shutdown behavior. Changing the frame layout constants
//! breaks compatibility with the reader firmware.

// ============================================================================
// Tag Report Frame Layout
// ============================================================================

/// Length of a complete tag report frame in bytes.
///
/// The reader emits fixed-length 21-byte frames; any window of a different
/// length is not a tag report.
pub const TAG_FRAME_LEN: usize = 21;

/// Byte offset where the EPC begins within a tag report frame.
pub const EPC_OFFSET: usize = 6;

/// Length of the raw EPC field in bytes.
///
/// 12 bytes, rendered as 24 uppercase hex characters.
pub const EPC_LEN: usize = 12;

/// Length of an EPC rendered as a hex string.
pub const EPC_HEX_LEN: usize = 2 * EPC_LEN;

/// Byte offset of the RSSI field within a tag report frame.
pub const RSSI_OFFSET: usize = 18;

/// Byte offset of the antenna port field within a tag report frame.
pub const ANTENNA_OFFSET: usize = 19;

/// Label recorded with every detection to identify the frame dialect.
pub const DETECTED_AS: &str = "chaofan_custom";

// ============================================================================
// Connection Defaults
// ============================================================================

/// Default serial baud rate for the reader.
pub const DEFAULT_BAUD_RATE: u32 = 57_600;

/// Serial read/write timeout (milliseconds).
pub const SERIAL_TIMEOUT_MS: u64 = 2_000;

/// Antenna port count assumed when the device does not answer the
/// antenna-count query.
pub const DEFAULT_NUM_ANTENNAS: u8 = 4;

// ============================================================================
// Acquisition Cadence
// ============================================================================

/// Interval between inventory re-triggers (milliseconds).
///
/// Device inventories can silently stall; the acquisition loop restarts the
/// fast inventory on this cadence as a liveness compensator.
pub const INVENTORY_RETRIGGER_MS: u64 = 3_000;

/// Idle sleep per worker-loop iteration (milliseconds).
///
/// Bounds CPU usage of the polling loops; both loops notice a flipped
/// running flag within roughly this interval.
pub const POLL_INTERVAL_MS: u64 = 10;

/// Backoff after an I/O or parse error inside a worker loop (milliseconds).
pub const ERROR_BACKOFF_MS: u64 = 100;

/// Settle time between sequenced device commands (milliseconds).
pub const COMMAND_SETTLE_MS: u64 = 100;

/// Longer settle time used by the missed-tag retry sequence (milliseconds).
pub const RETRY_SETTLE_MS: u64 = 200;

/// Bound on joining each worker thread during shutdown (milliseconds).
///
/// A worker that does not finish within this window is abandoned, not
/// force-killed; shutdown is best effort.
pub const JOIN_TIMEOUT_MS: u64 = 2_000;

// ============================================================================
// Timestamp Formats
// ============================================================================

/// Wall-clock format with microsecond precision, used for detection records.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Second-precision format accepted when parsing persisted rows.
pub const TIMESTAMP_FORMAT_SECONDS: &str = "%Y-%m-%d %H:%M:%S";
