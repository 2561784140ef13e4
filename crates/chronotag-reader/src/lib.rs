//! Acquisition pipeline for serial-attached UHF RFID readers.
//!
//! The pipeline runs three logical threads of control:
//!
//! ```text
//! control thread          acquisition thread          parser thread
//! ──────────────          ──────────────────          ─────────────
//! setup_connection ──►  ┌──────────────────┐
//! start / stop          │ drain serial     │  chunks  ┌──────────────┐
//! retry_missed_tags ──► │ bytes, re-trigger├─────────►│ FrameScanner │
//! queries               │ inventory (3 s)  │  (mpsc)  │ + dedup store│
//!                       └──────────────────┘          └──────────────┘
//! ```
//!
//! The serial handle is shared between the control path (commands) and the
//! acquisition loop (reads, inventory re-triggers) behind a mutex; the
//! mutex serializes byte-level access, but command interleaving between
//! the two paths remains possible and is a documented property of the
//! device protocol, not something this crate eliminates.
//!
//! Shutdown is cooperative: the running flag is an [`AtomicBool`] both
//! loops poll at sub-second granularity, and [`ReaderSession::stop`] joins
//! each worker with a bounded timeout, abandoning (never killing) a worker
//! that fails to finish in time.
//!
//! [`AtomicBool`]: std::sync::atomic::AtomicBool

pub mod acquisition;
pub mod config;
pub mod error;
pub mod inventory;
pub mod mock;
pub mod port;
pub mod reader;
pub mod session;

pub use config::{ConnectionConfig, SessionConfig};
pub use error::{ReaderError, Result};
pub use inventory::InventoryController;
pub use mock::{MockPortHandle, MockReaderPort};
pub use port::{PortStatus, ReaderPort, SerialPortStatus, SerialReaderPort, list_serial_ports};
pub use reader::ReaderSession;
pub use session::SessionStore;
