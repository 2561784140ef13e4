//! Persistence sinks for tag detections and race reconciliation.
//!
//! Two independent sinks, both best effort from the acquisition pipeline's
//! point of view (a failed write is logged by the caller and never stops
//! tag processing):
//!
//! - [`EventLog`] — an append-only delimited log of every unique detection.
//! - [`RegionStore`] — a structured store with three named regions (Start,
//!   Finish, Participants) used for start/finish timing and the
//!   participant roster.
//!
//! [`merge`] joins the store's regions into per-participant race results;
//! [`roster`] imports an external participant file.

pub mod error;
pub mod event_log;
pub mod merge;
pub mod regions;
pub mod roster;

pub use error::{StorageError, StorageResult};
pub use event_log::EventLog;
pub use merge::merged_records;
pub use regions::{Region, RegionStore};
pub use roster::import_roster;
