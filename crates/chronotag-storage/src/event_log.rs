//! Append-only detection log.
//!
//! One delimited row per unique tag detection, in detection order. The
//! header is written once, the first time the file is found empty; resets
//! truncate the body but re-create the header so downstream consumers
//! never see a schema-less file.

use crate::error::StorageResult;
use chronotag_core::TagRecord;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

/// Column header of the event log.
pub const EVENT_LOG_HEADER: [&str; 5] = ["timestamp", "epc", "rssi", "antennaPort", "detectedAs"];

/// Append-only CSV sink for tag detections.
///
/// Holds only the path; every append opens, writes, and flushes, so a
/// crash never loses more than the in-flight row.
#[derive(Debug, Clone)]
pub struct EventLog {
    path: PathBuf,
}

impl EventLog {
    /// Create a sink over the given path. The file is not touched until
    /// the first write.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the underlying log file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one detection row, writing the header first if the file is
    /// empty or absent.
    ///
    /// # Errors
    /// Returns `StorageError::Io`/`Csv` on filesystem failure; the caller
    /// decides whether that is fatal (the acquisition pipeline logs and
    /// continues).
    pub fn append(&self, record: &TagRecord) -> StorageResult<()> {
        let needs_header = match std::fs::metadata(&self.path) {
            Ok(meta) => meta.len() == 0,
            Err(_) => true,
        };

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        if needs_header {
            writer.write_record(EVENT_LOG_HEADER)?;
        }
        writer.write_record(&[
            record.timestamp_display(),
            record.epc.to_string(),
            record.rssi.to_string(),
            record.antenna.to_string(),
            record.detected_as.clone(),
        ])?;
        writer.flush()?;
        Ok(())
    }

    /// Truncate the log body, leaving only the header row.
    ///
    /// # Errors
    /// Returns `StorageError::Io`/`Csv` on filesystem failure.
    pub fn reset(&self) -> StorageResult<()> {
        let file = File::create(&self.path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        writer.write_record(EVENT_LOG_HEADER)?;
        writer.flush()?;
        Ok(())
    }
}
