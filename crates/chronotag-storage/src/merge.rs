//! Start/finish reconciliation.
//!
//! Joins the structured store's regions into one record per roster
//! participant: EPC-keyed lookups into the Start and Finish regions, with
//! the elapsed duration computed when both passages are present. Output
//! order is roster order.

use crate::error::{StorageError, StorageResult};
use crate::regions::RegionStore;
use chronotag_core::{Gate, MergedRecord, constants::TIMESTAMP_FORMAT_SECONDS};
use chrono::NaiveDateTime;
use std::collections::HashMap;

/// Formats accepted when parsing persisted timestamps. Detection rows
/// carry microseconds; externally prepared rows often do not.
const PARSE_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", TIMESTAMP_FORMAT_SECONDS];

/// Parse a persisted timestamp, with or without a fractional part.
///
/// # Errors
/// Returns `StorageError::DateTime` if no accepted format matches.
pub fn parse_timestamp(value: &str) -> StorageResult<NaiveDateTime> {
    for format in PARSE_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(value.trim(), format) {
            return Ok(parsed);
        }
    }
    Err(StorageError::DateTime(format!(
        "unparseable timestamp {value:?}"
    )))
}

/// Render an elapsed duration as `H:MM:SS` (hours unpadded).
#[must_use]
pub fn format_duration(elapsed: chrono::Duration) -> String {
    let total = elapsed.num_seconds();
    let sign = if total < 0 { "-" } else { "" };
    let total = total.abs();
    format!(
        "{sign}{}:{:02}:{:02}",
        total / 3600,
        (total % 3600) / 60,
        total % 60
    )
}

/// Join roster, Start, and Finish regions into per-participant results.
///
/// For each roster EPC the Start and Finish maps are consulted; a missing
/// side leaves that timestamp `None` (rendered `"N/A"`) and the duration
/// empty. When the same EPC was recorded more than once in a region
/// (possible across session resets), the last row wins.
///
/// # Errors
/// Returns `StorageError` if the store cannot be read.
pub fn merged_records(store: &RegionStore) -> StorageResult<Vec<MergedRecord>> {
    let starts: HashMap<_, _> = store.events(Gate::Start)?.into_iter().collect();
    let finishes: HashMap<_, _> = store.events(Gate::Finish)?.into_iter().collect();

    let mut merged = Vec::new();
    for entry in store.participants()? {
        let start_time = starts.get(&entry.epc).copied();
        let finish_time = finishes.get(&entry.epc).copied();
        let duration = match (start_time, finish_time) {
            (Some(start), Some(finish)) => Some(format_duration(finish - start)),
            _ => None,
        };

        merged.push(MergedRecord {
            epc: entry.epc,
            name: entry.name,
            bib: entry.member_no,
            start_time,
            finish_time,
            duration,
        });
    }
    Ok(merged)
}
