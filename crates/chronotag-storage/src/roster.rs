//! External roster import.
//!
//! Reads a participant roster prepared outside the system (typically an
//! export from the race registration tool) with exactly seven columns:
//! member number, name, address, gender, EPC, country, status. Import is a
//! wholesale replacement of the Participants region, never a merge.

use crate::error::{StorageError, StorageResult};
use chronotag_core::{Epc, RosterEntry};
use std::path::Path;
use tracing::info;

/// Required column count of a roster source file.
pub const ROSTER_COLUMNS: usize = 7;

/// Parse a roster source file into validated entries.
///
/// A leading header row (recognized by its first column) is skipped. Any
/// structural problem — missing file, wrong column count, invalid EPC —
/// aborts the whole import; no partial roster is returned.
///
/// # Errors
/// Returns `StorageError::Import` describing the first offending row.
pub fn import_roster(path: &Path) -> StorageResult<Vec<RosterEntry>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(|e| StorageError::Import(format!("cannot open {}: {e}", path.display())))?;

    let mut entries = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record =
            record.map_err(|e| StorageError::Import(format!("row {}: {e}", index + 1)))?;

        if index == 0 && is_header_row(&record) {
            continue;
        }

        if record.len() != ROSTER_COLUMNS {
            return Err(StorageError::Import(format!(
                "row {}: expected {ROSTER_COLUMNS} columns, got {}",
                index + 1,
                record.len()
            )));
        }

        let epc = Epc::new(&record[4])
            .map_err(|e| StorageError::Import(format!("row {}: {e}", index + 1)))?;

        entries.push(RosterEntry {
            member_no: record[0].to_string(),
            name: record[1].to_string(),
            address: record[2].to_string(),
            gender: record[3].to_string(),
            epc,
            country: record[5].to_string(),
            status: record[6].to_string(),
        });
    }

    info!(
        path = %path.display(),
        participants = entries.len(),
        "roster parsed"
    );
    Ok(entries)
}

fn is_header_row(record: &csv::StringRecord) -> bool {
    record
        .get(0)
        .is_some_and(|first| first.trim().eq_ignore_ascii_case("memberno"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    fn write_roster(contents: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("roster.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        (dir, path)
    }

    #[test]
    fn parses_rows_and_skips_header() {
        let (_dir, path) = write_roster(
            "MemberNo,Name,Address,Gender,EPC,Country,Status\n\
             101,Ana Silva,Lisbon,F,E200470F3B6060218CCD01AF,PT,active\n\
             102,Jon Berg,Oslo,M,E200470F3B6060218CCD021B,NO,active\n",
        );

        let entries = import_roster(&path).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].member_no, "101");
        assert_eq!(entries[1].epc.as_str(), "E200470F3B6060218CCD021B");
    }

    #[test]
    fn accepts_headerless_files() {
        let (_dir, path) =
            write_roster("101,Ana Silva,Lisbon,F,E200470F3B6060218CCD01AF,PT,active\n");
        assert_eq!(import_roster(&path).unwrap().len(), 1);
    }

    #[test]
    fn rejects_wrong_column_count() {
        let (_dir, path) = write_roster("101,Ana Silva,E200470F3B6060218CCD01AF\n");
        let err = import_roster(&path).unwrap_err();
        assert!(matches!(err, StorageError::Import(_)));
        assert!(err.to_string().contains("expected 7 columns"));
    }

    #[test]
    fn rejects_invalid_epc() {
        let (_dir, path) = write_roster("101,Ana Silva,Lisbon,F,not-an-epc,PT,active\n");
        assert!(matches!(
            import_roster(&path).unwrap_err(),
            StorageError::Import(_)
        ));
    }

    #[test]
    fn missing_file_aborts_import() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            import_roster(&dir.path().join("absent.csv")).unwrap_err(),
            StorageError::Import(_)
        ));
    }
}
