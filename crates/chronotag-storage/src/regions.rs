//! Structured multi-region store for race timing.
//!
//! Three named regions — Start, Finish, Participants — each with a fixed
//! header row. The on-disk container is deliberately simple: one delimited
//! file per region under a store directory; the region names and header
//! schemas are the stable contract.
//!
//! # Write model
//!
//! Every mutation is a full read-modify-write-save cycle over the whole
//! store: all regions are loaded, one is changed, all are rewritten. This
//! mirrors how workbook-style containers behave and is a documented
//! throughput/consistency caveat — write cost grows with store size, and a
//! concurrent external reader may observe a transient partially-rewritten
//! window. The acquisition pipeline serializes its writes under the
//! session lock, so the store itself needs no locking.

use crate::error::{StorageError, StorageResult};
use crate::roster;
use chronotag_core::{
    Epc, EventRecord, Gate, RosterEntry,
    constants::TIMESTAMP_FORMAT,
};
use chrono::NaiveDateTime;
use std::path::{Path, PathBuf};
use tracing::warn;

/// A named region of the structured store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Region {
    Start,
    Finish,
    Participants,
}

impl Region {
    /// All regions, in save order.
    pub const ALL: [Region; 3] = [Region::Start, Region::Finish, Region::Participants];

    /// Region name as the collaborator layer addresses it.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Region::Start => "Start",
            Region::Finish => "Finish",
            Region::Participants => "Participants",
        }
    }

    /// Header row of this region.
    #[must_use]
    pub fn header(&self) -> &'static [&'static str] {
        match self {
            Region::Start | Region::Finish => &["EPC", "Timestamp", "Gate"],
            Region::Participants => &[
                "MemberNo", "Name", "Address", "Gender", "EPC", "Country", "Status",
            ],
        }
    }

    /// Region that records passages through the given gate.
    #[must_use]
    pub fn for_gate(gate: Gate) -> Region {
        match gate {
            Gate::Start => Region::Start,
            Gate::Finish => Region::Finish,
        }
    }

    fn file_name(&self) -> &'static str {
        match self {
            Region::Start => "start.csv",
            Region::Finish => "finish.csv",
            Region::Participants => "participants.csv",
        }
    }
}

impl std::str::FromStr for Region {
    type Err = StorageError;

    fn from_str(s: &str) -> StorageResult<Self> {
        match s.trim().to_lowercase().as_str() {
            "start" => Ok(Region::Start),
            "finish" => Ok(Region::Finish),
            "participants" => Ok(Region::Participants),
            other => Err(StorageError::InvalidRecord {
                region: other.to_string(),
                message: "unknown region name".to_string(),
            }),
        }
    }
}

type Rows = Vec<Vec<String>>;

/// In-memory image of the whole store, held only for the duration of one
/// read-modify-write-save cycle.
#[derive(Debug, Default)]
struct Contents {
    start: Rows,
    finish: Rows,
    participants: Rows,
}

impl Contents {
    fn rows(&self, region: Region) -> &Rows {
        match region {
            Region::Start => &self.start,
            Region::Finish => &self.finish,
            Region::Participants => &self.participants,
        }
    }

    fn rows_mut(&mut self, region: Region) -> &mut Rows {
        match region {
            Region::Start => &mut self.start,
            Region::Finish => &mut self.finish,
            Region::Participants => &mut self.participants,
        }
    }
}

/// Directory-backed structured store with Start/Finish/Participants
/// regions.
#[derive(Debug, Clone)]
pub struct RegionStore {
    dir: PathBuf,
}

impl RegionStore {
    /// Open (or initialize) a store at the given directory.
    ///
    /// Missing region files are created with their header rows so readers
    /// always find the full schema in place.
    ///
    /// # Errors
    /// Returns `StorageError::Io`/`Csv` if the directory or files cannot
    /// be created or read.
    pub fn open(dir: impl Into<PathBuf>) -> StorageResult<Self> {
        let store = Self { dir: dir.into() };
        std::fs::create_dir_all(&store.dir)?;

        // Materialize headers for any region file that does not exist yet.
        let contents = store.load()?;
        store.save(&contents)?;
        Ok(store)
    }

    /// Store directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Append one gate passage to its region.
    ///
    /// Full read-modify-write-save cycle; see the module docs.
    ///
    /// # Errors
    /// Returns `StorageError` on any filesystem failure; no partial state
    /// is kept in memory between calls.
    pub fn append_event(&self, event: &EventRecord) -> StorageResult<()> {
        let mut contents = self.load()?;
        contents.rows_mut(Region::for_gate(event.gate)).push(vec![
            event.epc.to_string(),
            event.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            event.gate.to_string(),
        ]);
        self.save(&contents)
    }

    /// Wholesale-replace the Participants region with the given entries.
    ///
    /// Existing participant rows are discarded, not merged.
    ///
    /// # Errors
    /// Returns `StorageError` on any filesystem failure.
    pub fn replace_roster(&self, entries: &[RosterEntry]) -> StorageResult<()> {
        let mut contents = self.load()?;
        contents.participants = entries
            .iter()
            .map(|e| {
                vec![
                    e.member_no.clone(),
                    e.name.clone(),
                    e.address.clone(),
                    e.gender.clone(),
                    e.epc.to_string(),
                    e.country.clone(),
                    e.status.clone(),
                ]
            })
            .collect();
        self.save(&contents)
    }

    /// Parse an external roster file and replace the Participants region.
    ///
    /// # Errors
    /// Returns `StorageError::Import` if the source is missing or
    /// malformed; the store is untouched in that case.
    pub fn import_participants(&self, path: impl AsRef<Path>) -> StorageResult<usize> {
        let entries = roster::import_roster(path.as_ref())?;
        self.replace_roster(&entries)?;
        Ok(entries.len())
    }

    /// Remove all data rows from one region; its header persists.
    ///
    /// # Errors
    /// Returns `StorageError` on any filesystem failure.
    pub fn clear_region(&self, region: Region) -> StorageResult<()> {
        let mut contents = self.load()?;
        contents.rows_mut(region).clear();
        self.save(&contents)
    }

    /// Remove all data rows from every region; headers persist.
    ///
    /// # Errors
    /// Returns `StorageError` on any filesystem failure.
    pub fn clear_all(&self) -> StorageResult<()> {
        self.save(&Contents::default())
    }

    /// Read back the passages recorded for one gate, in row order.
    ///
    /// Rows that no longer parse (foreign edits) are skipped with a
    /// warning rather than failing the whole read.
    ///
    /// # Errors
    /// Returns `StorageError` if the region file cannot be read.
    pub fn events(&self, gate: Gate) -> StorageResult<Vec<(Epc, NaiveDateTime)>> {
        let contents = self.load()?;
        let region = Region::for_gate(gate);
        let mut events = Vec::new();

        for row in contents.rows(region) {
            match parse_event_row(row) {
                Ok(event) => events.push(event),
                Err(err) => {
                    warn!(region = region.name(), %err, "skipping unparseable row");
                }
            }
        }
        Ok(events)
    }

    /// Read back the participant roster, in row order.
    ///
    /// # Errors
    /// Returns `StorageError` if the region file cannot be read.
    pub fn participants(&self) -> StorageResult<Vec<RosterEntry>> {
        let contents = self.load()?;
        let mut entries = Vec::new();

        for row in contents.rows(Region::Participants) {
            match parse_roster_row(row) {
                Ok(entry) => entries.push(entry),
                Err(err) => {
                    warn!(region = "Participants", %err, "skipping unparseable row");
                }
            }
        }
        Ok(entries)
    }

    fn region_path(&self, region: Region) -> PathBuf {
        self.dir.join(region.file_name())
    }

    /// Load the whole store. A missing region file reads as empty.
    fn load(&self) -> StorageResult<Contents> {
        let mut contents = Contents::default();
        for region in Region::ALL {
            *contents.rows_mut(region) = self.load_region(region)?;
        }
        Ok(contents)
    }

    fn load_region(&self, region: Region) -> StorageResult<Rows> {
        let path = self.region_path(region);
        if !path.exists() {
            return Ok(Vec::new());
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(&path)?;

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            rows.push(record.iter().map(str::to_string).collect());
        }
        Ok(rows)
    }

    /// Rewrite every region file: header row first, then the data rows.
    fn save(&self, contents: &Contents) -> StorageResult<()> {
        for region in Region::ALL {
            let mut writer = csv::Writer::from_path(self.region_path(region))?;
            writer.write_record(region.header())?;
            for row in contents.rows(region) {
                writer.write_record(row)?;
            }
            writer.flush()?;
        }
        Ok(())
    }
}

fn parse_event_row(row: &[String]) -> StorageResult<(Epc, NaiveDateTime)> {
    if row.len() < 2 {
        return Err(StorageError::InvalidRecord {
            region: "event".to_string(),
            message: format!("expected at least 2 columns, got {}", row.len()),
        });
    }
    let epc = Epc::new(&row[0]).map_err(|e| StorageError::InvalidRecord {
        region: "event".to_string(),
        message: e.to_string(),
    })?;
    let timestamp = crate::merge::parse_timestamp(&row[1])?;
    Ok((epc, timestamp))
}

fn parse_roster_row(row: &[String]) -> StorageResult<RosterEntry> {
    if row.len() != roster::ROSTER_COLUMNS {
        return Err(StorageError::InvalidRecord {
            region: "Participants".to_string(),
            message: format!(
                "expected {} columns, got {}",
                roster::ROSTER_COLUMNS,
                row.len()
            ),
        });
    }
    let epc = Epc::new(&row[4]).map_err(|e| StorageError::InvalidRecord {
        region: "Participants".to_string(),
        message: e.to_string(),
    })?;
    Ok(RosterEntry {
        member_no: row[0].clone(),
        name: row[1].clone(),
        address: row[2].clone(),
        gender: row[3].clone(),
        epc,
        country: row[5].clone(),
        status: row[6].clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Local;
    use tempfile::tempdir;

    fn epc(suffix: &str) -> Epc {
        Epc::new(&format!("E200470F3B6060218CCD{suffix}")).unwrap()
    }

    #[test]
    fn open_materializes_all_headers() {
        let dir = tempdir().unwrap();
        let _store = RegionStore::open(dir.path().join("store")).unwrap();

        let start = std::fs::read_to_string(dir.path().join("store/start.csv")).unwrap();
        assert_eq!(start.trim(), "EPC,Timestamp,Gate");
        let roster = std::fs::read_to_string(dir.path().join("store/participants.csv")).unwrap();
        assert_eq!(
            roster.trim(),
            "MemberNo,Name,Address,Gender,EPC,Country,Status"
        );
    }

    #[test]
    fn append_event_lands_in_its_gate_region() {
        let dir = tempdir().unwrap();
        let store = RegionStore::open(dir.path()).unwrap();

        store
            .append_event(&EventRecord {
                epc: epc("01AF"),
                timestamp: Local::now(),
                gate: Gate::Finish,
            })
            .unwrap();

        assert_eq!(store.events(Gate::Finish).unwrap().len(), 1);
        assert!(store.events(Gate::Start).unwrap().is_empty());
    }

    #[test]
    fn clear_region_keeps_header_and_other_regions() {
        let dir = tempdir().unwrap();
        let store = RegionStore::open(dir.path()).unwrap();

        for gate in [Gate::Start, Gate::Finish] {
            store
                .append_event(&EventRecord {
                    epc: epc("01AF"),
                    timestamp: Local::now(),
                    gate,
                })
                .unwrap();
        }

        store.clear_region(Region::Start).unwrap();

        assert!(store.events(Gate::Start).unwrap().is_empty());
        assert_eq!(store.events(Gate::Finish).unwrap().len(), 1);

        let start = std::fs::read_to_string(store.dir().join("start.csv")).unwrap();
        assert_eq!(start.trim(), "EPC,Timestamp,Gate");

        // Writes still land under the preserved header.
        store
            .append_event(&EventRecord {
                epc: epc("021B"),
                timestamp: Local::now(),
                gate: Gate::Start,
            })
            .unwrap();
        assert_eq!(store.events(Gate::Start).unwrap().len(), 1);
    }

    #[test]
    fn replace_roster_is_wholesale() {
        let dir = tempdir().unwrap();
        let store = RegionStore::open(dir.path()).unwrap();

        let first = RosterEntry {
            member_no: "100".to_string(),
            name: "Old Entry".to_string(),
            address: "-".to_string(),
            gender: "-".to_string(),
            epc: epc("01AF"),
            country: "-".to_string(),
            status: "active".to_string(),
        };
        store.replace_roster(std::slice::from_ref(&first)).unwrap();

        let second = RosterEntry {
            member_no: "200".to_string(),
            name: "New Entry".to_string(),
            ..first
        };
        store.replace_roster(&[second]).unwrap();

        let roster = store.participants().unwrap();
        assert_eq!(roster.len(), 1);
        assert_eq!(roster[0].member_no, "200");
    }

    #[test]
    fn region_names_round_trip() {
        assert_eq!("start".parse::<Region>().unwrap(), Region::Start);
        assert_eq!("Participants".parse::<Region>().unwrap(), Region::Participants);
        assert!("splits".parse::<Region>().is_err());
    }
}
