use crate::{
    Result,
    constants::{DEFAULT_NUM_ANTENNAS, DETECTED_AS, EPC_HEX_LEN, EPC_LEN, TIMESTAMP_FORMAT},
    error::Error,
};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Electronic Product Code — the identity encoded on a radio tag.
///
/// Stored as 24 uppercase hex characters (the 12 raw EPC bytes of the tag
/// report frame). Construction normalizes case and validates the format, so
/// two `Epc` values compare equal iff they identify the same physical tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Epc(String);

impl Epc {
    /// Create an EPC from its hex string form with validation.
    ///
    /// The input is trimmed and converted to uppercase before validation.
    ///
    /// # Errors
    /// Returns `Error::InvalidEpc` if the value is not exactly 24 hex digits.
    pub fn new(hex: &str) -> Result<Self> {
        let hex = hex.trim().to_uppercase();

        if hex.len() != EPC_HEX_LEN {
            return Err(Error::InvalidEpc(format!(
                "EPC must be {EPC_HEX_LEN} hex chars, got {}",
                hex.len()
            )));
        }
        if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(Error::InvalidEpc(format!("non-hex character in {hex:?}")));
        }

        Ok(Epc(hex))
    }

    /// Create an EPC from the 12 raw bytes of a tag report frame.
    ///
    /// # Errors
    /// Returns `Error::InvalidEpc` if the slice is not exactly 12 bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != EPC_LEN {
            return Err(Error::InvalidEpc(format!(
                "EPC field must be {EPC_LEN} bytes, got {}",
                bytes.len()
            )));
        }

        let mut hex = String::with_capacity(EPC_HEX_LEN);
        for b in bytes {
            hex.push_str(&format!("{b:02X}"));
        }
        Ok(Epc(hex))
    }

    /// Get the EPC as its 24-char uppercase hex string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Epc {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for Epc {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Epc::new(s)
    }
}

/// One of the reader's physical antenna connectors (1-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AntennaPort(u8);

impl AntennaPort {
    /// Create an antenna port with validation against the configured count.
    ///
    /// # Errors
    /// Returns `Error::InvalidAntennaPort` if `port` is outside
    /// `1..=num_antennas`.
    pub fn new(port: u8, num_antennas: u8) -> Result<Self> {
        if port < 1 || port > num_antennas {
            return Err(Error::InvalidAntennaPort { port, num_antennas });
        }
        Ok(AntennaPort(port))
    }

    /// Get the raw port number.
    #[must_use]
    pub fn as_u8(&self) -> u8 {
        self.0
    }
}

impl fmt::Display for AntennaPort {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Timing gate a detection is recorded against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gate {
    Start,
    Finish,
}

impl fmt::Display for Gate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Gate::Start => write!(f, "Start"),
            Gate::Finish => write!(f, "Finish"),
        }
    }
}

impl std::str::FromStr for Gate {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "start" => Ok(Gate::Start),
            "finish" => Ok(Gate::Finish),
            other => Err(Error::InvalidGate(other.to_string())),
        }
    }
}

/// A validated, deduplicated tag detection. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagRecord {
    /// Tag identity.
    pub epc: Epc,

    /// Signal strength reported with the detection.
    pub rssi: u8,

    /// Antenna port that saw the tag.
    pub antenna: AntennaPort,

    /// Wall-clock detection time, microsecond precision.
    pub timestamp: DateTime<Local>,

    /// Frame dialect label, e.g. `chaofan_custom`.
    pub detected_as: String,
}

impl TagRecord {
    /// Stamp a new record with the current wall clock and the standard
    /// dialect label.
    #[must_use]
    pub fn new(epc: Epc, rssi: u8, antenna: AntennaPort) -> Self {
        Self {
            epc,
            rssi,
            antenna,
            timestamp: Local::now(),
            detected_as: DETECTED_AS.to_string(),
        }
    }

    /// Detection time formatted with microsecond precision.
    #[must_use]
    pub fn timestamp_display(&self) -> String {
        self.timestamp.format(TIMESTAMP_FORMAT).to_string()
    }
}

/// Per-session statistics derived from the tag collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStats {
    /// Number of unique tags recorded this session.
    pub total_reads: usize,

    /// Timestamp of the most-recently-added record, if any.
    pub last_read: Option<DateTime<Local>>,
}

impl SessionStats {
    /// Render `last_read` for display, with `"Never"` as the sentinel for an
    /// empty session.
    #[must_use]
    pub fn last_read_display(&self) -> String {
        match self.last_read {
            Some(ts) => ts.format(TIMESTAMP_FORMAT).to_string(),
            None => "Never".to_string(),
        }
    }
}

/// Antenna configuration discovered during the start-up query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AntennaConfig {
    /// Number of antenna ports the device exposes.
    pub num_antennas: u8,
}

impl Default for AntennaConfig {
    fn default() -> Self {
        Self {
            num_antennas: DEFAULT_NUM_ANTENNAS,
        }
    }
}

/// External identity bound to an EPC via the participant roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub member_no: String,
    pub name: String,
    pub address: String,
    pub gender: String,
    pub epc: Epc,
    pub country: String,
    pub status: String,
}

/// A gate passage persisted to the structured store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub epc: Epc,
    pub timestamp: DateTime<Local>,
    pub gate: Gate,
}

/// One roster participant joined against their start/finish passages.
///
/// `duration` is present only when both timestamps are; display helpers
/// render the missing sides as `"N/A"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergedRecord {
    pub epc: Epc,
    pub name: String,
    pub bib: String,
    pub start_time: Option<chrono::NaiveDateTime>,
    pub finish_time: Option<chrono::NaiveDateTime>,
    pub duration: Option<String>,
}

impl MergedRecord {
    #[must_use]
    pub fn start_display(&self) -> String {
        render_optional_time(self.start_time)
    }

    #[must_use]
    pub fn finish_display(&self) -> String {
        render_optional_time(self.finish_time)
    }

    #[must_use]
    pub fn duration_display(&self) -> String {
        self.duration.clone().unwrap_or_default()
    }
}

fn render_optional_time(time: Option<chrono::NaiveDateTime>) -> String {
    match time {
        Some(ts) => ts
            .format(crate::constants::TIMESTAMP_FORMAT_SECONDS)
            .to_string(),
        None => "N/A".to_string(),
    }
}
