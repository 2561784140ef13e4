//! Tag report frame layout and field extraction.
//!
//! The reader emits fixed 21-byte frames with no start or end marker:
//!
//! ```text
//! offset  0                6                        18    19    20
//!         ├── header (6) ──┼──── EPC (12 bytes) ────┼ RSSI ┼ ANT ┼ pad
//! ```
//!
//! A window is a valid tag report iff it is exactly 21 bytes long and its
//! antenna byte is within `1..=num_antennas`. There is no frame checksum;
//! the antenna bound is the only integrity signal, which is why the
//! [`scanner`](crate::scanner) resynchronizes one byte at a time instead of
//! discarding whole windows.

use chronotag_core::{
    AntennaPort, Epc, Error, Result,
    constants::{ANTENNA_OFFSET, EPC_LEN, EPC_OFFSET, RSSI_OFFSET, TAG_FRAME_LEN},
};

/// Fields extracted from one valid tag report frame.
///
/// A `TagRead` is pure wire data; the acquisition layer stamps it with a
/// wall-clock timestamp and dialect label when recording it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagRead {
    pub epc: Epc,
    pub rssi: u8,
    pub antenna: AntennaPort,
}

impl TagRead {
    /// Validate a candidate window and extract its fields.
    ///
    /// # Errors
    /// Returns `Error::InvalidFrame` for a window that is not exactly
    /// 21 bytes, and `Error::InvalidAntennaPort` when the antenna byte is
    /// outside `1..=num_antennas`. Either failure means the window is not a
    /// tag report and the caller should resync.
    pub fn parse(window: &[u8], num_antennas: u8) -> Result<Self> {
        if window.len() != TAG_FRAME_LEN {
            return Err(Error::InvalidFrame(format!(
                "expected {TAG_FRAME_LEN} bytes, got {}",
                window.len()
            )));
        }

        let antenna = AntennaPort::new(window[ANTENNA_OFFSET], num_antennas)?;
        let epc = Epc::from_bytes(&window[EPC_OFFSET..EPC_OFFSET + EPC_LEN])?;

        Ok(Self {
            epc,
            rssi: window[RSSI_OFFSET],
            antenna,
        })
    }
}
