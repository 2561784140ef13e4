//! Wire protocol for Chaofan-style UHF RFID readers.
//!
//! Two directions, two shapes:
//!
//! - **Commands** (host → reader): short fixed-length frames with no
//!   variable-length framing; see [`commands::CommandSet`].
//! - **Tag reports** (reader → host): fixed 21-byte frames carrying EPC,
//!   RSSI, and antenna port; see [`frame`] for the field layout and
//!   [`scanner::FrameScanner`] for stream reassembly and resynchronization.

pub mod commands;
pub mod frame;
pub mod scanner;

pub use commands::CommandSet;
pub use frame::TagRead;
pub use scanner::FrameScanner;
