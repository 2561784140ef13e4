use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    // Frame/field validation errors
    #[error("Invalid EPC: {0}")]
    InvalidEpc(String),

    #[error("Antenna port {port} out of range 1-{num_antennas}")]
    InvalidAntennaPort { port: u8, num_antennas: u8 },

    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    // Value parsing errors
    #[error("Invalid gate: {0}")]
    InvalidGate(String),

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
