//! Error types for the MIDI event model.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("empty MIDI message")]
    Empty,

    #[error("byte {0:#04x} is not a status byte (running status is not supported)")]
    NotStatus(u8),

    #[error("truncated MIDI message: status {status:#04x} needs {expected} bytes, got {actual}")]
    Truncated {
        status: u8,
        expected: usize,
        actual: usize,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
