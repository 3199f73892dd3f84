//! Centralized error type for the patchbay umbrella crate.
//!
//! Wraps the subsystem errors so `?` propagates naturally across crate boundaries.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("MIDI routing: {0}")]
    Routing(#[from] patchbay_midi_io::Error),

    #[error("no transport configured")]
    NoTransport,
}

pub type Result<T> = std::result::Result<T, Error>;
