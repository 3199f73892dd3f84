//! Error types for the MIDI routing subsystem.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("port {0} is open but its transport stream is detached")]
    Inconsistent(String),

    #[error("{0} is not open")]
    NotOpen(String),

    #[error("failed to open device {device}: {source}")]
    Topology {
        device: String,
        #[source]
        source: Box<Error>,
    },

    #[error("invalid topology: {0}")]
    InvalidTopology(String),

    #[error("undecodable frame: {0}")]
    Decode(String),

    #[error("polling {port} failed: {reason}")]
    PollFatal { port: String, reason: String },

    #[error("thread error: {0}")]
    Thread(String),

    #[error("MIDI message error: {0}")]
    Midi(#[from] patchbay_midi::Error),
}

#[cfg(feature = "midi-io")]
impl From<midir::InitError> for Error {
    fn from(e: midir::InitError) -> Self {
        Error::Transport(e.to_string())
    }
}

#[cfg(feature = "midi-io")]
impl From<midir::ConnectError<midir::MidiOutput>> for Error {
    fn from(e: midir::ConnectError<midir::MidiOutput>) -> Self {
        Error::Transport(e.to_string())
    }
}

#[cfg(feature = "midi-io")]
impl From<midir::ConnectError<midir::MidiInput>> for Error {
    fn from(e: midir::ConnectError<midir::MidiInput>) -> Self {
        Error::Transport(e.to_string())
    }
}

#[cfg(feature = "midi-io")]
impl From<midir::SendError> for Error {
    fn from(e: midir::SendError) -> Self {
        Error::Transport(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
