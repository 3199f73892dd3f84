use crate::error::{Error, Result};
use crate::transport::Stream;
use midir::MidiOutputConnection;
use patchbay_midi::RawFrame;

/// Writes frames to a hardware port. Timestamps are ignored; frames go out
/// as soon as they are written.
pub(crate) struct MidirOutputStream {
    connection: Option<MidiOutputConnection>,
}

impl MidirOutputStream {
    pub(crate) fn new(connection: MidiOutputConnection) -> Self {
        Self {
            connection: Some(connection),
        }
    }
}

impl Stream for MidirOutputStream {
    fn poll(&mut self) -> Result<bool> {
        Ok(false)
    }

    fn read_frame(&mut self) -> Result<RawFrame> {
        Err(Error::Transport("MIDI output stream is write-only".to_string()))
    }

    fn write_frame(&mut self, frame: RawFrame) -> Result<()> {
        let connection = self
            .connection
            .as_mut()
            .ok_or_else(|| Error::Transport("MIDI output is closed".to_string()))?;
        connection.send(&frame.raw_message().to_bytes())?;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if let Some(connection) = self.connection.take() {
            connection.close();
        }
        Ok(())
    }
}
