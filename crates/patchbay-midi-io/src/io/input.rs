use crate::error::{Error, Result};
use crate::transport::Stream;
use crossbeam_channel::{bounded, Receiver, TryRecvError};
use midir::{MidiInput, MidiInputConnection, MidiInputPort};
use patchbay_midi::{RawFrame, RawMessage};
use tracing::debug;

/// Bytes delivered by the midir callback, with the driver timestamp in
/// microseconds.
struct Packet {
    timestamp_us: u64,
    bytes: Vec<u8>,
}

/// Reads what a hardware port transmits. The midir callback thread pushes
/// packets into a bounded queue that `poll`/`read_frame` drain.
pub(crate) struct MidirInputStream {
    connection: Option<MidiInputConnection<()>>,
    packets: Receiver<Packet>,
}

impl MidirInputStream {
    pub(crate) fn connect(
        input: MidiInput,
        port: &MidiInputPort,
        name: &str,
        buffer_size: usize,
    ) -> Result<Self> {
        let (sender, packets) = bounded(buffer_size.max(1));
        let connection = input.connect(
            port,
            name,
            move |timestamp_us, message, _| {
                let packet = Packet {
                    timestamp_us,
                    bytes: message.to_vec(),
                };
                if sender.try_send(packet).is_err() {
                    debug!("MIDI input queue full, dropping message");
                }
            },
            (),
        )?;
        Ok(Self {
            connection: Some(connection),
            packets,
        })
    }
}

impl Stream for MidirInputStream {
    fn poll(&mut self) -> Result<bool> {
        if self.connection.is_none() {
            return Err(Error::Transport("MIDI input is closed".to_string()));
        }
        Ok(!self.packets.is_empty())
    }

    fn read_frame(&mut self) -> Result<RawFrame> {
        let packet = match self.packets.try_recv() {
            Ok(packet) => packet,
            Err(TryRecvError::Empty) => return Err(Error::Decode("no frame available".to_string())),
            Err(TryRecvError::Disconnected) => {
                return Err(Error::Transport("MIDI input disconnected".to_string()))
            }
        };
        let message = RawMessage::from_bytes(&packet.bytes)?;
        // Millisecond timestamps wrap after ~49 days.
        Ok(RawFrame::new(message, (packet.timestamp_us / 1000) as u32))
    }

    fn write_frame(&mut self, _frame: RawFrame) -> Result<()> {
        Err(Error::Transport("MIDI input stream is read-only".to_string()))
    }

    fn close(&mut self) -> Result<()> {
        if let Some(connection) = self.connection.take() {
            connection.close();
        }
        Ok(())
    }
}
