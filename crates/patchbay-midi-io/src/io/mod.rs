//! Hardware MIDI transport.
//!
//! Device enumeration and streams backed by midir. Requires the `midi-io`
//! feature.

mod input;
mod output;

use crate::error::{Error, Result};
use crate::transport::{DeviceId, Stream, Transport};
use midir::{MidiInput, MidiOutput};
use tracing::debug;

/// An enumerated hardware port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MidiDeviceInfo {
    pub id: DeviceId,
    pub name: String,
}

/// Hardware ports a [`MidirTransport`] can read from, in id order.
pub fn list_input_devices() -> Result<Vec<MidiDeviceInfo>> {
    let input = MidiInput::new("patchbay-device-list")?;
    Ok(input
        .ports()
        .iter()
        .enumerate()
        .map(|(id, port)| MidiDeviceInfo {
            id,
            name: input
                .port_name(port)
                .unwrap_or_else(|_| format!("Unknown Device {}", id)),
        })
        .collect())
}

/// Hardware ports a [`MidirTransport`] can write to, in id order.
pub fn list_output_devices() -> Result<Vec<MidiDeviceInfo>> {
    let output = MidiOutput::new("patchbay-device-list")?;
    Ok(output
        .ports()
        .iter()
        .enumerate()
        .map(|(id, port)| MidiDeviceInfo {
            id,
            name: output
                .port_name(port)
                .unwrap_or_else(|_| format!("Unknown Device {}", id)),
        })
        .collect())
}

/// Transport over the system's MIDI ports. Device ids index the lists
/// returned by [`list_input_devices`] and [`list_output_devices`].
#[derive(Debug, Clone)]
pub struct MidirTransport {
    client_name: String,
}

impl MidirTransport {
    pub fn new(client_name: impl Into<String>) -> Self {
        Self {
            client_name: client_name.into(),
        }
    }

    pub fn client_name(&self) -> &str {
        &self.client_name
    }
}

impl Default for MidirTransport {
    fn default() -> Self {
        Self::new("patchbay")
    }
}

impl Transport for MidirTransport {
    fn open_input_stream(&self, device: DeviceId, buffer_size: usize) -> Result<Box<dyn Stream>> {
        let input = MidiInput::new(&self.client_name)?;
        let port = input
            .ports()
            .get(device)
            .cloned()
            .ok_or_else(|| Error::Transport(format!("MIDI input device {} not found", device)))?;
        let name = input.port_name(&port).unwrap_or_default();
        let stream = input::MidirInputStream::connect(input, &port, &name, buffer_size)?;
        debug!("Opened MIDI input {} ({})", device, name);
        Ok(Box::new(stream))
    }

    fn open_output_stream(
        &self,
        device: DeviceId,
        _buffer_size: usize,
    ) -> Result<Box<dyn Stream>> {
        let output = MidiOutput::new(&self.client_name)?;
        let port = output
            .ports()
            .get(device)
            .cloned()
            .ok_or_else(|| Error::Transport(format!("MIDI output device {} not found", device)))?;
        let name = output.port_name(&port).unwrap_or_default();
        let connection = output.connect(&port, &format!("{}-out", self.client_name))?;
        debug!("Opened MIDI output {} ({})", device, name);
        Ok(Box::new(output::MidirOutputStream::new(connection)))
    }
}
