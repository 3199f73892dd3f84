use super::{Events, Port, PortCore, RunHandles, SharedStream};
use crate::config::PortConfig;
use crate::error::{Error, Result};
use crate::transport::{DeviceId, Transport};
use crossbeam_channel::select;
use patchbay_midi::{RawFrame, RawMessage};
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Reception side of a device: events sent into this port are written to the
/// transport.
pub struct InPort {
    core: PortCore,
    transport: Arc<dyn Transport>,
    device: DeviceId,
}

impl InPort {
    pub fn new(
        name: impl Into<String>,
        transport: Arc<dyn Transport>,
        device: DeviceId,
        config: PortConfig,
    ) -> Self {
        Self {
            core: PortCore::new(name.into(), config),
            transport,
            device,
        }
    }

    pub fn device_id(&self) -> DeviceId {
        self.device
    }

    /// Write a raw message straight to the transport, bypassing the event
    /// channel and classification.
    ///
    /// Avoid this. It exists for hardware whose internal protocol needs many
    /// unrelated message types delivered in strict order, which the typed
    /// event path cannot promise once other writers share the channel.
    pub fn write_raw(&self, message: RawMessage) -> Result<()> {
        let stream = self
            .core
            .stream()
            .ok_or_else(|| Error::NotOpen(format!("port {}", self.core.name())))?;
        if write_frame(&stream, RawFrame::new(message, 0))? {
            Ok(())
        } else {
            Err(Error::NotOpen(format!("port {}", self.core.name())))
        }
    }
}

/// Write one frame. `Ok(false)` when the stream has already been released.
fn write_frame(stream: &SharedStream, frame: RawFrame) -> Result<bool> {
    let mut guard = stream.lock();
    match guard.as_mut() {
        Some(stream) => stream.write_frame(frame).map(|_| true),
        None => Ok(false),
    }
}

impl Port for InPort {
    fn name(&self) -> &str {
        self.core.name()
    }

    fn open(&self) -> Result<()> {
        let (transport, device) = (&self.transport, self.device);
        // The device receives through the transport's *output* stream.
        self.core
            .open(|config| transport.open_output_stream(device, config.stream_buffer).map(Some))
    }

    fn close(&self) -> Result<()> {
        self.core.close()
    }

    fn is_open(&self) -> bool {
        self.core.is_open()
    }

    fn run(&self) -> Result<()> {
        let Some(RunHandles {
            events,
            stop,
            stream,
        }) = self.core.begin_run()?
        else {
            return Ok(());
        };
        let name = self.core.name();
        let stream = stream.ok_or_else(|| Error::Inconsistent(name.to_string()))?;
        let receiver = events.receiver();
        drop(events);

        debug!("Port {} running", name);
        loop {
            select! {
                recv(receiver) -> event => {
                    let Ok(event) = event else {
                        return Ok(());
                    };
                    trace!("{} <- {:?}", name, event);
                    // Timestamp 0: deliver immediately.
                    match write_frame(&stream, RawFrame::new(event.to_raw_message(), 0)) {
                        Ok(true) => {}
                        Ok(false) => return Ok(()),
                        Err(e) => warn!("{}: failed to write {:?}: {}", name, event, e),
                    }
                }
                recv(stop.receiver()) -> _ => {
                    debug!("Port {} stopped", name);
                    return Ok(());
                }
            }
        }
    }

    fn events(&self) -> Option<Events> {
        self.core.events()
    }
}

impl std::fmt::Debug for InPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InPort")
            .field("core", &self.core)
            .field("device", &self.device)
            .finish()
    }
}
