use super::{Events, Port, PortCore, RunHandles, SharedStream};
use crate::config::PortConfig;
use crate::error::{Error, Result};
use crate::transport::{DeviceId, Transport};
use crossbeam_channel::select;
use patchbay_midi::{Event, RawFrame};
use std::sync::Arc;
use std::thread;
use tracing::{debug, error, trace, warn};

/// Transmission side of a device: frames polled from the transport are
/// classified and published into this port's channel.
pub struct OutPort {
    core: PortCore,
    transport: Arc<dyn Transport>,
    device: DeviceId,
}

enum Polled {
    Frame(RawFrame),
    Empty,
    Skipped,
    Released,
}

impl OutPort {
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

    fn next_frame(&self, stream: &SharedStream) -> Result<Polled> {
        let name = self.core.name();
        let mut guard = stream.lock();
        let Some(active) = guard.as_mut() else {
            return Ok(Polled::Released);
        };

        match active.poll() {
            Ok(false) => Ok(Polled::Empty),
            Ok(true) => match active.read_frame() {
                Ok(frame) => Ok(Polled::Frame(frame)),
                Err(e) => {
                    warn!("{}: skipping unreadable frame: {}", name, e);
                    Ok(Polled::Skipped)
                }
            },
            Err(e) => {
                // The stream cannot be trusted after a poll fault: detach it so
                // a later open() reports the inconsistency instead of reusing it.
                error!("{}: poll failed, stopping: {}", name, e);
                if let Some(mut detached) = guard.take() {
                    if let Err(close_err) = detached.close() {
                        warn!("{}: close after poll failure: {}", name, close_err);
                    }
                }
                Err(Error::PollFatal {
                    port: name.to_string(),
                    reason: e.to_string(),
                })
            }
        }
    }
}

impl Port for OutPort {
    fn name(&self) -> &str {
        self.core.name()
    }

    fn open(&self) -> Result<()> {
        let (transport, device) = (&self.transport, self.device);
        // The device transmits through the transport's *input* stream.
        self.core
            .open(|config| transport.open_input_stream(device, config.stream_buffer).map(Some))
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
        let sender = events.sender();
        drop(events);
        let poll_interval = self.core.config().poll_interval;

        debug!("Port {} running", name);
        loop {
            if stop.is_stopped() {
                debug!("Port {} stopped", name);
                return Ok(());
            }

            let frame = match self.next_frame(&stream) {
                Ok(Polled::Frame(frame)) => frame,
                Ok(Polled::Empty) => {
                    thread::sleep(poll_interval);
                    continue;
                }
                Ok(Polled::Skipped) => continue,
                Ok(Polled::Released) => return Ok(()),
                Err(e) => {
                    // Readers see the channel disconnect once `sender` drops.
                    self.core.detach_events();
                    return Err(e);
                }
            };

            let event = Event::classify(frame.raw_message());
            trace!("{} -> {:?}", name, event);
            select! {
                send(sender, event) -> sent => {
                    if sent.is_err() {
                        return Ok(());
                    }
                }
                recv(stop.receiver()) -> _ => {
                    debug!("Port {} stopped with {:?} unpublished", name, event);
                    return Ok(());
                }
            }
        }
    }

    fn events(&self) -> Option<Events> {
        self.core.events()
    }
}

impl std::fmt::Debug for OutPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutPort")
            .field("core", &self.core)
            .field("device", &self.device)
            .finish()
    }
}
