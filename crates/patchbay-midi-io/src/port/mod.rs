//! Ports: lifecycle-managed, buffered, single-direction event channels.
//!
//! Naming follows the physical device: an [`InPort`] is where a device
//! *receives* events (its loop drains the channel into the transport), an
//! [`OutPort`] is where a device *transmits* (its loop polls the transport and
//! publishes into the channel). A [`LoopbackPort`] has no transport at all.
//!
//! Lifecycle is `Closed -> Open -> Running -> Closed`. Closing always fires the
//! stop signal first, then releases the transport stream, then drops the
//! channel, so no loop can touch a released stream or a dropped channel.

mod in_port;
mod loopback;
mod out_port;

pub use in_port::InPort;
pub use loopback::LoopbackPort;
pub use out_port::OutPort;

use crate::config::PortConfig;
use crate::error::{Error, Result};
use crate::stop::{StopSignal, StopToken};
use crate::transport::Stream;
use crossbeam_channel::{bounded, Receiver, Sender};
use parking_lot::Mutex;
use patchbay_midi::Event;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Shared lifecycle contract of every port flavour.
pub trait Port: Send + Sync {
    fn name(&self) -> &str;

    /// Acquire the transport stream and allocate the channel. No-op when open.
    fn open(&self) -> Result<()>;

    /// Stop the loop, release the stream, drop the channel. No-op when closed.
    fn close(&self) -> Result<()>;

    fn is_open(&self) -> bool;

    /// Run the processing loop until the port is closed. Only the first call
    /// per open session runs the loop; later calls return immediately.
    fn run(&self) -> Result<()>;

    /// Channel handle for direct send/receive. `None` while closed, and after
    /// a fatal loop error has detached the port.
    fn events(&self) -> Option<Events>;
}

/// Both ends of a port's bounded event channel.
#[derive(Clone, Debug)]
pub struct Events {
    sender: Sender<Event>,
    receiver: Receiver<Event>,
}

impl Events {
    pub(crate) fn bounded(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity);
        Self { sender, receiver }
    }

    pub fn sender(&self) -> Sender<Event> {
        self.sender.clone()
    }

    pub fn receiver(&self) -> Receiver<Event> {
        self.receiver.clone()
    }

    /// Blocking send; waits while the channel is full.
    pub fn send(&self, event: Event) -> Result<()> {
        self.sender
            .send(event)
            .map_err(|_| Error::NotOpen("event channel".to_string()))
    }

    pub fn try_send(&self, event: Event) -> bool {
        self.sender.try_send(event).is_ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<Event> {
        self.receiver.recv_timeout(timeout).ok()
    }

    pub fn try_recv(&self) -> Option<Event> {
        self.receiver.try_recv().ok()
    }

    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    pub fn capacity(&self) -> Option<usize> {
        self.sender.capacity()
    }
}

/// Transport stream shared between a port and its loop. `None` once released.
pub(crate) type SharedStream = Arc<Mutex<Option<Box<dyn Stream>>>>;

struct Session {
    events: Option<Events>,
    stop: StopSignal,
    stream: Option<SharedStream>,
    running: bool,
}

/// What a loop needs from its port for one run.
pub(crate) struct RunHandles {
    pub(crate) events: Events,
    pub(crate) stop: StopToken,
    pub(crate) stream: Option<SharedStream>,
}

/// State common to all port flavours.
pub(crate) struct PortCore {
    name: String,
    config: PortConfig,
    session: Mutex<Option<Session>>,
}

impl PortCore {
    pub(crate) fn new(name: String, config: PortConfig) -> Self {
        Self {
            name,
            config,
            session: Mutex::new(None),
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn config(&self) -> &PortConfig {
        &self.config
    }

    pub(crate) fn is_open(&self) -> bool {
        self.session.lock().is_some()
    }

    pub(crate) fn events(&self) -> Option<Events> {
        self.session.lock().as_ref().and_then(|s| s.events.clone())
    }

    pub(crate) fn stream(&self) -> Option<SharedStream> {
        self.session.lock().as_ref().and_then(|s| s.stream.clone())
    }

    /// Open a session. `attach` acquires the transport stream, if any; when it
    /// fails the port stays closed.
    pub(crate) fn open<F>(&self, attach: F) -> Result<()>
    where
        F: FnOnce(&PortConfig) -> Result<Option<Box<dyn Stream>>>,
    {
        let mut session = self.session.lock();
        if let Some(existing) = session.as_ref() {
            if let Some(stream) = &existing.stream {
                if stream.lock().is_none() {
                    return Err(Error::Inconsistent(self.name.clone()));
                }
            }
            return Ok(());
        }

        let stream = attach(&self.config)?;
        *session = Some(Session {
            events: Some(Events::bounded(self.config.channel_capacity)),
            stop: StopSignal::new(),
            stream: stream.map(|s| Arc::new(Mutex::new(Some(s)))),
            running: false,
        });
        debug!("Opened port {}", self.name);
        Ok(())
    }

    pub(crate) fn close(&self) -> Result<()> {
        let Some(session) = self.session.lock().take() else {
            return Ok(());
        };

        session.stop.signal();
        let result = match &session.stream {
            Some(shared) => match shared.lock().take() {
                Some(mut stream) => stream.close(),
                None => Ok(()),
            },
            None => Ok(()),
        };
        drop(session);

        debug!("Closed port {}", self.name);
        result
    }

    /// Claim the loop for this session. `None` if it is already running.
    pub(crate) fn begin_run(&self) -> Result<Option<RunHandles>> {
        let mut guard = self.session.lock();
        let session = guard
            .as_mut()
            .ok_or_else(|| Error::NotOpen(format!("port {}", self.name)))?;
        if session.running {
            debug!("Port {} is already running", self.name);
            return Ok(None);
        }
        let events = session
            .events
            .clone()
            .ok_or_else(|| Error::Inconsistent(self.name.clone()))?;
        session.running = true;
        Ok(Some(RunHandles {
            events,
            stop: session.stop.token(),
            stream: session.stream.clone(),
        }))
    }

    /// Drop the session's channel after a fatal loop error. Readers see the
    /// channel disconnect once the loop's own sender is gone; the session
    /// stays open until `close`.
    pub(crate) fn detach_events(&self) {
        if let Some(session) = self.session.lock().as_mut() {
            if session.events.take().is_some() {
                debug!("Detached channel of port {}", self.name);
            }
        }
    }
}

impl std::fmt::Debug for PortCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Port")
            .field("name", &self.name)
            .field("open", &self.is_open())
            .finish()
    }
}
