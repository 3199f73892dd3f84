//! Devices: one reception port plus one transmission port, exposed to
//! connectors as a single opaque endpoint.

mod loopback;
mod system;

pub use loopback::LoopbackDevice;
pub use system::SystemDevice;

use crate::error::{Error, Result};
use crate::port::Port;
use crate::task::Tasks;
use std::sync::Arc;

pub trait Device: Send + Sync {
    fn name(&self) -> &str;

    /// Where the device receives events.
    fn in_port(&self) -> Arc<dyn Port>;

    /// Where the device transmits events.
    fn out_port(&self) -> Arc<dyn Port>;

    /// Open the in port, then the out port. Stops at the first failure without
    /// closing a port that already opened.
    fn open(&self) -> Result<()> {
        self.in_port().open()?;
        self.out_port().open()
    }

    /// Close both ports, returning the first error.
    fn close(&self) -> Result<()> {
        let input = self.in_port().close();
        let output = self.out_port().close();
        input.and(output)
    }

    fn is_open(&self) -> bool {
        self.in_port().is_open() && self.out_port().is_open()
    }

    /// Start both port loops on their own threads and return immediately.
    fn run(&self) -> Result<Tasks> {
        spawn_port_loops(self)
    }
}

pub(crate) fn spawn_port_loops<D: Device + ?Sized>(device: &D) -> Result<Tasks> {
    if !device.is_open() {
        return Err(Error::NotOpen(format!("device {}", device.name())));
    }
    let mut tasks = Tasks::new();
    for port in [device.in_port(), device.out_port()] {
        let name = port.name().to_string();
        tasks.spawn(name, move || match port.run() {
            // Closed between the spawn and the loop claiming its session.
            Err(Error::NotOpen(_)) if !port.is_open() => Ok(()),
            result => result,
        })?;
    }
    Ok(tasks)
}

impl std::fmt::Debug for dyn Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("name", &self.name())
            .field("open", &self.is_open())
            .finish()
    }
}
