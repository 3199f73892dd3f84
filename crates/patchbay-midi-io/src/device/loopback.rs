use super::{spawn_port_loops, Device};
use crate::config::PortConfig;
use crate::connector::forward;
use crate::error::{Error, Result};
use crate::port::{LoopbackPort, Port};
use crate::stop::StopSignal;
use crate::task::Tasks;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

/// In-memory device with no transport behind it.
///
/// A passive loopback leaves both channels to an external driver: the driver
/// drains the in port and feeds the out port. A thru loopback runs its own
/// loop that copies everything it receives back out.
pub struct LoopbackDevice {
    name: String,
    input: Arc<LoopbackPort>,
    output: Arc<LoopbackPort>,
    thru: bool,
    thru_stop: Mutex<Option<StopSignal>>,
}

impl LoopbackDevice {
    pub fn new(name: impl Into<String>, config: PortConfig) -> Self {
        Self::build(name.into(), config, false)
    }

    /// Loopback that echoes its input to its output while running.
    pub fn thru(name: impl Into<String>, config: PortConfig) -> Self {
        Self::build(name.into(), config, true)
    }

    fn build(name: String, config: PortConfig, thru: bool) -> Self {
        Self {
            input: Arc::new(LoopbackPort::new(format!("{}:in", name), config)),
            output: Arc::new(LoopbackPort::new(format!("{}:out", name), config)),
            name,
            thru,
            thru_stop: Mutex::new(None),
        }
    }

    pub fn input(&self) -> &Arc<LoopbackPort> {
        &self.input
    }

    pub fn output(&self) -> &Arc<LoopbackPort> {
        &self.output
    }

    pub fn is_thru(&self) -> bool {
        self.thru
    }

    fn spawn_thru(&self, tasks: &mut Tasks) -> Result<()> {
        let mut slot = self.thru_stop.lock();
        if slot.is_some() {
            return Ok(());
        }
        let not_open = || Error::NotOpen(format!("device {}", self.name));
        let source = self.input.events().ok_or_else(not_open)?.receiver();
        let sink = self.output.events().ok_or_else(not_open)?.sender();

        let stop = StopSignal::new();
        let token = stop.token();
        let label = format!("{}-thru", self.name);
        tasks.spawn(label.clone(), move || {
            forward(&label, &source, &sink, &token, None);
            Ok(())
        })?;
        *slot = Some(stop);
        Ok(())
    }
}

impl Device for LoopbackDevice {
    fn name(&self) -> &str {
        &self.name
    }

    fn in_port(&self) -> Arc<dyn Port> {
        self.input.clone()
    }

    fn out_port(&self) -> Arc<dyn Port> {
        self.output.clone()
    }

    fn close(&self) -> Result<()> {
        if let Some(stop) = self.thru_stop.lock().take() {
            stop.signal();
            debug!("Stopped thru loop of {}", self.name);
        }
        let input = self.input.close();
        let output = self.output.close();
        input.and(output)
    }

    fn run(&self) -> Result<Tasks> {
        let mut tasks = spawn_port_loops(self)?;
        if self.thru {
            self.spawn_thru(&mut tasks)?;
        }
        Ok(tasks)
    }
}

impl std::fmt::Debug for LoopbackDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoopbackDevice")
            .field("name", &self.name)
            .field("thru", &self.thru)
            .field("open", &self.is_open())
            .finish()
    }
}
