use super::{Events, Port, PortCore};
use crate::config::PortConfig;
use crate::error::Result;

/// Transport-less port used for in-memory devices.
///
/// Open and close only manage the channel. The loop is a no-op: whoever owns
/// the device reads and writes the channel directly.
pub struct LoopbackPort {
    core: PortCore,
}

impl LoopbackPort {
    pub fn new(name: impl Into<String>, config: PortConfig) -> Self {
        Self {
            core: PortCore::new(name.into(), config),
        }
    }
}

impl Port for LoopbackPort {
    fn name(&self) -> &str {
        self.core.name()
    }

    fn open(&self) -> Result<()> {
        self.core.open(|_| Ok(None))
    }

    fn close(&self) -> Result<()> {
        self.core.close()
    }

    fn is_open(&self) -> bool {
        self.core.is_open()
    }

    fn run(&self) -> Result<()> {
        self.core.begin_run().map(|_| ())
    }

    fn events(&self) -> Option<Events> {
        self.core.events()
    }
}

impl std::fmt::Debug for LoopbackPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoopbackPort")
            .field("core", &self.core)
            .finish()
    }
}
