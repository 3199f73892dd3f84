//! Main patchbay: creates devices and owns the connectors wired between them.

use crate::{Error, Result};
use parking_lot::Mutex;
use patchbay_midi_io::{
    Chain, Connector, Device, Funnel, LoopbackDevice, Pipe, PortConfig, Router, SystemDevice,
    Transport,
};
use std::sync::Arc;
use tracing::{debug, warn};

/// Devices created here share one transport and one [`PortConfig`].
/// Connectors started with [`Patchbay::patch`] are stopped, newest first,
/// by [`Patchbay::shutdown`] or when the patchbay is dropped.
pub struct Patchbay {
    transport: Option<Arc<dyn Transport>>,
    config: PortConfig,
    patches: Mutex<Vec<Arc<dyn Connector>>>,
}

impl Patchbay {
    pub fn builder() -> crate::PatchbayBuilder {
        crate::PatchbayBuilder::default()
    }

    pub(crate) fn from_parts(transport: Option<Arc<dyn Transport>>, config: PortConfig) -> Self {
        Self {
            transport,
            config,
            patches: Mutex::new(Vec::new()),
        }
    }

    pub fn config(&self) -> &PortConfig {
        &self.config
    }

    pub fn transport(&self) -> Option<&Arc<dyn Transport>> {
        self.transport.as_ref()
    }

    // =========================================================================
    // Devices
    // =========================================================================

    /// Transport-backed device receiving through `input` and transmitting
    /// through `output`.
    pub fn device(
        &self,
        name: impl Into<String>,
        input: patchbay_midi_io::DeviceId,
        output: patchbay_midi_io::DeviceId,
    ) -> Result<Arc<dyn Device>> {
        let transport = self.transport.clone().ok_or(Error::NoTransport)?;
        Ok(Arc::new(SystemDevice::new(
            name,
            transport,
            input,
            output,
            self.config,
        )))
    }

    /// In-memory device driven from outside through its port channels.
    pub fn loopback(&self, name: impl Into<String>) -> Arc<dyn Device> {
        Arc::new(LoopbackDevice::new(name, self.config))
    }

    /// In-memory device that echoes what it receives.
    pub fn thru(&self, name: impl Into<String>) -> Arc<dyn Device> {
        Arc::new(LoopbackDevice::thru(name, self.config))
    }

    // =========================================================================
    // Connectors
    // =========================================================================

    pub fn pipe(&self, from: Arc<dyn Device>, to: Arc<dyn Device>) -> Result<Arc<Pipe>> {
        self.patch(Pipe::new(from, to)?)
    }

    pub fn router(&self, from: Arc<dyn Device>, to: Vec<Arc<dyn Device>>) -> Result<Arc<Router>> {
        self.patch(Router::new(from, to)?)
    }

    pub fn funnel(&self, to: Arc<dyn Device>, from: Vec<Arc<dyn Device>>) -> Result<Arc<Funnel>> {
        self.patch(Funnel::new(to, from)?)
    }

    pub fn chain(&self, devices: Vec<Arc<dyn Device>>) -> Result<Arc<Chain>> {
        self.patch(Chain::new(devices)?)
    }

    /// Connect `connector` and keep it until shutdown.
    pub fn patch<C: Connector + 'static>(&self, connector: C) -> Result<Arc<C>> {
        let connector = Arc::new(connector);
        if let Err(e) = connector.connect() {
            if let Err(stop_err) = connector.stop() {
                warn!("Stopping a connector that failed to connect: {}", stop_err);
            }
            return Err(e.into());
        }
        self.patches.lock().push(connector.clone());
        Ok(connector)
    }

    pub fn patch_count(&self) -> usize {
        self.patches.lock().len()
    }

    /// Stop every connector, newest first. All are stopped even if some
    /// fail; the first failure is returned.
    pub fn shutdown(&self) -> Result<()> {
        let patches = std::mem::take(&mut *self.patches.lock());
        if !patches.is_empty() {
            debug!("Shutting down {} connectors", patches.len());
        }
        let mut first_error = None;
        for connector in patches.iter().rev() {
            if let Err(e) = connector.stop() {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), |e| Err(e.into()))
    }
}

impl Drop for Patchbay {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            warn!("Patchbay shutdown: {}", e);
        }
    }
}

impl std::fmt::Debug for Patchbay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Patchbay")
            .field("has_transport", &self.transport.is_some())
            .field("config", &self.config)
            .field("patches", &self.patch_count())
            .finish()
    }
}
