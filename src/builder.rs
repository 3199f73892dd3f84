//! Builder for configuring and constructing a `Patchbay`.

use crate::{Patchbay, Result};
use patchbay_midi_io::{PortConfig, Transport};
use std::sync::Arc;

/// Without a transport, only in-memory loopback devices can be created. With
/// the `midi-hardware` feature, `.hardware()` selects the system's MIDI
/// ports.
///
/// # Example
///
/// ```
/// use patchbay::prelude::*;
/// use std::sync::Arc;
///
/// let transport = Arc::new(VirtualTransport::new());
/// transport.add_device(0);
///
/// let patchbay = Patchbay::builder()
///     .transport(transport)
///     .config(PortConfig::default().with_channel_capacity(64))
///     .build()
///     .unwrap();
///
/// let keys = patchbay.device("keys", 0, 0).unwrap();
/// assert_eq!(keys.name(), "keys");
/// ```
#[derive(Default)]
pub struct PatchbayBuilder {
    transport: Option<Arc<dyn Transport>>,
    config: PortConfig,
}

impl PatchbayBuilder {
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Use the system's MIDI ports through midir.
    #[cfg(feature = "midi-hardware")]
    pub fn hardware(mut self, client_name: impl Into<String>) -> Self {
        self.transport = Some(Arc::new(patchbay_midi_io::MidirTransport::new(client_name)));
        self
    }

    /// Port settings for every device the patchbay creates.
    /// Default: [`PortConfig::default`]
    pub fn config(mut self, config: PortConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<Patchbay> {
        Ok(Patchbay::from_parts(self.transport, self.config))
    }
}
