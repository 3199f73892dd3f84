//! # Patchbay - MIDI event bus
//!
//! Moves MIDI events between devices over bounded, backpressured channels.
//!
//! ## Architecture
//!
//! Patchbay is an umbrella crate that coordinates:
//! - **patchbay-midi** - Event model (typed events, raw messages, byte codec)
//! - **patchbay-midi-io** - Routing (transports, ports, devices, connectors)
//!
//! ## Quick Start
//!
//! ```
//! use patchbay::prelude::*;
//! use std::time::Duration;
//!
//! let patchbay = Patchbay::builder().build().unwrap();
//!
//! let keys = patchbay.thru("keys");
//! let synth = patchbay.thru("synth");
//! patchbay.pipe(keys.clone(), synth.clone()).unwrap();
//!
//! keys.in_port().events().unwrap().send(Event::note_on(0, 60, 100)).unwrap();
//! let played = synth.out_port().events().unwrap().recv_timeout(Duration::from_secs(1));
//! assert_eq!(played, Some(Event::note_on(0, 60, 100)));
//!
//! patchbay.shutdown().unwrap();
//! ```
//!
//! ## Feature Flags
//!
//! - `midi-hardware` - Hardware MIDI ports through midir

/// Re-export of patchbay-midi for direct access
pub use patchbay_midi as midi;

/// Re-export of patchbay-midi-io for direct access
pub use patchbay_midi_io as io;

pub use patchbay_midi::{command, controller_name, Event, RawFrame, RawMessage};
pub use patchbay_midi_io::{
    Chain, Connector, Device, DeviceId, Events, Funnel, InPort, LoopbackDevice, LoopbackPort,
    OutPort, Pipe, Port, PortConfig, Router, Stream, SystemDevice, Transport, VirtualEndpoint,
    VirtualTransport,
};

#[cfg(feature = "midi-hardware")]
pub use patchbay_midi_io::{list_input_devices, list_output_devices, MidiDeviceInfo, MidirTransport};

mod error;
pub use error::{Error, Result};

mod builder;
mod patchbay;

pub use crate::patchbay::Patchbay;
pub use builder::PatchbayBuilder;

/// Convenience prelude for common imports
pub mod prelude {
    pub use crate::{Patchbay, PatchbayBuilder};

    // Events
    pub use crate::{Event, RawMessage};

    // Routing
    pub use crate::{
        Chain, Connector, Device, Funnel, LoopbackDevice, Pipe, Port, PortConfig, Router,
        SystemDevice, Transport, VirtualTransport,
    };

    #[cfg(feature = "midi-hardware")]
    pub use crate::MidirTransport;
}
