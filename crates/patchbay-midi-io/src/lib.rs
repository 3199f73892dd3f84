//! MIDI routing for patchbay.
//!
//! Transports move raw frames to and from hardware, ports turn them into
//! typed [`Event`]s on bounded channels, devices pair a reception port with a
//! transmission port, and connectors forward events between devices:
//!
//! - [`Pipe`]: one source to one destination
//! - [`Router`]: one source broadcast to many destinations
//! - [`Funnel`]: many sources merged into one destination
//! - [`Chain`]: devices in series, one pipe per link
//!
//! ```
//! use patchbay_midi_io::{Connector, Device, Event, LoopbackDevice, Pipe, PortConfig};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let from: Arc<dyn Device> = Arc::new(LoopbackDevice::new("keys", PortConfig::default()));
//! let to: Arc<dyn Device> = Arc::new(LoopbackDevice::new("synth", PortConfig::default()));
//! let pipe = Pipe::new(from.clone(), to.clone()).unwrap();
//! pipe.connect().unwrap();
//!
//! from.out_port().events().unwrap().send(Event::note_on(0, 60, 100)).unwrap();
//! let received = to.in_port().events().unwrap().recv_timeout(Duration::from_secs(1));
//! assert_eq!(received, Some(Event::note_on(0, 60, 100)));
//!
//! pipe.stop().unwrap();
//! ```
//!
//! Feature gates: `midi-io` (hardware transport via midir).

pub mod error;
pub use error::{Error, Result};

pub mod config;
pub use config::{PortConfig, BUFFER_SIZE, POLL_INTERVAL, STREAM_BUFFER};

mod stop;
pub use stop::{StopSignal, StopToken};

mod task;
pub use task::Tasks;

pub mod transport;
pub use transport::{DeviceId, Stream, Transport, VirtualEndpoint, VirtualTransport};

pub mod port;
pub use port::{Events, InPort, LoopbackPort, OutPort, Port};

pub mod device;
pub use device::{Device, LoopbackDevice, SystemDevice};

pub mod connector;
pub use connector::{Chain, Connector, Funnel, Pipe, Router};

#[cfg(feature = "midi-io")]
pub mod io;

#[cfg(feature = "midi-io")]
pub use io::{list_input_devices, list_output_devices, MidiDeviceInfo, MidirTransport};

pub use patchbay_midi::{command, controller_name, Event, RawFrame, RawMessage};
