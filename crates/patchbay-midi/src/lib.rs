//! MIDI event model for the patchbay event bus.
//!
//! Events are a closed set of variants moved between devices. Each one can be
//! converted to the packed raw message exchanged with a transport, and raw
//! messages read from a transport are classified back into events.
//!
//! ```
//! use patchbay_midi::{Event, RawMessage};
//!
//! let raw = RawMessage::unpack(0x0064_3C90);
//! let event = Event::classify(raw);
//! assert_eq!(event, Event::note_on(0, 60, 100));
//! assert_eq!(event.to_raw_message(), raw);
//! ```

pub mod error;
pub use error::{Error, Result};

mod controller;
pub use controller::{controller_name, UNKNOWN_CONTROLLER};

mod event;
pub use event::Event;

mod message;
pub use message::{command, RawFrame, RawMessage};
