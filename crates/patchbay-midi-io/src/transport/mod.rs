//! Transport boundary.
//!
//! A transport moves raw frames to and from physical or virtual hardware. The
//! routing core only needs to open a stream for a device, poll it, read or
//! write one frame at a time and close it again; everything else about the
//! hardware stays behind this trait.

mod virtual_transport;

pub use virtual_transport::{VirtualEndpoint, VirtualTransport};

use crate::error::Result;
use patchbay_midi::RawFrame;

/// Transport-level device identifier.
pub type DeviceId = usize;

pub trait Transport: Send + Sync {
    /// Open a stream that reads frames the device transmits (used by output ports).
    fn open_input_stream(&self, device: DeviceId, buffer_size: usize) -> Result<Box<dyn Stream>>;

    /// Open a stream that writes frames to the device (used by input ports).
    fn open_output_stream(&self, device: DeviceId, buffer_size: usize)
        -> Result<Box<dyn Stream>>;
}

/// An open transport stream.
///
/// `read_frame` is only called after `poll` reported data.
pub trait Stream: Send {
    fn poll(&mut self) -> Result<bool>;

    fn read_frame(&mut self) -> Result<RawFrame>;

    fn write_frame(&mut self, frame: RawFrame) -> Result<()>;

    fn close(&mut self) -> Result<()>;
}
