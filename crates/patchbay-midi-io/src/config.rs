//! Port configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Capacity of every port's event channel unless overridden.
pub const BUFFER_SIZE: usize = 256;

/// Latency buffer requested from the transport when a stream is opened.
pub const STREAM_BUFFER: usize = 512;

/// How long an output port sleeps when the transport has nothing to read.
pub const POLL_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortConfig {
    /// Bounded event channel size; a full channel blocks the upstream forwarder.
    pub channel_capacity: usize,
    pub stream_buffer: usize,
    pub poll_interval: Duration,
}

impl Default for PortConfig {
    fn default() -> Self {
        Self {
            channel_capacity: BUFFER_SIZE,
            stream_buffer: STREAM_BUFFER,
            poll_interval: POLL_INTERVAL,
        }
    }
}

impl PortConfig {
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        // A zero-capacity channel would turn every publish into a rendezvous
        self.channel_capacity = capacity.max(1);
        self
    }

    pub fn with_stream_buffer(mut self, size: usize) -> Self {
        self.stream_buffer = size;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}
