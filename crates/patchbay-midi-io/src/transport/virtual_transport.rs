//! In-memory transport.
//!
//! Each virtual device is a pair of queues: frames the "hardware" transmits
//! (read by streams opened with `open_input_stream`) and frames written to it
//! (by streams opened with `open_output_stream`). Faults can be switched on per
//! device to exercise the error paths of ports and connectors.

use super::{DeviceId, Stream, Transport};
use crate::error::{Error, Result};
use crossbeam_channel::{unbounded, Receiver, Sender};
use dashmap::DashMap;
use patchbay_midi::{RawFrame, RawMessage};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

enum Incoming {
    Frame(RawFrame),
    Bytes(Vec<u8>),
}

struct EndpointInner {
    id: DeviceId,
    incoming_tx: Sender<Incoming>,
    incoming_rx: Receiver<Incoming>,
    written_tx: Sender<RawFrame>,
    written_rx: Receiver<RawFrame>,
    fail_open: AtomicBool,
    fail_poll: AtomicBool,
    fail_close: AtomicBool,
    opened: AtomicUsize,
    closed: AtomicUsize,
}

/// Driver handle for one virtual device.
#[derive(Clone)]
pub struct VirtualEndpoint {
    inner: Arc<EndpointInner>,
}

impl VirtualEndpoint {
    fn new(id: DeviceId) -> Self {
        let (incoming_tx, incoming_rx) = unbounded();
        let (written_tx, written_rx) = unbounded();
        Self {
            inner: Arc::new(EndpointInner {
                id,
                incoming_tx,
                incoming_rx,
                written_tx,
                written_rx,
                fail_open: AtomicBool::new(false),
                fail_poll: AtomicBool::new(false),
                fail_close: AtomicBool::new(false),
                opened: AtomicUsize::new(0),
                closed: AtomicUsize::new(0),
            }),
        }
    }

    pub fn id(&self) -> DeviceId {
        self.inner.id
    }

    /// Queue a frame as if the hardware had sent it.
    pub fn transmit(&self, frame: RawFrame) {
        let _ = self.inner.incoming_tx.send(Incoming::Frame(frame));
    }

    pub fn transmit_message(&self, message: RawMessage) {
        self.transmit(RawFrame::new(message, 0));
    }

    /// Queue wire bytes, decoded when the stream reads them.
    pub fn transmit_bytes(&self, bytes: &[u8]) {
        let _ = self.inner.incoming_tx.send(Incoming::Bytes(bytes.to_vec()));
    }

    /// Queue a frame that fails to decode.
    pub fn transmit_corrupt(&self) {
        self.transmit_bytes(&[0x3C, 0x40]);
    }

    /// Next frame written to this device, waiting up to `timeout`.
    pub fn recv_written(&self, timeout: Duration) -> Option<RawFrame> {
        self.inner.written_rx.recv_timeout(timeout).ok()
    }

    pub fn try_recv_written(&self) -> Option<RawFrame> {
        self.inner.written_rx.try_recv().ok()
    }

    pub fn pending_incoming(&self) -> usize {
        self.inner.incoming_rx.len()
    }

    pub fn fail_open(&self, fail: bool) {
        self.inner.fail_open.store(fail, Ordering::SeqCst);
    }

    pub fn fail_poll(&self, fail: bool) {
        self.inner.fail_poll.store(fail, Ordering::SeqCst);
    }

    pub fn fail_close(&self, fail: bool) {
        self.inner.fail_close.store(fail, Ordering::SeqCst);
    }

    /// Streams opened on this device so far.
    pub fn open_count(&self) -> usize {
        self.inner.opened.load(Ordering::SeqCst)
    }

    /// Streams closed on this device so far.
    pub fn close_count(&self) -> usize {
        self.inner.closed.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for VirtualEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VirtualEndpoint")
            .field("id", &self.inner.id)
            .field("opened", &self.open_count())
            .field("closed", &self.close_count())
            .finish()
    }
}

/// Transport backed entirely by memory.
#[derive(Default)]
pub struct VirtualTransport {
    endpoints: DashMap<DeviceId, VirtualEndpoint>,
}

impl VirtualTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a device, or return the existing handle for `id`.
    pub fn add_device(&self, id: DeviceId) -> VirtualEndpoint {
        self.endpoints
            .entry(id)
            .or_insert_with(|| VirtualEndpoint::new(id))
            .value()
            .clone()
    }

    pub fn endpoint(&self, id: DeviceId) -> Option<VirtualEndpoint> {
        self.endpoints.get(&id).map(|e| e.value().clone())
    }

    fn open(&self, device: DeviceId) -> Result<Box<dyn Stream>> {
        let endpoint = self
            .endpoint(device)
            .ok_or_else(|| Error::Transport(format!("no virtual device {}", device)))?;
        if endpoint.inner.fail_open.load(Ordering::SeqCst) {
            return Err(Error::Transport(format!(
                "virtual device {} refused to open",
                device
            )));
        }
        endpoint.inner.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(VirtualStream { endpoint }))
    }
}

impl Transport for VirtualTransport {
    fn open_input_stream(&self, device: DeviceId, _buffer_size: usize) -> Result<Box<dyn Stream>> {
        self.open(device)
    }

    fn open_output_stream(
        &self,
        device: DeviceId,
        _buffer_size: usize,
    ) -> Result<Box<dyn Stream>> {
        self.open(device)
    }
}

struct VirtualStream {
    endpoint: VirtualEndpoint,
}

impl Stream for VirtualStream {
    fn poll(&mut self) -> Result<bool> {
        let inner = &self.endpoint.inner;
        if inner.fail_poll.load(Ordering::SeqCst) {
            return Err(Error::Transport(format!(
                "virtual device {} poll failed",
                inner.id
            )));
        }
        Ok(!inner.incoming_rx.is_empty())
    }

    fn read_frame(&mut self) -> Result<RawFrame> {
        match self.endpoint.inner.incoming_rx.try_recv() {
            Ok(Incoming::Frame(frame)) => Ok(frame),
            Ok(Incoming::Bytes(bytes)) => Ok(RawFrame::new(RawMessage::from_bytes(&bytes)?, 0)),
            Err(_) => Err(Error::Decode("no frame available".to_string())),
        }
    }

    fn write_frame(&mut self, frame: RawFrame) -> Result<()> {
        self.endpoint
            .inner
            .written_tx
            .send(frame)
            .map_err(|e| Error::Transport(e.to_string()))
    }

    fn close(&mut self) -> Result<()> {
        let inner = &self.endpoint.inner;
        inner.closed.fetch_add(1, Ordering::SeqCst);
        if inner.fail_close.load(Ordering::SeqCst) {
            return Err(Error::Transport(format!(
                "virtual device {} failed to close",
                inner.id
            )));
        }
        Ok(())
    }
}
