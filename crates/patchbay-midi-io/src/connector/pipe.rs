use super::{close_all, drain_join, forward, open_all, port_events, start_device, Connector};
use crate::device::Device;
use crate::error::Result;
use crate::stop::StopSignal;
use crate::task::Tasks;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// One-to-one connector: everything `from` transmits is received by `to`, in
/// order.
#[derive(Clone)]
pub struct Pipe {
    inner: Arc<PipeInner>,
}

struct PipeInner {
    from: Arc<dyn Device>,
    to: Arc<dyn Device>,
    stop: StopSignal,
    tasks: Mutex<Tasks>,
    forwarded: AtomicU64,
}

impl Pipe {
    /// Opens `from`, then `to`.
    pub fn new(from: Arc<dyn Device>, to: Arc<dyn Device>) -> Result<Self> {
        open_all(&[&from, &to])?;
        debug!("Pipe {} -> {} ready", from.name(), to.name());
        Ok(Self {
            inner: Arc::new(PipeInner {
                from,
                to,
                stop: StopSignal::new(),
                tasks: Mutex::new(Tasks::new()),
                forwarded: AtomicU64::new(0),
            }),
        })
    }

    pub fn source(&self) -> &Arc<dyn Device> {
        &self.inner.from
    }

    pub fn destination(&self) -> &Arc<dyn Device> {
        &self.inner.to
    }

    /// Number of events handed to the destination so far.
    pub fn forwarded(&self) -> u64 {
        self.inner.forwarded.load(Ordering::Relaxed)
    }

    /// Start both devices and forward on the calling thread until the source
    /// closes or the pipe is stopped.
    pub fn run(&self) -> Result<()> {
        let inner = &self.inner;
        let token = inner.stop.token();

        let channels = start_device(&inner.from, &inner.tasks)
            .and_then(|_| start_device(&inner.to, &inner.tasks))
            .and_then(|_| {
                let source = port_events(&inner.from.out_port())?.receiver();
                let sink = port_events(&inner.to.in_port())?.sender();
                Ok((source, sink))
            });
        let (source, sink) = match channels {
            Ok(channels) => channels,
            // Stopped before it got going; the devices are already closed.
            Err(_) if token.is_stopped() => return Ok(()),
            Err(e) => return Err(e),
        };

        let label = format!("pipe {} -> {}", inner.from.name(), inner.to.name());
        forward(&label, &source, &sink, &token, Some(&inner.forwarded));
        Ok(())
    }
}

impl Connector for Pipe {
    fn connect(&self) -> Result<()> {
        let pipe = self.clone();
        let name = format!("pipe-{}", self.inner.from.name());
        self.inner.tasks.lock().spawn(name, move || pipe.run())
    }

    fn stop(&self) -> Result<()> {
        let inner = &self.inner;
        if inner.stop.signal() {
            debug!("Stopping pipe {} -> {}", inner.from.name(), inner.to.name());
        }
        let closed = close_all([&inner.from, &inner.to]);
        let joined = drain_join(&inner.tasks);
        closed.and(joined)
    }
}

impl std::fmt::Debug for Pipe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipe")
            .field("from", &self.inner.from.name())
            .field("to", &self.inner.to.name())
            .field("forwarded", &self.forwarded())
            .finish()
    }
}
