use super::{close_all, drain_join, forward, open_all, port_events, start_device, Connector};
use crate::device::Device;
use crate::error::{Error, Result};
use crate::stop::StopSignal;
use crate::task::Tasks;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

/// Many-to-one connector: events from every source are merged into `to`.
///
/// Each source gets its own forwarding thread, so order is kept per source
/// but not across sources. All branches observe the same stop signal.
#[derive(Clone)]
pub struct Funnel {
    inner: Arc<FunnelInner>,
}

struct FunnelInner {
    to: Arc<dyn Device>,
    from: Vec<Arc<dyn Device>>,
    stop: StopSignal,
    tasks: Mutex<Tasks>,
}

impl Funnel {
    /// Opens `to`, then every source in order.
    pub fn new(to: Arc<dyn Device>, from: Vec<Arc<dyn Device>>) -> Result<Self> {
        if from.is_empty() {
            return Err(Error::InvalidTopology(format!(
                "funnel into {} has no sources",
                to.name()
            )));
        }
        let mut all = Vec::with_capacity(from.len() + 1);
        all.push(&to);
        all.extend(from.iter());
        open_all(&all)?;

        debug!("Funnel {} sources -> {} ready", from.len(), to.name());
        Ok(Self {
            inner: Arc::new(FunnelInner {
                to,
                from,
                stop: StopSignal::new(),
                tasks: Mutex::new(Tasks::new()),
            }),
        })
    }

    pub fn destination(&self) -> &Arc<dyn Device> {
        &self.inner.to
    }

    pub fn sources(&self) -> &[Arc<dyn Device>] {
        &self.inner.from
    }
}

impl Connector for Funnel {
    fn connect(&self) -> Result<()> {
        let inner = &self.inner;
        start_device(&inner.to, &inner.tasks)?;
        let sink = port_events(&inner.to.in_port())?.sender();

        for device in &inner.from {
            start_device(device, &inner.tasks)?;
            let source = port_events(&device.out_port())?.receiver();
            let sink = sink.clone();
            let token = inner.stop.token();
            let label = format!("funnel {} -> {}", device.name(), inner.to.name());
            inner
                .tasks
                .lock()
                .spawn(format!("funnel-{}", device.name()), move || {
                    forward(&label, &source, &sink, &token, None);
                    Ok(())
                })?;
        }
        Ok(())
    }

    fn stop(&self) -> Result<()> {
        let inner = &self.inner;
        if inner.stop.signal() {
            debug!("Stopping funnel into {}", inner.to.name());
        }
        let closed = close_all(std::iter::once(&inner.to).chain(inner.from.iter()));
        let joined = drain_join(&inner.tasks);
        closed.and(joined)
    }
}

impl std::fmt::Debug for Funnel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let from: Vec<&str> = self.inner.from.iter().map(|d| d.name()).collect();
        f.debug_struct("Funnel")
            .field("from", &from)
            .field("to", &self.inner.to.name())
            .finish()
    }
}
