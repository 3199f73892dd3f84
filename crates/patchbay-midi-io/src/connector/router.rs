use super::{close_all, drain_join, forward, open_all, port_events, start_device, Connector};
use crate::config::BUFFER_SIZE;
use crate::device::Device;
use crate::error::{Error, Result};
use crate::stop::{StopSignal, StopToken};
use crate::task::Tasks;
use crossbeam_channel::{bounded, select, Receiver, Sender};
use parking_lot::Mutex;
use patchbay_midi::Event;
use smallvec::SmallVec;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, trace};

type Branches = SmallVec<[Sender<Event>; 4]>;

/// One-to-many connector: every event `from` transmits is delivered to every
/// destination.
///
/// A single fan-out loop reads the source and hands each event to one bounded
/// queue per destination, and a branch thread per destination drains its
/// queue. A slow destination only holds the source back once its own queue
/// is full, and each destination sees events in source order.
#[derive(Clone)]
pub struct Router {
    inner: Arc<RouterInner>,
}

struct RouterInner {
    from: Arc<dyn Device>,
    to: Vec<Arc<dyn Device>>,
    stop: StopSignal,
    tasks: Mutex<Tasks>,
    delivered: Vec<AtomicU64>,
}

impl Router {
    /// Opens `from`, then every destination in order.
    pub fn new(from: Arc<dyn Device>, to: Vec<Arc<dyn Device>>) -> Result<Self> {
        if to.is_empty() {
            return Err(Error::InvalidTopology(format!(
                "router from {} has no destinations",
                from.name()
            )));
        }
        let mut all = Vec::with_capacity(to.len() + 1);
        all.push(&from);
        all.extend(to.iter());
        open_all(&all)?;

        debug!("Router {} -> {} destinations ready", from.name(), to.len());
        let delivered = to.iter().map(|_| AtomicU64::new(0)).collect();
        Ok(Self {
            inner: Arc::new(RouterInner {
                from,
                to,
                stop: StopSignal::new(),
                tasks: Mutex::new(Tasks::new()),
                delivered,
            }),
        })
    }

    pub fn source(&self) -> &Arc<dyn Device> {
        &self.inner.from
    }

    pub fn destinations(&self) -> &[Arc<dyn Device>] {
        &self.inner.to
    }

    /// Events delivered to the destination at `index`.
    pub fn delivered(&self, index: usize) -> Option<u64> {
        self.inner
            .delivered
            .get(index)
            .map(|count| count.load(Ordering::Relaxed))
    }

    fn start(&self) -> Result<(Receiver<Event>, Branches)> {
        let inner = &self.inner;
        start_device(&inner.from, &inner.tasks)?;
        for device in &inner.to {
            start_device(device, &inner.tasks)?;
        }

        let source = port_events(&inner.from.out_port())?.receiver();
        let mut branches = Branches::new();
        for (index, device) in inner.to.iter().enumerate() {
            let sink = port_events(&device.in_port())?.sender();
            let (queue_tx, queue_rx) = bounded(BUFFER_SIZE);
            let router = self.clone();
            let token = inner.stop.token();
            let label = format!("router {} -> {}", inner.from.name(), device.name());
            inner
                .tasks
                .lock()
                .spawn(format!("router-{}", device.name()), move || {
                    forward(
                        &label,
                        &queue_rx,
                        &sink,
                        &token,
                        Some(&router.inner.delivered[index]),
                    );
                    Ok(())
                })?;
            branches.push(queue_tx);
        }
        Ok((source, branches))
    }
}

/// Fan-out pass. Dropping `branches` on return lets every branch drain its
/// queue and finish.
fn fan_out(label: &str, source: &Receiver<Event>, branches: &Branches, stop: &StopToken) {
    loop {
        let event = select! {
            recv(source) -> event => match event {
                Ok(event) => event,
                Err(_) => {
                    debug!("{} source closed", label);
                    return;
                }
            },
            recv(stop.receiver()) -> _ => return,
        };

        trace!("{} {:?}", label, event);
        for branch in branches {
            select! {
                send(branch, event) -> sent => {
                    if sent.is_err() {
                        return;
                    }
                }
                recv(stop.receiver()) -> _ => return,
            }
        }
    }
}

impl Connector for Router {
    fn connect(&self) -> Result<()> {
        let router = self.clone();
        let name = format!("router-{}", self.inner.from.name());
        self.inner.tasks.lock().spawn(name, move || {
            let token = router.inner.stop.token();
            let (source, branches) = match router.start() {
                Ok(started) => started,
                Err(_) if token.is_stopped() => return Ok(()),
                Err(e) => return Err(e),
            };
            let label = format!("router {}", router.inner.from.name());
            fan_out(&label, &source, &branches, &token);
            Ok(())
        })
    }

    fn stop(&self) -> Result<()> {
        let inner = &self.inner;
        if inner.stop.signal() {
            debug!("Stopping router {}", inner.from.name());
        }
        let closed = close_all(std::iter::once(&inner.from).chain(inner.to.iter()));
        let joined = drain_join(&inner.tasks);
        closed.and(joined)
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let to: Vec<&str> = self.inner.to.iter().map(|d| d.name()).collect();
        f.debug_struct("Router")
            .field("from", &self.inner.from.name())
            .field("to", &to)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PortConfig;
    use crate::device::LoopbackDevice;
    use std::time::Duration;

    const TIMEOUT: Duration = Duration::from_secs(2);

    fn loopback(name: &str, capacity: usize) -> Arc<dyn Device> {
        Arc::new(LoopbackDevice::new(
            name,
            PortConfig::default().with_channel_capacity(capacity),
        ))
    }

    #[test]
    fn test_requires_destination() {
        let from = loopback("from", 8);
        assert!(matches!(
            Router::new(from.clone(), vec![]),
            Err(Error::InvalidTopology(_))
        ));
        assert!(!from.is_open());
    }

    #[test]
    fn test_each_destination_in_source_order() {
        let from = loopback("from", 8);
        let to: Vec<_> = (0..3).map(|i| loopback(&format!("to{}", i), 64)).collect();
        let router = Router::new(from.clone(), to.clone()).unwrap();
        router.connect().unwrap();

        let source = from.out_port().events().unwrap();
        for key in 0..10 {
            source.send(Event::note_on(1, key, 100)).unwrap();
        }
        for device in &to {
            let sink = device.in_port().events().unwrap();
            for key in 0..10 {
                assert_eq!(sink.recv_timeout(TIMEOUT), Some(Event::note_on(1, key, 100)));
            }
        }

        router.stop().unwrap();
        for index in 0..3 {
            assert_eq!(router.delivered(index), Some(10));
        }
        assert_eq!(router.delivered(3), None);
    }

    #[test]
    fn test_slow_destination_does_not_block_others() {
        let from = loopback("from", 8);
        // Nobody drains `slow`; its channel fills after one event.
        let slow = loopback("slow", 1);
        let fast = loopback("fast", 64);
        let router = Router::new(from.clone(), vec![slow.clone(), fast.clone()]).unwrap();
        router.connect().unwrap();

        let source = from.out_port().events().unwrap();
        for key in 0..5 {
            source.send(Event::note_on(0, key, 1)).unwrap();
        }
        let sink = fast.in_port().events().unwrap();
        for key in 0..5 {
            assert_eq!(sink.recv_timeout(TIMEOUT), Some(Event::note_on(0, key, 1)));
        }
        assert_eq!(slow.in_port().events().unwrap().len(), 1);

        router.stop().unwrap();
    }
}
