use super::{close_all, open_all, Connector, Pipe};
use crate::device::Device;
use crate::error::{Error, Result};
use std::sync::Arc;
use tracing::{debug, warn};

/// Devices in series: `d0 -> d1 -> ... -> dn`, one [`Pipe`] per link.
pub struct Chain {
    devices: Vec<Arc<dyn Device>>,
    pipes: Vec<Pipe>,
}

impl Chain {
    pub fn new(devices: Vec<Arc<dyn Device>>) -> Result<Self> {
        if devices.len() < 2 {
            return Err(Error::InvalidTopology(format!(
                "chain needs at least 2 devices, got {}",
                devices.len()
            )));
        }

        // Open everything up front so a failure can be rolled back as a whole.
        let refs: Vec<&Arc<dyn Device>> = devices.iter().collect();
        let opened = open_all(&refs)?;

        let mut pipes = Vec::with_capacity(devices.len() - 1);
        for link in devices.windows(2) {
            match Pipe::new(Arc::clone(&link[0]), Arc::clone(&link[1])) {
                Ok(pipe) => pipes.push(pipe),
                Err(e) => {
                    if let Err(close_err) = close_all(opened) {
                        warn!("Chain rollback failed: {}", close_err);
                    }
                    return Err(e);
                }
            }
        }

        debug!("Chain of {} devices ready", devices.len());
        Ok(Self { devices, pipes })
    }

    pub fn devices(&self) -> &[Arc<dyn Device>] {
        &self.devices
    }

    pub fn pipes(&self) -> &[Pipe] {
        &self.pipes
    }
}

impl Connector for Chain {
    fn connect(&self) -> Result<()> {
        for pipe in &self.pipes {
            pipe.connect()?;
        }
        Ok(())
    }

    /// Stops every pipe even if an earlier one fails.
    fn stop(&self) -> Result<()> {
        let mut first_error = None;
        for pipe in &self.pipes {
            if let Err(e) = pipe.stop() {
                warn!("Stopping {:?} failed: {}", pipe, e);
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

impl std::fmt::Debug for Chain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let devices: Vec<&str> = self.devices.iter().map(|d| d.name()).collect();
        f.debug_struct("Chain").field("devices", &devices).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PortConfig;
    use crate::device::{LoopbackDevice, SystemDevice};
    use crate::port::Port;
    use crate::transport::VirtualTransport;
    use patchbay_midi::Event;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn thru(name: &str) -> Arc<dyn Device> {
        Arc::new(LoopbackDevice::thru(name, PortConfig::default()))
    }

    #[test]
    fn test_needs_two_devices() {
        assert!(matches!(Chain::new(vec![]), Err(Error::InvalidTopology(_))));
        assert!(matches!(
            Chain::new(vec![thru("solo")]),
            Err(Error::InvalidTopology(_))
        ));
    }

    #[test]
    fn test_builds_one_pipe_per_link() {
        let chain = Chain::new(vec![thru("a"), thru("b"), thru("c"), thru("d")]).unwrap();
        let links: Vec<(&str, &str)> = chain
            .pipes()
            .iter()
            .map(|p| (p.source().name(), p.destination().name()))
            .collect();
        assert_eq!(links, vec![("a", "b"), ("b", "c"), ("c", "d")]);
        chain.stop().unwrap();
    }

    #[test]
    fn test_event_travels_the_whole_chain() {
        let head = thru("head");
        let tail: Arc<dyn Device> = Arc::new(LoopbackDevice::new("tail", PortConfig::default()));
        let chain = Chain::new(vec![head.clone(), thru("middle"), tail.clone()]).unwrap();
        chain.connect().unwrap();

        head.in_port()
            .events()
            .unwrap()
            .send(Event::note_on(5, 72, 33))
            .unwrap();
        let arrived = tail
            .in_port()
            .events()
            .unwrap()
            .recv_timeout(Duration::from_secs(2));
        assert_eq!(arrived, Some(Event::note_on(5, 72, 33)));

        chain.stop().unwrap();
        assert!(chain.pipes().iter().all(|p| p.forwarded() == 1));
        assert!(chain.devices().iter().all(|d| !d.is_open()));
    }

    #[test]
    fn test_failed_link_rolls_back() {
        let transport = Arc::new(VirtualTransport::new());
        transport.add_device(0).fail_open(true);
        let broken: Arc<dyn Device> = Arc::new(SystemDevice::duplex(
            "broken",
            transport,
            0,
            PortConfig::default(),
        ));
        let first = thru("first");

        let err = Chain::new(vec![first.clone(), thru("second"), broken]).unwrap_err();
        assert!(matches!(err, Error::Topology { ref device, .. } if device == "broken"));
        assert!(!first.is_open());
    }

    /// Opens once, then refuses every later open.
    struct OpensOnce {
        inner: LoopbackDevice,
        opens: AtomicUsize,
    }

    impl Device for OpensOnce {
        fn name(&self) -> &str {
            self.inner.name()
        }

        fn in_port(&self) -> Arc<dyn Port> {
            self.inner.in_port()
        }

        fn out_port(&self) -> Arc<dyn Port> {
            self.inner.out_port()
        }

        fn open(&self) -> Result<()> {
            if self.opens.fetch_add(1, Ordering::SeqCst) > 0 {
                return Err(Error::Transport("already used".into()));
            }
            self.inner.open()
        }
    }

    #[test]
    fn test_failed_link_keeps_devices_opened_elsewhere() {
        let already: Arc<dyn Device> =
            Arc::new(LoopbackDevice::new("already", PortConfig::default()));
        already.open().unwrap();
        let once: Arc<dyn Device> = Arc::new(OpensOnce {
            inner: LoopbackDevice::new("once", PortConfig::default()),
            opens: AtomicUsize::new(0),
        });

        let err = Chain::new(vec![already.clone(), once.clone()]).unwrap_err();
        assert!(matches!(err, Error::Topology { ref device, .. } if device == "once"));
        assert!(already.is_open());
        assert!(!once.is_open());
        already.close().unwrap();
    }

    #[test]
    fn test_stop_continues_past_failures() {
        let transport = Arc::new(VirtualTransport::new());
        let endpoint = transport.add_device(0);
        let system: Arc<dyn Device> = Arc::new(SystemDevice::duplex(
            "system",
            transport,
            0,
            PortConfig::default(),
        ));
        let chain = Chain::new(vec![thru("a"), system, thru("b")]).unwrap();

        endpoint.fail_close(true);
        assert!(chain.stop().is_err());
        assert!(chain.devices().iter().all(|d| !d.is_open()));
    }
}
