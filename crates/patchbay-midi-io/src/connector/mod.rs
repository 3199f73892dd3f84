//! Connectors wire device ports together and own the forwarding threads
//! between them.
//!
//! Every connector opens its devices on construction. If one of them fails to
//! open, the devices this construction opened are closed again and the
//! failure is returned as [`Error::Topology`]; devices that were already open
//! beforehand are left alone.

mod chain;
mod funnel;
mod pipe;
mod router;

pub use chain::Chain;
pub use funnel::Funnel;
pub use pipe::Pipe;
pub use router::Router;

use crate::device::Device;
use crate::error::{Error, Result};
use crate::port::{Events, Port};
use crate::stop::StopToken;
use crate::task::Tasks;
use crossbeam_channel::{select, Receiver, Sender};
use parking_lot::Mutex;
use patchbay_midi::Event;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, trace, warn};

pub trait Connector: Send + Sync {
    /// Start the devices and the forwarding threads, then return.
    fn connect(&self) -> Result<()>;

    /// Signal every forwarding thread, close the devices and join.
    fn stop(&self) -> Result<()>;
}

/// Move events from `source` to `sink` until the source disconnects, the
/// sink disconnects or `stop` fires. An event already taken from the source
/// when stop fires is dropped.
pub(crate) fn forward(
    label: &str,
    source: &Receiver<Event>,
    sink: &Sender<Event>,
    stop: &StopToken,
    counter: Option<&AtomicU64>,
) {
    debug!("{} forwarding", label);
    loop {
        let event = select! {
            recv(source) -> event => match event {
                Ok(event) => event,
                Err(_) => {
                    debug!("{} source closed", label);
                    return;
                }
            },
            recv(stop.receiver()) -> _ => {
                debug!("{} stopped", label);
                return;
            }
        };

        trace!("{} {:?}", label, event);
        select! {
            send(sink, event) -> sent => {
                if sent.is_err() {
                    debug!("{} destination closed", label);
                    return;
                }
            }
            recv(stop.receiver()) -> _ => {
                debug!("{} stopped, dropping {:?}", label, event);
                return;
            }
        }

        if let Some(counter) = counter {
            counter.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// Open `devices` in order, closing again the ones this call opened if any
/// of them fails. On success, returns the devices that were not already open.
pub(crate) fn open_all<'a>(devices: &[&'a Arc<dyn Device>]) -> Result<Vec<&'a Arc<dyn Device>>> {
    let mut opened: Vec<&'a Arc<dyn Device>> = Vec::with_capacity(devices.len());
    for &device in devices {
        let was_open = device.is_open();
        if let Err(e) = device.open() {
            if !was_open {
                opened.push(device);
            }
            for rollback in opened.iter().rev() {
                if let Err(close_err) = rollback.close() {
                    warn!("Rollback close of {} failed: {}", rollback.name(), close_err);
                }
            }
            return Err(Error::Topology {
                device: device.name().to_string(),
                source: Box::new(e),
            });
        }
        if !was_open {
            opened.push(device);
        }
    }
    Ok(opened)
}

/// Close every device, attempting all of them. Returns the first error.
pub(crate) fn close_all<'a, I>(devices: I) -> Result<()>
where
    I: IntoIterator<Item = &'a Arc<dyn Device>>,
{
    let mut first_error = None;
    for device in devices {
        if let Err(e) = device.close() {
            warn!("Closing {} failed: {}", device.name(), e);
            first_error.get_or_insert(e);
        }
    }
    first_error.map_or(Ok(()), Err)
}

/// Join everything registered in `tasks`, including threads that were
/// registered while earlier ones were being joined.
pub(crate) fn drain_join(tasks: &Mutex<Tasks>) -> Result<()> {
    let mut result = Ok(());
    loop {
        let batch = std::mem::take(&mut *tasks.lock());
        if batch.is_empty() {
            return result;
        }
        let joined = batch.join();
        result = result.and(joined);
    }
}

/// The live channel of an open port.
pub(crate) fn port_events(port: &Arc<dyn Port>) -> Result<Events> {
    port.events()
        .ok_or_else(|| Error::NotOpen(format!("port {}", port.name())))
}

/// Start a device's loops and keep their handles in `tasks`.
pub(crate) fn start_device(device: &Arc<dyn Device>, tasks: &Mutex<Tasks>) -> Result<()> {
    let started = device.run()?;
    tasks.lock().extend(started);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PortConfig;
    use crate::device::{LoopbackDevice, SystemDevice};
    use crate::stop::StopSignal;
    use crate::transport::VirtualTransport;
    use crossbeam_channel::bounded;
    use std::thread;

    #[test]
    fn test_forward_until_source_closes() {
        let (source_tx, source) = bounded(8);
        let (sink, sink_rx) = bounded(8);
        let stop = StopSignal::new();
        let counter = AtomicU64::new(0);

        for key in 0..3 {
            source_tx.send(Event::note_on(0, key, 1)).unwrap();
        }
        drop(source_tx);
        forward("test", &source, &sink, &stop.token(), Some(&counter));

        assert_eq!(counter.load(Ordering::Relaxed), 3);
        let keys: Vec<u8> = sink_rx.try_iter().filter_map(|e| e.key()).collect();
        assert_eq!(keys, vec![0, 1, 2]);
    }

    #[test]
    fn test_forward_stops_while_blocked() {
        let (source_tx, source) = bounded(8);
        let (sink, _sink_rx) = bounded(1);
        let stop = StopSignal::new();
        let token = stop.token();

        source_tx.send(Event::note_on(0, 1, 1)).unwrap();
        source_tx.send(Event::note_on(0, 2, 1)).unwrap();
        let handle = thread::spawn(move || forward("test", &source, &sink, &token, None));

        thread::sleep(std::time::Duration::from_millis(20));
        stop.signal();
        handle.join().unwrap();
        drop(source_tx);
    }

    #[test]
    fn test_open_all_rolls_back() {
        let transport = Arc::new(VirtualTransport::new());
        transport.add_device(0);
        let broken = transport.add_device(1);
        broken.fail_open(true);

        let already: Arc<dyn Device> = Arc::new(LoopbackDevice::new("already", PortConfig::default()));
        already.open().unwrap();
        let fresh: Arc<dyn Device> = Arc::new(LoopbackDevice::new("fresh", PortConfig::default()));
        let failing: Arc<dyn Device> = Arc::new(SystemDevice::new(
            "failing",
            transport,
            0,
            1,
            PortConfig::default(),
        ));

        let opened = open_all(&[&already, &fresh]).unwrap();
        assert_eq!(opened.len(), 1);
        assert_eq!(opened[0].name(), "fresh");
        fresh.close().unwrap();

        let err = open_all(&[&already, &fresh, &failing]).unwrap_err();
        assert!(matches!(&err, Error::Topology { device, .. } if device == "failing"));
        assert!(already.is_open());
        assert!(!fresh.is_open());
        assert!(!failing.in_port().is_open());
    }

    #[test]
    fn test_close_all_reports_first_error() {
        let transport = Arc::new(VirtualTransport::new());
        let endpoint = transport.add_device(0);
        let system: Arc<dyn Device> = Arc::new(SystemDevice::duplex(
            "system",
            transport,
            0,
            PortConfig::default(),
        ));
        let other: Arc<dyn Device> = Arc::new(LoopbackDevice::new("other", PortConfig::default()));
        open_all(&[&system, &other]).unwrap();

        endpoint.fail_close(true);
        assert!(close_all([&system, &other]).is_err());
        assert!(!system.is_open());
        assert!(!other.is_open());
    }
}
