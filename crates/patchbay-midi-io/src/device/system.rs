use super::Device;
use crate::config::PortConfig;
use crate::port::{InPort, OutPort, Port};
use crate::transport::{DeviceId, Transport};
use std::sync::Arc;

/// Device backed by a transport.
///
/// The transport usually lists a hardware unit as two devices, one for each
/// direction, so the ids are given separately.
pub struct SystemDevice {
    name: String,
    input: Arc<InPort>,
    output: Arc<OutPort>,
}

impl SystemDevice {
    /// `input_device` is the transport device this device receives through,
    /// `output_device` the one it transmits through.
    pub fn new(
        name: impl Into<String>,
        transport: Arc<dyn Transport>,
        input_device: DeviceId,
        output_device: DeviceId,
        config: PortConfig,
    ) -> Self {
        let name = name.into();
        let input = InPort::new(
            format!("{}:in", name),
            Arc::clone(&transport),
            input_device,
            config,
        );
        let output = OutPort::new(format!("{}:out", name), transport, output_device, config);
        Self {
            name,
            input: Arc::new(input),
            output: Arc::new(output),
        }
    }

    /// Both directions on the same transport device.
    pub fn duplex(
        name: impl Into<String>,
        transport: Arc<dyn Transport>,
        device: DeviceId,
        config: PortConfig,
    ) -> Self {
        Self::new(name, transport, device, device, config)
    }

    pub fn input(&self) -> &Arc<InPort> {
        &self.input
    }

    pub fn output(&self) -> &Arc<OutPort> {
        &self.output
    }
}

impl Device for SystemDevice {
    fn name(&self) -> &str {
        &self.name
    }

    fn in_port(&self) -> Arc<dyn Port> {
        self.input.clone()
    }

    fn out_port(&self) -> Arc<dyn Port> {
        self.output.clone()
    }
}

impl std::fmt::Debug for SystemDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemDevice")
            .field("name", &self.name)
            .field("input", &self.input)
            .field("output", &self.output)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::transport::VirtualTransport;
    use patchbay_midi::{command, Event, RawMessage};
    use std::time::Duration;

    const TIMEOUT: Duration = Duration::from_secs(2);

    #[test]
    fn test_open_cascades_and_stops_at_first_failure() {
        let transport = Arc::new(VirtualTransport::new());
        let receive = transport.add_device(0);
        let transmit = transport.add_device(1);
        transmit.fail_open(true);

        let device = SystemDevice::new("synth", transport, 0, 1, PortConfig::default());
        assert!(matches!(device.open(), Err(Error::Transport(_))));
        // The in port opened first and is left open.
        assert!(device.input().is_open());
        assert!(!device.output().is_open());
        assert!(!device.is_open());
        assert_eq!(receive.open_count(), 1);

        device.close().unwrap();
        assert_eq!(receive.close_count(), 1);
    }

    #[test]
    fn test_run_requires_open() {
        let transport = Arc::new(VirtualTransport::new());
        transport.add_device(0);
        let device = SystemDevice::duplex("synth", transport, 0, PortConfig::default());
        assert!(matches!(device.run(), Err(Error::NotOpen(_))));
    }

    #[test]
    fn test_duplex_echo_through_transport() {
        let transport = Arc::new(VirtualTransport::new());
        let endpoint = transport.add_device(7);
        let device = SystemDevice::duplex("pad", transport, 7, PortConfig::default());
        device.open().unwrap();
        let tasks = device.run().unwrap();
        assert_eq!(tasks.len(), 2);

        endpoint.transmit_message(RawMessage::new(command::NOTE_ON, 2, 40, 80));
        let event = device
            .out_port()
            .events()
            .unwrap()
            .recv_timeout(TIMEOUT)
            .unwrap();
        device.in_port().events().unwrap().send(event).unwrap();

        let written = endpoint.recv_written(TIMEOUT).unwrap();
        assert_eq!(Event::classify(written.raw_message()), event);

        device.close().unwrap();
        tasks.join().unwrap();
    }

    #[test]
    fn test_close_right_after_run_joins_cleanly() {
        let transport = Arc::new(VirtualTransport::new());
        let endpoint = transport.add_device(2);
        let device = SystemDevice::duplex("pad", transport, 2, PortConfig::default());
        for _ in 0..200 {
            device.open().unwrap();
            let tasks = device.run().unwrap();
            device.close().unwrap();
            tasks.join().unwrap();
        }
        assert_eq!(endpoint.open_count(), endpoint.close_count());
    }
}
