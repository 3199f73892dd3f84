//! End-to-end tests through the umbrella API.

use patchbay::prelude::*;
use patchbay::{command, Error};
use std::sync::Arc;
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_secs(2);

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

#[test]
fn test_device_requires_transport() {
    let patchbay = Patchbay::builder().build().unwrap();
    assert!(matches!(
        patchbay.device("keys", 0, 0),
        Err(Error::NoTransport)
    ));
}

#[test]
fn test_config_reaches_devices() {
    let patchbay = Patchbay::builder()
        .config(PortConfig::default().with_channel_capacity(3))
        .build()
        .unwrap();
    let device = patchbay.loopback("pad");
    device.open().unwrap();
    assert_eq!(device.in_port().events().unwrap().capacity(), Some(3));
    device.close().unwrap();
}

/// Keyboard -> router -> two synths, with a funnel merging both synths into
/// a recorder.
#[test]
fn test_router_into_funnel() {
    init_tracing();
    let transport = Arc::new(VirtualTransport::new());
    let keyboard_hw = transport.add_device(0);
    let patchbay = Patchbay::builder().transport(transport).build().unwrap();

    let keyboard = patchbay.device("keyboard", 0, 0).unwrap();
    let synths = vec![patchbay.thru("synth-a"), patchbay.thru("synth-b")];
    let recorder = patchbay.loopback("recorder");

    patchbay.router(keyboard, synths.clone()).unwrap();
    patchbay.funnel(recorder.clone(), synths).unwrap();
    assert_eq!(patchbay.patch_count(), 2);

    keyboard_hw.transmit_message(RawMessage::new(command::NOTE_ON, 4, 48, 77));
    let events = recorder.in_port().events().unwrap();
    assert_eq!(events.recv_timeout(TIMEOUT), Some(Event::note_on(4, 48, 77)));
    assert_eq!(events.recv_timeout(TIMEOUT), Some(Event::note_on(4, 48, 77)));

    patchbay.shutdown().unwrap();
    assert_eq!(patchbay.patch_count(), 0);
    assert!(!recorder.is_open());
}

#[test]
fn test_failed_patch_is_not_kept() {
    let transport = Arc::new(VirtualTransport::new());
    transport.add_device(0).fail_open(true);
    let patchbay = Patchbay::builder().transport(transport).build().unwrap();

    let broken = patchbay.device("broken", 0, 0).unwrap();
    let result = patchbay.chain(vec![patchbay.thru("a"), broken]);
    assert!(matches!(
        result,
        Err(Error::Routing(patchbay::io::Error::Topology { .. }))
    ));
    assert_eq!(patchbay.patch_count(), 0);
}

#[test]
fn test_drop_stops_connectors() {
    let from;
    {
        let patchbay = Patchbay::builder().build().unwrap();
        from = patchbay.thru("from");
        patchbay.pipe(from.clone(), patchbay.loopback("to")).unwrap();
        assert!(from.is_open());
    }
    assert!(!from.is_open());
}
