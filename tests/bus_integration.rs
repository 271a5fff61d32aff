//! End-to-end exercises of `MakerBus`/`Module` over `LoopbackChannel`,
//! covering full request/response round trips, discovery, reset, and
//! multi-module sharing without any real serial hardware.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use makerbus::testing::LoopbackChannel;
use makerbus::{BusError, MakerBus, Module};

fn bus_with(input: &[u8]) -> MakerBus<LoopbackChannel> {
    let _ = env_logger::try_init();
    let mut channel = LoopbackChannel::new();
    channel.queue_input(input);
    MakerBus::new(channel, Duration::from_millis(50))
}

#[test]
fn full_round_trip_through_a_module_handle() {
    let _ = env_logger::try_init();
    // select ack, then reply header (len=2, checksum over [0x00,0x2A] = (0x2A+0x2)&0xF = 0xC)
    // followed by the two payload bytes themselves.
    let channel = {
        let mut c = LoopbackChannel::new();
        c.queue_input(&[0x00, 0x2C, 0x00, 0x2A]);
        c
    };
    let engine = Rc::new(RefCell::new(MakerBus::new(channel, Duration::from_millis(50))));
    let module = Module::new(engine, 0x20, 0x00);

    module.request_begin(0x05);
    module.put_ushort(0x1234);
    module.request_end();

    assert!(module.last_error().is_none());
    assert_eq!(module.get_ushort(), 0x002A);
    module.response_end();
}

#[test]
fn manual_batching_across_two_requests_flushes_as_one_caller_driven_call() {
    let mut bus = bus_with(&[0x00]); // address ack only; no request closes yet
    bus.set_auto_flush(false);

    bus.request_begin(0x01, 0x01);
    bus.put_ubyte(0x11);
    bus.request_end();

    bus.request_begin(0x01, 0x02);
    bus.put_ubyte(0x22);
    bus.request_end();

    // nothing flushed yet: both closed requests are still queued together
    assert_eq!(bus.last_error(), None);
    let written = bus.into_channel().take_written();
    assert_eq!(written, vec![0xC2, 0x01]); // only the address select went out
}

#[test]
fn discovery_then_reset_on_the_same_bus() {
    let mut input = Vec::new();
    input.extend_from_slice(b"+left-arm\n");
    input.extend_from_slice(b"+right-arm\n");
    input.extend_from_slice(b"!\n");
    input.push(makerbus::frame::RESET_ACK);

    let mut bus = bus_with(&input);
    let ids = bus.discover().expect("discovery should succeed");
    assert_eq!(ids, vec!["left-arm".to_string(), "right-arm".to_string()]);

    bus.reset().expect("reset should be acknowledged");
    assert_eq!(bus.selected_address(), None);
}

#[test]
fn address_reselect_after_timeout_invalidated_it() {
    // First select times out (no bytes queued at all).
    let mut bus = bus_with(&[]);
    bus.request_begin(0x10, 0x00);
    assert_eq!(bus.last_error(), Some(&BusError::Timeout));
    assert_eq!(bus.selected_address(), None);
}

#[test]
fn two_modules_at_different_addresses_each_trigger_a_select() {
    let _ = env_logger::try_init();
    // select ack for 0x01, reply for a; select ack for 0x02, reply for b
    let channel = {
        let mut c = LoopbackChannel::new();
        c.queue_input(&[0x00, 0x14, 0xAA, 0x00, 0x16, 0xBB]);
        c
    };
    let engine = Rc::new(RefCell::new(MakerBus::new(channel, Duration::from_millis(50))));
    let a = Module::new(engine.clone(), 0x01, 0x00);
    let b = Module::new(engine, 0x02, 0x00);

    a.request_begin(0x00);
    a.request_end();
    assert_eq!(a.get_ubyte(), 0xAA);
    a.response_end();

    b.request_begin(0x00);
    b.request_end();
    assert_eq!(b.get_ubyte(), 0xBB);
    b.response_end();
}
