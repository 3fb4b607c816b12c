use mqlink::engine::Driver;
use mqlink::error::Error;
use mqlink::packet::QoS;
use mqlink::runtime::{ModeSwitch, Runtime, RuntimeConfig};
use mqlink::transport::{NetMode, Transport};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

/// In-memory transport double. Written frames are captured for
/// inspection; inbound frames are fed through a shared queue.
#[derive(Debug, Default)]
struct MockTransport {
    sent: Arc<Mutex<Vec<Vec<u8>>>>,
    inbound: Arc<Mutex<VecDeque<Vec<u8>>>>,
    connected_to: Arc<Mutex<Option<(u8, String, u16)>>>,
}

impl MockTransport {
    fn new() -> Self {
        Self::default()
    }
}

impl Transport for MockTransport {
    fn connect(&mut self, link_id: u8, host: &str, port: u16) -> Result<(), Error> {
        *self.connected_to.lock().unwrap() = Some((link_id, host.to_string(), port));
        Ok(())
    }

    fn prepare_send(&mut self, _link_id: u8, _len: usize) -> Result<(), Error> {
        Ok(())
    }

    fn write(&mut self, data: &[u8]) -> Result<(), Error> {
        self.sent.lock().unwrap().push(data.to_vec());
        Ok(())
    }

    fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<(u8, usize), Error> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(frame) = self.inbound.lock().unwrap().pop_front() {
                buf[..frame.len()].copy_from_slice(&frame);
                return Ok((0, frame.len()));
            }
            if Instant::now() >= deadline {
                return Err(Error::Timeout);
            }
            thread::sleep(Duration::from_millis(2));
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Event {
    Publish(String, Vec<u8>),
    Puback(u16),
}

#[derive(Debug, Default)]
struct Recorder {
    events: Arc<Mutex<Vec<Event>>>,
}

impl Driver for Recorder {
    fn publish(&mut self, topic: &str, payload: &[u8]) {
        self.events
            .lock()
            .unwrap()
            .push(Event::Publish(topic.to_string(), payload.to_vec()));
    }

    fn puback(&mut self, id: u16) {
        self.events.lock().unwrap().push(Event::Puback(id));
    }
}

fn fast_config() -> RuntimeConfig {
    RuntimeConfig {
        receive_timeout: Duration::from_millis(20),
        dispatch_interval: Duration::from_millis(5),
        queue_poll: Duration::from_millis(5),
    }
}

fn wait_until(mut condition: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(Instant::now() < deadline, "condition not reached in time");
        thread::sleep(Duration::from_millis(5));
    }
}

#[test]
fn frames_go_out_over_the_selected_transport() {
    let wifi = MockTransport::new();
    let cellular = MockTransport::new();
    let wifi_sent = wifi.sent.clone();
    let cellular_sent = cellular.sent.clone();

    let runtime = Runtime::start(wifi, cellular, NetMode::Wifi, fast_config());
    runtime.attach(Recorder::default());
    runtime.notify_link_up(5);
    runtime
        .publish("t", b"x", false, QoS::AtMostOnce, false)
        .unwrap();

    wait_until(|| !wifi_sent.lock().unwrap().is_empty());
    assert_eq!(
        wifi_sent.lock().unwrap()[0],
        vec![0x30, 0x04, 0x00, 0x01, b't', b'x']
    );
    assert!(cellular_sent.lock().unwrap().is_empty());

    runtime.shutdown();
}

#[test]
fn frames_are_dropped_without_an_active_link() {
    let wifi = MockTransport::new();
    let wifi_sent = wifi.sent.clone();

    let runtime: Runtime<Recorder, _, _, _> =
        Runtime::start(wifi, MockTransport::new(), NetMode::Wifi, fast_config());
    runtime.pingreq().unwrap();
    thread::sleep(Duration::from_millis(100));
    assert!(wifi_sent.lock().unwrap().is_empty());

    // the link coming up only affects frames queued afterwards
    runtime.notify_link_up(1);
    runtime.pingreq().unwrap();
    wait_until(|| !wifi_sent.lock().unwrap().is_empty());

    runtime.shutdown();
}

#[test]
fn inbound_qos1_publish_is_dispatched_and_acknowledged() {
    let wifi = MockTransport::new();
    let wifi_sent = wifi.sent.clone();
    let wifi_inbound = wifi.inbound.clone();
    let recorder = Recorder::default();
    let events = recorder.events.clone();

    let runtime = Runtime::start(wifi, MockTransport::new(), NetMode::Wifi, fast_config());
    runtime.attach(recorder);
    runtime.notify_link_up(0);

    // qos=1, topic "abc", id 7, payload "z"
    wifi_inbound
        .lock()
        .unwrap()
        .push_back(vec![0x32, 0x08, 0x00, 0x03, b'a', b'b', b'c', 0x00, 0x07, b'z']);

    wait_until(|| !events.lock().unwrap().is_empty());
    assert_eq!(
        events.lock().unwrap()[0],
        Event::Publish("abc".to_string(), b"z".to_vec())
    );

    wait_until(|| !wifi_sent.lock().unwrap().is_empty());
    assert_eq!(wifi_sent.lock().unwrap()[0], vec![0x40, 0x02, 0x00, 0x07]);

    runtime.shutdown();
}

#[test]
fn connect_server_targets_the_selected_transport() {
    let cellular = MockTransport::new();
    let connected = cellular.connected_to.clone();

    let mode = ModeSwitch::new(NetMode::Cellular);
    let runtime: Runtime<Recorder, _, _, _> =
        Runtime::start(MockTransport::new(), cellular, mode.clone(), fast_config());

    runtime.connect_server(2, "broker.local", 1883).unwrap();
    assert_eq!(
        *connected.lock().unwrap(),
        Some((2, "broker.local".to_string(), 1883))
    );

    runtime.shutdown();
}

#[test]
fn inbound_puback_reaches_the_driver() {
    let wifi = MockTransport::new();
    let wifi_inbound = wifi.inbound.clone();
    let recorder = Recorder::default();
    let events = recorder.events.clone();

    let runtime = Runtime::start(wifi, MockTransport::new(), NetMode::Wifi, fast_config());
    runtime.attach(recorder);
    wifi_inbound
        .lock()
        .unwrap()
        .push_back(vec![0x40, 0x02, 0x00, 0x2a]);

    wait_until(|| !events.lock().unwrap().is_empty());
    assert_eq!(events.lock().unwrap()[0], Event::Puback(42));

    runtime.shutdown();
}

#[test]
fn shutdown_joins_both_workers() {
    let runtime: Runtime<Recorder, _, _, _> = Runtime::start(
        MockTransport::new(),
        MockTransport::new(),
        NetMode::Wifi,
        fast_config(),
    );
    let started = Instant::now();
    runtime.shutdown();
    assert!(started.elapsed() < Duration::from_secs(2));
}
