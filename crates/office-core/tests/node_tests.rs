//! Integration tests for the poll loop, driven against fake hardware and a
//! fake broker.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::convert::Infallible;
use std::rc::Rc;

use embassy_futures::block_on;
use embassy_time::{Duration, Instant};
use embedded_hal::digital::{ErrorType, InputPin, OutputPin};
use embedded_hal_async::delay::DelayNs;
use office_core::{
    Clock,
    DeviceId,
    Inbound,
    MqttConfig,
    Node,
    NodeConfig,
    NodePins,
    PayloadConfig,
    TimingConfig,
    TopicMap,
    Transport,
    WifiConfig,
};

static CONFIG: NodeConfig = NodeConfig {
    wifi: WifiConfig {
        ssid: "HomeAssistantMQTT",
        password: "secret",
        static_ip: None,
    },
    mqtt: MqttConfig {
        host: "192.168.0.104",
        port: 1883,
        client_id: "office",
        username: "homeassistant",
        password: "secret",
        keep_alive_secs: 15,
    },
    topics: TopicMap::OFFICE,
    payloads: PayloadConfig::DEFAULT,
    timing: TimingConfig::DEFAULT,
};

// -----------------------------------------------------------------------------
// Fakes
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
struct Published {
    topic: String,
    payload: String,
    retain: bool,
}

#[derive(Default)]
struct BrokerState {
    connected: bool,
    connect_attempts: usize,
    failing_connects: usize,
    fail_next_publish: bool,
    published: Vec<Published>,
    subscribed: Vec<String>,
    /// Raw messages, checked against the node's buffers on delivery
    inbox: VecDeque<(String, Vec<u8>)>,
}

#[derive(Clone, Default)]
struct FakeBroker(Rc<RefCell<BrokerState>>);

impl FakeBroker {
    fn send(&self, topic: &str, payload: &[u8]) {
        self.0
            .borrow_mut()
            .inbox
            .push_back((topic.to_owned(), payload.to_vec()));
    }

    fn drop_connection(&self) {
        self.0.borrow_mut().connected = false;
    }

    /// Everything published since the last call
    fn take_published(&self) -> Vec<Published> {
        std::mem::take(&mut self.0.borrow_mut().published)
    }

    fn take_subscribed(&self) -> Vec<String> {
        std::mem::take(&mut self.0.borrow_mut().subscribed)
    }
}

impl Transport for FakeBroker {
    type Error = &'static str;

    fn is_connected(&self) -> bool {
        self.0.borrow().connected
    }

    async fn connect(&mut self, config: &MqttConfig) -> Result<(), Self::Error> {
        assert_eq!(config.client_id, "office");
        let mut state = self.0.borrow_mut();
        state.connect_attempts += 1;
        if state.failing_connects > 0 {
            state.failing_connects -= 1;
            return Err("connection refused");
        }
        state.connected = true;
        Ok(())
    }

    async fn publish(
        &mut self,
        topic: &str,
        payload: &[u8],
        retain: bool,
    ) -> Result<(), Self::Error> {
        let mut state = self.0.borrow_mut();
        if state.fail_next_publish {
            state.fail_next_publish = false;
            state.connected = false;
            return Err("broken pipe");
        }
        state.published.push(Published {
            topic: topic.to_owned(),
            payload: String::from_utf8(payload.to_vec()).expect("utf-8 payload"),
            retain,
        });
        Ok(())
    }

    async fn subscribe(&mut self, topic: &str) -> Result<(), Self::Error> {
        self.0.borrow_mut().subscribed.push(topic.to_owned());
        Ok(())
    }

    async fn poll(&mut self) -> Result<Option<Inbound>, Self::Error> {
        let mut state = self.0.borrow_mut();
        while let Some((topic, payload)) = state.inbox.pop_front() {
            if let Some(message) = Inbound::new(&topic, &payload) {
                return Ok(Some(message));
            }
        }
        Ok(None)
    }
}

#[derive(Clone, Default)]
struct FakePin(Rc<Cell<bool>>);

impl FakePin {
    fn set(&self, high: bool) {
        self.0.set(high);
    }
}

impl ErrorType for FakePin {
    type Error = Infallible;
}

impl InputPin for FakePin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.0.get())
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.0.get())
    }
}

/// Output pin recording every write
#[derive(Clone, Default)]
struct FakeOutput(Rc<RefCell<Vec<bool>>>);

impl FakeOutput {
    fn writes(&self) -> Vec<bool> {
        self.0.borrow().clone()
    }
}

impl ErrorType for FakeOutput {
    type Error = Infallible;
}

impl OutputPin for FakeOutput {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.0.borrow_mut().push(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.0.borrow_mut().push(true);
        Ok(())
    }
}

#[derive(Clone, Default)]
struct FakeClock(Rc<Cell<u64>>);

impl FakeClock {
    fn set_millis(&self, millis: u64) {
        self.0.set(millis);
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        Instant::from_millis(self.0.get())
    }
}

/// Delay that returns immediately and remembers what it was asked for
#[derive(Clone, Default)]
struct FakeDelay(Rc<RefCell<Vec<u32>>>);

impl FakeDelay {
    fn millis(&self) -> Vec<u32> {
        self.0.borrow().clone()
    }
}

impl DelayNs for FakeDelay {
    async fn delay_ns(&mut self, _ns: u32) {}

    async fn delay_ms(&mut self, ms: u32) {
        self.0.borrow_mut().push(ms);
    }
}

// -----------------------------------------------------------------------------
// Harness
// -----------------------------------------------------------------------------

type TestNode = Node<'static, FakeBroker, FakeClock, FakeDelay, FakePin, FakePin, FakeOutput>;

struct Harness {
    node: TestNode,
    broker: FakeBroker,
    clock: FakeClock,
    delay: FakeDelay,
    sensor: FakePin,
    switch1: FakePin,
    switch2: FakePin,
    light1: FakeOutput,
    light2: FakeOutput,
}

impl Harness {
    fn new() -> Self {
        Self::with_broker(FakeBroker::default())
    }

    fn with_broker(broker: FakeBroker) -> Self {
        let clock = FakeClock::default();
        let delay = FakeDelay::default();
        let sensor = FakePin::default();
        let switch1 = FakePin::default();
        let switch2 = FakePin::default();
        let light1 = FakeOutput::default();
        let light2 = FakeOutput::default();

        let pins = NodePins {
            sensor: sensor.clone(),
            switch1: switch1.clone(),
            switch2: switch2.clone(),
            light1: light1.clone(),
            light2: light2.clone(),
        };
        let mut node = Node::new(&CONFIG, pins, broker.clone(), clock.clone(), delay.clone());
        node.init();

        Self {
            node,
            broker,
            clock,
            delay,
            sensor,
            switch1,
            switch2,
            light1,
            light2,
        }
    }

    /// Harness with the first connection and its resync already done
    fn connected() -> Self {
        let mut harness = Self::new();
        harness.tick();
        harness.broker.take_published();
        harness.broker.take_subscribed();
        harness
    }

    fn tick(&mut self) {
        block_on(self.node.tick());
    }

    fn tick_at(&mut self, millis: u64) {
        self.clock.set_millis(millis);
        self.tick();
    }
}

fn published(topic: &str, payload: &str) -> Published {
    Published {
        topic: topic.to_owned(),
        payload: payload.to_owned(),
        retain: true,
    }
}

// -----------------------------------------------------------------------------
// Startup and connection supervision
// -----------------------------------------------------------------------------

#[test]
fn startup_drives_lights_off() {
    let harness = Harness::new();

    assert_eq!(harness.light1.writes(), [false]);
    assert_eq!(harness.light2.writes(), [false]);
}

#[test]
fn first_tick_connects_and_publishes_everything() {
    let mut harness = Harness::new();
    harness.tick();

    assert_eq!(
        harness.broker.take_published(),
        [
            published("office/motion/status", "ON"),
            published("office/light1/status", "OFF"),
            published("office/light2/status", "OFF"),
            published("office/switch1/status", "OFF"),
            published("office/switch2/status", "OFF"),
        ]
    );
    assert_eq!(
        harness.broker.take_subscribed(),
        [
            "office/light1/switch",
            "office/light2/switch",
            "office/switch1/set",
            "office/switch2/set",
        ]
    );
}

#[test]
fn reconnect_republishes_current_state() {
    let mut harness = Harness::connected();

    harness.broker.send("office/light2/switch", b"ON");
    harness.broker.send("office/switch1/set", b"ON");
    harness.tick();
    harness.broker.take_published();

    harness.broker.drop_connection();
    harness.tick();

    assert_eq!(
        harness.broker.take_published(),
        [
            published("office/motion/status", "ON"),
            published("office/light1/status", "OFF"),
            published("office/light2/status", "ON"),
            published("office/switch1/status", "ON"),
            published("office/switch2/status", "OFF"),
        ]
    );
    assert_eq!(harness.broker.take_subscribed().len(), 4);
    assert_eq!(harness.broker.0.borrow().connect_attempts, 2);
}

#[test]
fn reconnect_resyncs_even_without_changes() {
    let mut harness = Harness::connected();

    harness.broker.drop_connection();
    harness.tick();

    assert_eq!(harness.broker.take_published().len(), 5);
    assert_eq!(harness.broker.take_subscribed().len(), 4);
}

#[test]
fn failed_connects_retry_with_fixed_backoff() {
    let broker = FakeBroker::default();
    broker.0.borrow_mut().failing_connects = 3;
    let mut harness = Harness::with_broker(broker);

    harness.tick();

    assert_eq!(harness.broker.0.borrow().connect_attempts, 4);
    assert_eq!(harness.delay.millis(), [5000, 5000, 5000]);
    assert!(harness.broker.is_connected());
    assert_eq!(harness.broker.take_published().len(), 5);
}

#[test]
fn connected_tick_does_not_reconnect() {
    let mut harness = Harness::connected();

    harness.tick();
    harness.tick();

    assert_eq!(harness.broker.0.borrow().connect_attempts, 1);
    assert!(harness.broker.take_published().is_empty());
    assert!(harness.delay.millis().is_empty());
}

// -----------------------------------------------------------------------------
// Network commands
// -----------------------------------------------------------------------------

#[test]
fn light_command_drives_output_and_confirms_once() {
    let mut harness = Harness::connected();

    harness.broker.send("office/light1/switch", b"ON");
    harness.tick();

    assert_eq!(harness.light1.writes(), [false, true]);
    assert_eq!(
        harness.broker.take_published(),
        [published("office/light1/status", "ON")]
    );

    harness.broker.send("office/light1/switch", b"ON");
    harness.tick();

    assert_eq!(harness.light1.writes(), [false, true]);
    assert!(harness.broker.take_published().is_empty());
    assert_eq!(harness.light2.writes(), [false]);
}

#[test]
fn command_equal_to_state_has_no_effect() {
    let mut harness = Harness::connected();

    harness.broker.send("office/light2/switch", b"OFF");
    harness.broker.send("office/switch2/set", b"OFF");
    harness.tick();

    assert_eq!(harness.light2.writes(), [false]);
    assert!(harness.broker.take_published().is_empty());
}

#[test]
fn unknown_payload_changes_nothing() {
    let mut harness = Harness::connected();

    harness.broker.send("office/light1/switch", b"TOGGLE");
    harness.broker.send("office/light1/switch", b"on");
    harness.broker.send("office/light9/switch", b"ON");
    harness.tick();

    assert!(!harness.node.store().get(DeviceId::Light1));
    assert_eq!(harness.light1.writes(), [false]);
    assert!(harness.broker.take_published().is_empty());
}

#[test]
fn oversized_command_is_dropped_and_session_kept() {
    let mut harness = Harness::connected();
    let long_topic = format!("office/light1/switch/{}", "x".repeat(64));

    harness.broker.send("office/light1/switch", &[b'N'; 600]);
    harness.broker.send(&long_topic, b"ON");
    harness.tick();

    assert!(!harness.node.store().get(DeviceId::Light1));
    assert_eq!(harness.light1.writes(), [false]);
    assert!(harness.broker.take_published().is_empty());
    assert!(harness.broker.is_connected());
    assert_eq!(harness.broker.0.borrow().connect_attempts, 1);

    // The next command still goes through
    harness.broker.send("office/light1/switch", b"ON");
    harness.tick();

    assert_eq!(harness.light1.writes(), [false, true]);
    assert_eq!(
        harness.broker.take_published(),
        [published("office/light1/status", "ON")]
    );
}

#[test]
fn switch_command_updates_mirror_without_gpio() {
    let mut harness = Harness::connected();

    harness.broker.send("office/switch2/set", b"ON");
    harness.tick();

    assert!(harness.node.store().get(DeviceId::Switch2));
    assert_eq!(
        harness.broker.take_published(),
        [published("office/switch2/status", "ON")]
    );
    assert_eq!(harness.light1.writes(), [false]);
    assert_eq!(harness.light2.writes(), [false]);
}

#[test]
fn dispatch_is_bounded_per_tick() {
    let mut harness = Harness::connected();

    for _ in 0..5 {
        harness.broker.send("office/light1/switch", b"ON");
        harness.broker.send("office/light1/switch", b"OFF");
    }
    harness.tick();

    let max = CONFIG.timing.max_dispatch_per_tick;
    assert_eq!(harness.broker.0.borrow().inbox.len(), 10 - max);
    assert_eq!(harness.broker.take_published().len(), max);

    harness.tick();
    assert!(harness.broker.0.borrow().inbox.is_empty());
}

// -----------------------------------------------------------------------------
// Buttons
// -----------------------------------------------------------------------------

#[test]
fn held_button_toggles_once_per_press() {
    let mut harness = Harness::connected();

    harness.switch1.set(true);
    harness.tick_at(0);
    harness.tick_at(500);
    assert!(harness.broker.take_published().is_empty());

    harness.tick_at(1000);
    assert_eq!(
        harness.broker.take_published(),
        [published("office/switch1/status", "ON")]
    );

    harness.tick_at(2000);
    harness.tick_at(4000);
    assert!(harness.broker.take_published().is_empty());

    harness.switch1.set(false);
    harness.tick_at(4100);
    harness.switch1.set(true);
    harness.tick_at(5000);
    harness.tick_at(6000);

    assert_eq!(
        harness.broker.take_published(),
        [published("office/switch1/status", "OFF")]
    );
    assert!(!harness.node.store().get(DeviceId::Switch2));
}

#[test]
fn short_blip_does_not_toggle() {
    let mut harness = Harness::connected();

    harness.switch2.set(true);
    harness.tick_at(0);
    harness.tick_at(200);
    harness.switch2.set(false);
    harness.tick_at(250);
    harness.tick_at(2000);

    assert!(!harness.node.store().get(DeviceId::Switch2));
    assert!(harness.broker.take_published().is_empty());
}

#[test]
fn button_never_drives_lights() {
    let mut harness = Harness::connected();

    harness.switch2.set(true);
    harness.tick_at(0);
    harness.tick_at(1000);

    assert_eq!(
        harness.broker.take_published(),
        [published("office/switch2/status", "ON")]
    );
    assert_eq!(harness.light1.writes(), [false]);
    assert_eq!(harness.light2.writes(), [false]);
}

// -----------------------------------------------------------------------------
// Motion sensor
// -----------------------------------------------------------------------------

#[test]
fn sustained_motion_publishes_one_edge_each_way() {
    let mut harness = Harness::connected();

    harness.sensor.set(true);
    for _ in 0..10 {
        harness.tick();
    }
    assert_eq!(
        harness.broker.take_published(),
        [published("office/motion/status", "OFF")]
    );

    harness.sensor.set(false);
    for _ in 0..10 {
        harness.tick();
    }
    assert_eq!(
        harness.broker.take_published(),
        [published("office/motion/status", "ON")]
    );
}

// -----------------------------------------------------------------------------
// Failures
// -----------------------------------------------------------------------------

#[test]
fn failed_publish_is_recovered_by_resync() {
    let mut harness = Harness::connected();

    harness.broker.0.borrow_mut().fail_next_publish = true;
    harness.broker.send("office/light1/switch", b"ON");
    harness.tick();

    assert!(harness.node.store().get(DeviceId::Light1));
    assert_eq!(harness.light1.writes(), [false, true]);
    assert!(harness.broker.take_published().is_empty());
    assert!(!harness.broker.is_connected());

    harness.tick();

    let resync = harness.broker.take_published();
    assert_eq!(resync.len(), 5);
    assert!(resync.contains(&published("office/light1/status", "ON")));
}
