//! Cooperative poll loop
//!
//! One [`Node::tick`] does, in this order:
//!
//! 1. make sure the broker session is up (blocks with backoff while it isn't),
//! 2. dispatch the inbound messages already buffered by the transport,
//! 3. poll both buttons,
//! 4. sample the motion sensor.
//!
//! Every event is reconciled and its effects applied before the next one is
//! looked at.

use embedded_hal::digital::{InputPin, OutputPin, PinState};
use embedded_hal_async::delay::DelayNs;

use crate::config::{NodeConfig, PayloadConfig, TimingConfig};
use crate::debounce::{Button, Edge};
use crate::device::DeviceId;
use crate::event::{Event, Level};
use crate::ports::{Clock, Transport};
use crate::reconciler::{Effects, Reconciler};
use crate::router::CommandRouter;
use crate::store::DeviceStore;
use crate::supervisor::ConnectionSupervisor;
use crate::topic::TopicMap;

/// Physical I/O of the node
pub struct NodePins<S, B, L> {
    pub sensor: S,
    pub switch1: B,
    pub switch2: B,
    pub light1: L,
    pub light2: L,
}

pub struct Node<'a, T, C, D, S, B, L> {
    transport: T,
    clock: C,
    delay: D,
    sensor: S,
    buttons: [Button<B>; 2],
    light1: L,
    light2: L,
    store: DeviceStore,
    reconciler: Reconciler,
    router: CommandRouter<'a>,
    supervisor: ConnectionSupervisor<'a>,
    topics: &'a TopicMap,
    payloads: &'a PayloadConfig,
    timing: &'a TimingConfig,
}

impl<'a, T, C, D, S, B, L> Node<'a, T, C, D, S, B, L>
where
    T: Transport,
    C: Clock,
    D: DelayNs,
    S: InputPin,
    B: InputPin,
    L: OutputPin,
{
    pub fn new(
        config: &'a NodeConfig,
        pins: NodePins<S, B, L>,
        transport: T,
        clock: C,
        delay: D,
    ) -> Self {
        let hold = config.timing.button_hold;
        Self {
            transport,
            clock,
            delay,
            sensor: pins.sensor,
            buttons: [
                Button::new(DeviceId::Switch1, pins.switch1, hold),
                Button::new(DeviceId::Switch2, pins.switch2, hold),
            ],
            light1: pins.light1,
            light2: pins.light2,
            store: DeviceStore::new(),
            reconciler: Reconciler::new(),
            router: CommandRouter::new(&config.topics, &config.payloads),
            supervisor: ConnectionSupervisor::new(
                &config.mqtt,
                &config.topics,
                &config.payloads,
                config.timing.reconnect_delay,
            ),
            topics: &config.topics,
            payloads: &config.payloads,
            timing: &config.timing,
        }
    }

    /// Drive the light outputs to the startup state
    pub fn init(&mut self) {
        for light in [DeviceId::Light1, DeviceId::Light2] {
            let state = self.store.get(light);
            self.drive(light, state);
        }
    }

    /// Run forever
    pub async fn run(&mut self) -> ! {
        self.init();
        loop {
            self.tick().await;
            let interval = self.timing.tick_interval.as_micros();
            self.delay
                .delay_us(u32::try_from(interval).unwrap_or(u32::MAX))
                .await;
        }
    }

    /// One pass of the poll loop
    pub async fn tick(&mut self) {
        self.supervisor
            .ensure_connected(&mut self.transport, &self.store, &mut self.delay)
            .await;

        self.dispatch_inbound().await;
        self.poll_buttons().await;
        self.poll_sensor().await;
    }

    pub fn store(&self) -> &DeviceStore {
        &self.store
    }

    /// Reconcile `event` and apply its effects right away
    pub async fn handle(&mut self, event: Event) -> Effects {
        let effects = self.reconciler.apply(&mut self.store, event);
        if let Some((light, state)) = effects.drive {
            self.drive(light, state);
        }
        if let Some((device, state)) = effects.publish {
            self.publish(device, state).await;
        }
        effects
    }

    async fn dispatch_inbound(&mut self) {
        for _ in 0..self.timing.max_dispatch_per_tick {
            let message = match self.transport.poll().await {
                Ok(Some(message)) => message,
                Ok(None) => return,
                Err(e) => {
                    log::warn!("mqtt: connection lost: {:?}", e);
                    return;
                }
            };
            if let Some(event) = self.router.route(&message.topic, &message.payload) {
                self.handle(event).await;
            }
        }
    }

    async fn poll_buttons(&mut self) {
        let now = self.clock.now();
        for index in 0..self.buttons.len() {
            let button = &mut self.buttons[index];
            if button.poll(now) == Some(Edge::Activated) {
                let device = button.device();
                self.handle(Event::ButtonPress { device }).await;
            }
        }
    }

    async fn poll_sensor(&mut self) {
        let level = match self.sensor.is_high() {
            Ok(high) => Level::from(high),
            Err(e) => {
                log::warn!("node: failed to read motion sensor: {:?}", e);
                return;
            }
        };
        self.handle(Event::SensorRead {
            device: DeviceId::Motion,
            level,
        })
        .await;
    }

    fn drive(&mut self, light: DeviceId, state: bool) {
        let pin = match light {
            DeviceId::Light1 => &mut self.light1,
            DeviceId::Light2 => &mut self.light2,
            _ => return,
        };
        if let Err(e) = pin.set_state(PinState::from(state)) {
            log::warn!("node: failed to drive {}: {:?}", light.as_str(), e);
        }
    }

    /// A failed publish drops the session. The store already holds the new
    /// state, and the resync after reconnecting republishes it.
    async fn publish(&mut self, device: DeviceId, state: bool) {
        if !self.transport.is_connected() {
            return;
        }
        let topic = self.topics.state_topic(device);
        let payload = self.payloads.state_payload(device, state);
        if let Err(e) = self.transport.publish(topic, payload.as_bytes(), true).await {
            log::warn!("mqtt: failed to publish {}: {:?}", topic, e);
        }
    }
}
