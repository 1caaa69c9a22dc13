//! Broker session supervision
//!
//! Nothing is queued or persisted while the link is down, so every successful
//! (re)connection republishes the full state of every device and renews every
//! subscription. That resync is the only recovery path for missed messages.

use embassy_time::Duration;
use embedded_hal_async::delay::DelayNs;

use crate::config::{MqttConfig, PayloadConfig};
use crate::ports::Transport;
use crate::store::DeviceStore;
use crate::topic::TopicMap;

pub struct ConnectionSupervisor<'a> {
    mqtt: &'a MqttConfig,
    topics: &'a TopicMap,
    payloads: &'a PayloadConfig,
    retry_delay: Duration,
}

impl<'a> ConnectionSupervisor<'a> {
    pub const fn new(
        mqtt: &'a MqttConfig,
        topics: &'a TopicMap,
        payloads: &'a PayloadConfig,
        retry_delay: Duration,
    ) -> Self {
        Self {
            mqtt,
            topics,
            payloads,
            retry_delay,
        }
    }

    /// Block until the session is up and resynchronized.
    ///
    /// Returns `true` when a new session had to be established.
    pub async fn ensure_connected<T, D>(
        &self,
        transport: &mut T,
        store: &DeviceStore,
        delay: &mut D,
    ) -> bool
    where
        T: Transport,
        D: DelayNs,
    {
        if transport.is_connected() {
            return false;
        }

        loop {
            log::info!(
                "mqtt: attempting connection to {}:{}...",
                self.mqtt.host,
                self.mqtt.port
            );
            match self.establish(transport, store).await {
                Ok(()) => {
                    log::info!("mqtt: connected");
                    return true;
                }
                Err(e) => {
                    log::error!(
                        "mqtt: connection failed: {:?}, try again in {} ms",
                        e,
                        self.retry_delay.as_millis()
                    );
                    delay
                        .delay_ms(u32::try_from(self.retry_delay.as_millis()).unwrap_or(u32::MAX))
                        .await;
                }
            }
        }
    }

    async fn establish<T: Transport>(
        &self,
        transport: &mut T,
        store: &DeviceStore,
    ) -> Result<(), T::Error> {
        transport.connect(self.mqtt).await?;
        self.publish_all(transport, store).await?;
        self.subscribe_all(transport).await
    }

    /// Publish the current state of every device, retained
    pub async fn publish_all<T: Transport>(
        &self,
        transport: &mut T,
        store: &DeviceStore,
    ) -> Result<(), T::Error> {
        for (device, state) in store.iter() {
            let topic = self.topics.state_topic(device);
            let payload = self.payloads.state_payload(device, state);
            transport.publish(topic, payload.as_bytes(), true).await?;
        }
        Ok(())
    }

    async fn subscribe_all<T: Transport>(&self, transport: &mut T) -> Result<(), T::Error> {
        for topic in self.topics.command_topics() {
            transport.subscribe(topic).await?;
        }
        Ok(())
    }
}
