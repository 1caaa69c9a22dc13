//! Ports to the outside world
//!
//! GPIO goes through the `embedded-hal` traits and delays through
//! `embedded-hal-async`; the traits below cover what those crates don't.

use core::fmt;

use embassy_time::Instant;
use heapless::{String, Vec};

use crate::config::MqttConfig;

/// Longest topic the node accepts from the broker
pub const MAX_TOPIC_LEN: usize = 64;
/// Longest command payload the node accepts from the broker
pub const MAX_PAYLOAD_LEN: usize = 32;

/// Monotonic time source
pub trait Clock {
    fn now(&self) -> Instant;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Instant {
        (**self).now()
    }
}

/// Message received from the broker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inbound {
    pub topic: String<MAX_TOPIC_LEN>,
    pub payload: Vec<u8, MAX_PAYLOAD_LEN>,
}

impl Inbound {
    /// `None` when the message does not fit the buffers. No command the node
    /// understands is that long, so it is dropped with a warning.
    pub fn new(topic: &str, payload: &[u8]) -> Option<Self> {
        match (String::try_from(topic), Vec::from_slice(payload)) {
            (Ok(topic), Ok(payload)) => Some(Self { topic, payload }),
            _ => {
                log::warn!(
                    "mqtt: dropping oversized message on {} ({} bytes)",
                    topic,
                    payload.len()
                );
                None
            }
        }
    }
}

/// Publish/subscribe session with the broker.
///
/// Implementations keep track of the link themselves: any error returned from
/// an operation must leave `is_connected` reporting `false` so the supervisor
/// reconnects on the next tick.
#[allow(async_fn_in_trait)]
pub trait Transport {
    type Error: fmt::Debug;

    fn is_connected(&self) -> bool;

    /// Open the link and authenticate
    async fn connect(&mut self, config: &MqttConfig) -> Result<(), Self::Error>;

    async fn publish(
        &mut self,
        topic: &str,
        payload: &[u8],
        retain: bool,
    ) -> Result<(), Self::Error>;

    async fn subscribe(&mut self, topic: &str) -> Result<(), Self::Error>;

    /// Pump the link once and return the next buffered message.
    ///
    /// Must not wait for new data: `Ok(None)` means nothing is pending.
    async fn poll(&mut self) -> Result<Option<Inbound>, Self::Error>;
}
