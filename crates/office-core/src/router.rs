use crate::config::PayloadConfig;
use crate::event::Event;
use crate::topic::TopicMap;

/// Maps inbound MQTT messages to reconciler events
#[derive(Debug, Clone, Copy)]
pub struct CommandRouter<'a> {
    topics: &'a TopicMap,
    payloads: &'a PayloadConfig,
}

impl<'a> CommandRouter<'a> {
    pub const fn new(topics: &'a TopicMap, payloads: &'a PayloadConfig) -> Self {
        Self { topics, payloads }
    }

    /// Unknown topics and unrecognized payloads produce no event
    pub fn route(&self, topic: &str, payload: &[u8]) -> Option<Event> {
        let device = self.topics.device_for_command(topic)?;
        let Some(requested) = self.payloads.parse_command(payload) else {
            log::warn!(
                "node: ignoring unknown payload {:?} on {}",
                core::str::from_utf8(payload).unwrap_or("<binary>"),
                topic
            );
            return None;
        };
        Some(Event::NetworkCommand { device, requested })
    }
}
