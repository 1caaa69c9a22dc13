//! Static address binding between devices and MQTT topics

use crate::device::DeviceId;

/// Topics of a single device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceTopics {
    /// Where the device state is published (retained)
    pub state: &'static str,
    /// Where remote commands arrive. Sensors have none.
    pub command: Option<&'static str>,
}

impl DeviceTopics {
    pub const fn state_only(state: &'static str) -> Self {
        Self {
            state,
            command: None,
        }
    }

    pub const fn with_command(state: &'static str, command: &'static str) -> Self {
        Self {
            state,
            command: Some(command),
        }
    }
}

/// Device to topic mapping. Immutable configuration, never runtime state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicMap {
    pub motion: DeviceTopics,
    pub light1: DeviceTopics,
    pub light2: DeviceTopics,
    pub switch1: DeviceTopics,
    pub switch2: DeviceTopics,
}

impl TopicMap {
    /// Topic layout of the office node
    pub const OFFICE: TopicMap = TopicMap {
        motion: DeviceTopics::state_only("office/motion/status"),
        light1: DeviceTopics::with_command("office/light1/status", "office/light1/switch"),
        light2: DeviceTopics::with_command("office/light2/status", "office/light2/switch"),
        switch1: DeviceTopics::with_command("office/switch1/status", "office/switch1/set"),
        switch2: DeviceTopics::with_command("office/switch2/status", "office/switch2/set"),
    };

    pub const fn get(&self, device: DeviceId) -> &DeviceTopics {
        match device {
            DeviceId::Motion => &self.motion,
            DeviceId::Light1 => &self.light1,
            DeviceId::Light2 => &self.light2,
            DeviceId::Switch1 => &self.switch1,
            DeviceId::Switch2 => &self.switch2,
        }
    }

    pub const fn state_topic(&self, device: DeviceId) -> &'static str {
        self.get(device).state
    }

    /// Exact-match lookup of the device listening on `topic`
    pub fn device_for_command(&self, topic: &str) -> Option<DeviceId> {
        DeviceId::ALL
            .into_iter()
            .find(|device| self.get(*device).command == Some(topic))
    }

    /// Every command topic the node has to subscribe to
    pub fn command_topics(&self) -> impl Iterator<Item = &'static str> + '_ {
        DeviceId::ALL
            .into_iter()
            .filter_map(|device| self.get(device).command)
    }
}

impl Default for TopicMap {
    fn default() -> Self {
        Self::OFFICE
    }
}
