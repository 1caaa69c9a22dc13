use crate::device::DeviceId;

/// Sampled logic level of an input pin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    High,
    Low,
}

impl Level {
    pub const fn is_high(self) -> bool {
        matches!(self, Level::High)
    }
}

impl From<bool> for Level {
    fn from(value: bool) -> Self {
        if value { Level::High } else { Level::Low }
    }
}

/// Input to the reconciler.
///
/// Events are produced by the pollers and the command router and consumed
/// immediately; nothing queues them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// Raw sensor sample taken this tick
    SensorRead { device: DeviceId, level: Level },
    /// Debounced press of a physical button
    ButtonPress { device: DeviceId },
    /// Remote request to set a device to a state
    NetworkCommand { device: DeviceId, requested: bool },
}
