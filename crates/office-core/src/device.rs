/// Logical devices handled by the node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceId {
    Motion,
    Light1,
    Light2,
    Switch1,
    Switch2,
}

/// What a device physically is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    /// Read-only input sampled every tick
    Sensor,
    /// GPIO-driven output controlled from the network
    BinaryOutput,
    /// Push button mirrored as a logical on/off switch
    BinaryToggle,
}

impl DeviceId {
    pub const COUNT: usize = 5;

    /// All devices in publication order.
    pub const ALL: [DeviceId; Self::COUNT] = [
        DeviceId::Motion,
        DeviceId::Light1,
        DeviceId::Light2,
        DeviceId::Switch1,
        DeviceId::Switch2,
    ];

    pub const fn kind(self) -> DeviceKind {
        match self {
            DeviceId::Motion => DeviceKind::Sensor,
            DeviceId::Light1 | DeviceId::Light2 => DeviceKind::BinaryOutput,
            DeviceId::Switch1 | DeviceId::Switch2 => DeviceKind::BinaryToggle,
        }
    }

    pub(crate) const fn index(self) -> usize {
        match self {
            DeviceId::Motion => 0,
            DeviceId::Light1 => 1,
            DeviceId::Light2 => 2,
            DeviceId::Switch1 => 3,
            DeviceId::Switch2 => 4,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            DeviceId::Motion => "motion",
            DeviceId::Light1 => "light1",
            DeviceId::Light2 => "light2",
            DeviceId::Switch1 => "switch1",
            DeviceId::Switch2 => "switch2",
        }
    }
}
