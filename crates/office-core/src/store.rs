use crate::device::DeviceId;

/// In-memory state of every device.
///
/// The store only remembers values. Deciding whether a change has to reach
/// an output or the broker is the reconciler's job, so `set` never checks
/// anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceStore {
    states: [bool; DeviceId::COUNT],
}

impl DeviceStore {
    /// All lights and switches off, no motion
    pub const fn new() -> Self {
        Self {
            states: [false; DeviceId::COUNT],
        }
    }

    pub const fn get(&self, device: DeviceId) -> bool {
        self.states[device.index()]
    }

    pub fn set(&mut self, device: DeviceId, state: bool) {
        self.states[device.index()] = state;
    }

    /// Current state of every device in publication order
    pub fn iter(&self) -> impl Iterator<Item = (DeviceId, bool)> + '_ {
        DeviceId::ALL
            .into_iter()
            .map(|device| (device, self.get(device)))
    }
}

impl Default for DeviceStore {
    fn default() -> Self {
        Self::new()
    }
}
