//! State reconciler
//!
//! Turns one [`Event`] into the side effects it requires. The rule every
//! transition follows: an output is driven or a state is published only when
//! the event's target value differs from the stored one. That is what keeps a
//! broker echo from clicking a relay again and a held sensor from flooding the
//! broker.

use crate::device::{DeviceId, DeviceKind};
use crate::event::Event;
use crate::store::DeviceStore;

/// Side effects of a single transition.
///
/// Both are applied by the caller before the next event is handled, output
/// first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Effects {
    /// Light output to drive, with the level to drive it to
    pub drive: Option<(DeviceId, bool)>,
    /// Device whose new state has to be published (retained)
    pub publish: Option<(DeviceId, bool)>,
}

impl Effects {
    pub const NONE: Effects = Effects {
        drive: None,
        publish: None,
    };

    pub const fn is_none(&self) -> bool {
        self.drive.is_none() && self.publish.is_none()
    }

    const fn publish(device: DeviceId, state: bool) -> Self {
        Self {
            drive: None,
            publish: Some((device, state)),
        }
    }

    const fn drive_and_publish(device: DeviceId, state: bool) -> Self {
        Self {
            drive: Some((device, state)),
            publish: Some((device, state)),
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Reconciler;

impl Reconciler {
    pub const fn new() -> Self {
        Self
    }

    /// Apply `event` to `store` and return what has to happen outside.
    ///
    /// Total: events that do not fit their device are ignored.
    pub fn apply(&self, store: &mut DeviceStore, event: Event) -> Effects {
        match event {
            Event::SensorRead { device, level } => {
                if device.kind() != DeviceKind::Sensor {
                    return Effects::NONE;
                }
                let detected = level.is_high();
                if store.get(device) == detected {
                    return Effects::NONE;
                }
                if detected {
                    log::info!("node: motion detected");
                } else {
                    log::info!("node: motion ended");
                }
                store.set(device, detected);
                Effects::publish(device, detected)
            }
            Event::ButtonPress { device } => {
                if device.kind() != DeviceKind::BinaryToggle {
                    return Effects::NONE;
                }
                let state = !store.get(device);
                log::info!("node: {} {}", device.as_str(), on_off(state));
                store.set(device, state);
                Effects::publish(device, state)
            }
            Event::NetworkCommand { device, requested } => {
                if store.get(device) == requested {
                    return Effects::NONE;
                }
                match device.kind() {
                    DeviceKind::BinaryOutput => {
                        log::info!("node: turn {} {}", device.as_str(), on_off(requested));
                        store.set(device, requested);
                        Effects::drive_and_publish(device, requested)
                    }
                    // Switches have no actuator, a remote set only corrects the mirrored state
                    DeviceKind::BinaryToggle => {
                        log::info!(
                            "node: {} set {} remotely",
                            device.as_str(),
                            on_off(requested)
                        );
                        store.set(device, requested);
                        Effects::publish(device, requested)
                    }
                    DeviceKind::Sensor => Effects::NONE,
                }
            }
        }
    }
}

const fn on_off(state: bool) -> &'static str {
    if state { "on" } else { "off" }
}
