//! Long-press style debouncing of push buttons
//!
//! A press is reported once the input has stayed asserted for the configured
//! hold time, and only once per physical press:
//!
//! ```text
//! Idle --asserted--> Pressed(since) --held >= hold--> Fired --released--> Idle
//!                        |
//!                        +--released early--> Idle
//! ```

use embassy_time::{Duration, Instant};
use embedded_hal::digital::InputPin;

use crate::device::DeviceId;

/// Debounced transition reported by [`Debouncer::update`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    /// The input was held long enough to count as a press
    Activated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DebounceState {
    Idle,
    Pressed(Instant),
    Fired,
}

/// Pin-independent debounce state machine
#[derive(Debug, Clone)]
pub struct Debouncer {
    hold: Duration,
    state: DebounceState,
}

impl Debouncer {
    pub const fn new(hold: Duration) -> Self {
        Self {
            hold,
            state: DebounceState::Idle,
        }
    }

    /// Feed one sample taken at `now`
    pub fn update(&mut self, asserted: bool, now: Instant) -> Option<Edge> {
        match (self.state, asserted) {
            (DebounceState::Idle, true) => {
                self.state = DebounceState::Pressed(now);
                self.fire_if_held(now, now)
            }
            (DebounceState::Pressed(since), true) => self.fire_if_held(since, now),
            (DebounceState::Fired, true) | (DebounceState::Idle, false) => None,
            (DebounceState::Pressed(_) | DebounceState::Fired, false) => {
                self.state = DebounceState::Idle;
                None
            }
        }
    }

    pub fn is_idle(&self) -> bool {
        self.state == DebounceState::Idle
    }

    fn fire_if_held(&mut self, since: Instant, now: Instant) -> Option<Edge> {
        if now.saturating_duration_since(since) >= self.hold {
            self.state = DebounceState::Fired;
            Some(Edge::Activated)
        } else {
            None
        }
    }
}

/// Active-high push button bound to a switch device
pub struct Button<P> {
    device: DeviceId,
    pin: P,
    debouncer: Debouncer,
}

impl<P: InputPin> Button<P> {
    pub const fn new(device: DeviceId, pin: P, hold: Duration) -> Self {
        Self {
            device,
            pin,
            debouncer: Debouncer::new(hold),
        }
    }

    pub const fn device(&self) -> DeviceId {
        self.device
    }

    /// Sample the pin once. A failed read is skipped for this tick.
    pub fn poll(&mut self, now: Instant) -> Option<Edge> {
        match self.pin.is_high() {
            Ok(asserted) => self.debouncer.update(asserted, now),
            Err(e) => {
                log::warn!("button: failed to read {} pin: {:?}", self.device.as_str(), e);
                None
            }
        }
    }
}
