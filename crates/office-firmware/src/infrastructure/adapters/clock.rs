use embassy_time::Instant;
use office_core::Clock;

/// Monotonic clock backed by the embassy time driver
pub(crate) struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}
