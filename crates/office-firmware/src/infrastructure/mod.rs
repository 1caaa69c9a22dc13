//! Infrastructure layer - Port implementations
//!
//! Concrete implementations of the `office-core` ports on top of the ESP32
//! radio, the `embassy-net` stack and the embassy time driver.

pub(crate) mod adapters;
pub(crate) mod drivers;
pub(crate) mod tasks;
