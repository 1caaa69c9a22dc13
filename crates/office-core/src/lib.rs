//! # Office node core
//!
//! Hardware-independent logic of the office sensor node: a motion sensor, two
//! lights and two push-button switches bridged to an MQTT broker.
//!
//! The crate is split the way the data flows through it:
//!
//! - **Inputs** (`debounce`, `router`): turn raw pin levels and inbound MQTT
//!   messages into [`Event`]s.
//! - **State** (`store`, `reconciler`): the [`DeviceStore`] is the single source
//!   of truth, and the [`Reconciler`] decides which side effects an event needs.
//! - **Session** (`supervisor`, `node`): keeps the broker session alive and runs
//!   the cooperative poll loop.
//! - **Link** (`frame`): splits the broker byte stream into whole packets
//!   and skips the ones too large to buffer.
//!
//! Everything that touches hardware or the network goes through the traits in
//! [`ports`] or the `embedded-hal` pin traits, so the whole crate runs on the
//! host in tests.

#![cfg_attr(not(test), no_std)]

pub mod config;
pub mod debounce;
pub mod device;
pub mod event;
pub mod frame;
pub mod node;
pub mod ports;
pub mod reconciler;
pub mod router;
pub mod store;
pub mod supervisor;
pub mod topic;

pub use config::{
    ConfigError,
    MqttConfig,
    NodeConfig,
    PayloadConfig,
    StaticIpConfig,
    TimingConfig,
    WifiConfig,
    parse_ipv4,
};
pub use debounce::{Button, Debouncer, Edge};
pub use device::{DeviceId, DeviceKind};
pub use event::{Event, Level};
pub use frame::{FrameError, PacketFramer};
pub use node::{Node, NodePins};
pub use ports::{Clock, Inbound, Transport};
pub use reconciler::{Effects, Reconciler};
pub use router::CommandRouter;
pub use store::DeviceStore;
pub use supervisor::ConnectionSupervisor;
pub use topic::{DeviceTopics, TopicMap};
