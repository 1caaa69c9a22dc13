mod broker_link;
mod clock;
mod mqtt_transport;

pub(crate) use broker_link::{Link, SharedLink};
pub(crate) use clock::SystemClock;
pub(crate) use mqtt_transport::MqttTransport;
