pub(crate) mod network;

pub(crate) use network::{network_runner_task, wifi_connection_task};
