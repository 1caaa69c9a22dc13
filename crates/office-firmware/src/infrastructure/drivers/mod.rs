mod network;

pub(crate) use network::{init_network_stack, resolve_host, wait_for_connection};
