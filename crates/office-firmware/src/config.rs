use office_core::{
    MqttConfig,
    NodeConfig,
    PayloadConfig,
    StaticIpConfig,
    TimingConfig,
    TopicMap,
    WifiConfig,
    parse_ipv4,
};

pub(crate) const HOSTNAME: &str = "office";

pub(crate) static NODE: NodeConfig = NodeConfig {
    wifi: WifiConfig {
        ssid: env!("WIFI_SSID"),
        password: env!("WIFI_PASSWORD"),
        static_ip: STATIC_IP,
    },
    mqtt: MqttConfig {
        host: env!("MQTT_HOST"),
        port: 1883,
        client_id: "office",
        username: env!("MQTT_USERNAME"),
        password: env!("MQTT_PASSWORD"),
        keep_alive_secs: 15,
    },
    topics: TopicMap::OFFICE,
    payloads: PayloadConfig::DEFAULT,
    timing: TimingConfig::DEFAULT,
};

/// Set `STATIC_IP` and `STATIC_GATEWAY` at build time to skip DHCP
const STATIC_IP: Option<StaticIpConfig> = match (
    option_env!("STATIC_IP"),
    option_env!("STATIC_GATEWAY"),
) {
    (Some(address), Some(gateway)) => Some(StaticIpConfig {
        address: ipv4(address),
        gateway: ipv4(gateway),
        netmask: match option_env!("STATIC_NETMASK") {
            Some(netmask) => ipv4(netmask),
            None => [255, 255, 255, 0],
        },
    }),
    _ => None,
};

const fn ipv4(text: &str) -> [u8; 4] {
    match parse_ipv4(text) {
        Some(address) => address,
        None => panic!("invalid IPv4 address in build environment"),
    }
}

#[macro_export]
macro_rules! motion_gpio {
    ($p:expr) => {
        $p.GPIO27
    };
}

#[macro_export]
macro_rules! light1_gpio {
    ($p:expr) => {
        $p.GPIO25
    };
}

#[macro_export]
macro_rules! light2_gpio {
    ($p:expr) => {
        $p.GPIO26
    };
}

#[macro_export]
macro_rules! switch1_gpio {
    ($p:expr) => {
        $p.GPIO32
    };
}

#[macro_export]
macro_rules! switch2_gpio {
    ($p:expr) => {
        $p.GPIO33
    };
}
