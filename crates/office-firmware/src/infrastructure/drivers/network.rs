use core::str::FromStr;

use embassy_net::{
    DhcpConfig,
    IpAddress,
    Ipv4Address,
    Ipv4Cidr,
    Runner,
    Stack,
    StackResources,
    StaticConfigV4,
    dns::DnsQueryType,
};
use embassy_time::{Duration, Timer};
use esp_hal::peripherals::WIFI;
use esp_hal::rng::Rng;
use esp_radio::wifi::{Config as RadioConfig, WifiController, WifiDevice};
use heapless::{String, Vec};
use office_core::{StaticIpConfig, WifiConfig};
use static_cell::make_static;

use crate::config;

const MAX_CONNECTIONS: usize = 4;

pub(crate) fn init_network_stack(
    wifi_device: WIFI<'static>,
    wifi: &WifiConfig,
) -> (
    Stack<'static>,
    Runner<'static, WifiDevice<'static>>,
    WifiController<'static>,
) {
    let esp_radio_ctrl = &*make_static!(esp_radio::init().unwrap());
    let (controller, interfaces) =
        esp_radio::wifi::new(esp_radio_ctrl, wifi_device, RadioConfig::default()).unwrap();

    let net_config = match &wifi.static_ip {
        Some(static_ip) => embassy_net::Config::ipv4_static(static_config(static_ip)),
        None => {
            let mut dhcp_config = DhcpConfig::default();
            dhcp_config.hostname = Some(String::from_str(config::HOSTNAME).unwrap());
            embassy_net::Config::dhcpv4(dhcp_config)
        }
    };

    let network_resources = make_static!(StackResources::<MAX_CONNECTIONS>::new());
    let (stack, runner) =
        embassy_net::new(interfaces.sta, net_config, network_resources, get_seed());

    (stack, runner, controller)
}

fn static_config(static_ip: &StaticIpConfig) -> StaticConfigV4 {
    let [a, b, c, d] = static_ip.address;
    let [ga, gb, gc, gd] = static_ip.gateway;
    let gateway = Ipv4Address::new(ga, gb, gc, gd);
    let prefix_len = static_ip.prefix_len().unwrap_or_else(|e| {
        log::warn!("network: {}, falling back to /24", e);
        24
    });

    let mut dns_servers = Vec::new();
    // The gateway doubles as resolver on the office network
    let _ = dns_servers.push(gateway);

    StaticConfigV4 {
        address: Ipv4Cidr::new(Ipv4Address::new(a, b, c, d), prefix_len),
        gateway: Some(gateway),
        dns_servers,
    }
}

fn get_seed() -> u64 {
    let rng = Rng::new();
    u64::from(rng.random()) << 32 | u64::from(rng.random())
}

/// Wait for full network connectivity (link + IP address)
/// Returns the active IPv4 configuration
pub(crate) async fn wait_for_connection(stack: Stack<'_>) -> StaticConfigV4 {
    loop {
        if stack.is_link_up() {
            break;
        }
        Timer::after(Duration::from_millis(100)).await;
    }

    loop {
        if let Some(config) = stack.config_v4() {
            return config;
        }
        Timer::after(Duration::from_millis(100)).await;
    }
}

/// Resolves a hostname to an IP address
pub(crate) async fn resolve_host(stack: Stack<'static>, host: &str) -> Result<IpAddress, ()> {
    if let Ok(ip) = host.parse::<Ipv4Address>() {
        return Ok(IpAddress::Ipv4(ip));
    }

    let Ok(addresses) = stack.dns_query(host, DnsQueryType::A).await else {
        return Err(());
    };

    addresses.first().copied().ok_or(())
}
