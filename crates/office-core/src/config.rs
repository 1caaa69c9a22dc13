//! Node configuration
//!
//! Everything here is plain data built at compile time by the firmware. The
//! core never reads it from anywhere else.

use core::fmt;

use embassy_time::Duration;

use crate::device::DeviceId;
use crate::topic::TopicMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Netmask bits are not a contiguous run of ones
    InvalidNetmask,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidNetmask => write!(f, "Netmask is not contiguous"),
        }
    }
}

/// Fixed IPv4 assignment used instead of DHCP
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticIpConfig {
    pub address: [u8; 4],
    pub gateway: [u8; 4],
    pub netmask: [u8; 4],
}

impl StaticIpConfig {
    pub fn prefix_len(&self) -> Result<u8, ConfigError> {
        netmask_prefix_len(self.netmask)
    }
}

/// Convert a dotted netmask (`255.255.255.0`) into a CIDR prefix length (`24`)
pub fn netmask_prefix_len(netmask: [u8; 4]) -> Result<u8, ConfigError> {
    let bits = u32::from_be_bytes(netmask);
    let prefix = bits.leading_ones();
    if bits.checked_shl(prefix).unwrap_or(0) != 0 {
        return Err(ConfigError::InvalidNetmask);
    }
    u8::try_from(prefix).map_err(|_| ConfigError::InvalidNetmask)
}

/// Parse a dotted-quad IPv4 address.
///
/// Usable in const context so addresses can come from `option_env!`.
#[allow(clippy::cast_possible_truncation, clippy::cast_lossless)]
pub const fn parse_ipv4(text: &str) -> Option<[u8; 4]> {
    let bytes = text.as_bytes();
    let mut address = [0u8; 4];
    let mut octet = 0;
    let mut value: u16 = 0;
    let mut digits = 0;
    let mut i = 0;
    while i < bytes.len() {
        let byte = bytes[i];
        if byte == b'.' {
            if digits == 0 || octet == 3 {
                return None;
            }
            address[octet] = value as u8;
            octet += 1;
            value = 0;
            digits = 0;
        } else if byte.is_ascii_digit() && digits < 3 {
            value = value * 10 + (byte - b'0') as u16;
            if value > 255 {
                return None;
            }
            digits += 1;
        } else {
            return None;
        }
        i += 1;
    }
    if digits == 0 || octet != 3 {
        return None;
    }
    address[3] = value as u8;
    Some(address)
}

#[derive(Debug, Clone)]
pub struct WifiConfig {
    pub ssid: &'static str,
    pub password: &'static str,
    /// `None` means DHCP
    pub static_ip: Option<StaticIpConfig>,
}

#[derive(Debug, Clone)]
pub struct MqttConfig {
    pub host: &'static str,
    pub port: u16,
    pub client_id: &'static str,
    pub username: &'static str,
    pub password: &'static str,
    /// `0` switches keep-alive off
    pub keep_alive_secs: u16,
}

impl MqttConfig {
    /// Keep-alive interval, `None` when it is switched off
    pub fn keep_alive(&self) -> Option<Duration> {
        match self.keep_alive_secs {
            0 => None,
            secs => Some(Duration::from_secs(u64::from(secs))),
        }
    }

    /// How long the broker may stay silent before the session is given up
    pub fn silence_limit(&self) -> Option<Duration> {
        self.keep_alive().map(|interval| interval + interval / 2)
    }
}

/// Literal payload tokens.
///
/// The motion tokens are configuration, not protocol: the office node has
/// always published `"OFF"` when motion is detected and `"ON"` when it clears,
/// and the hub is set up for that. Keep it unless the hub changes too.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadConfig {
    pub on: &'static str,
    pub off: &'static str,
    pub motion_detected: &'static str,
    pub motion_clear: &'static str,
}

impl PayloadConfig {
    pub const DEFAULT: PayloadConfig = PayloadConfig {
        on: "ON",
        off: "OFF",
        motion_detected: "OFF",
        motion_clear: "ON",
    };

    /// Payload published for `device` in `state`
    pub const fn state_payload(&self, device: DeviceId, state: bool) -> &'static str {
        match (device, state) {
            (DeviceId::Motion, true) => self.motion_detected,
            (DeviceId::Motion, false) => self.motion_clear,
            (_, true) => self.on,
            (_, false) => self.off,
        }
    }

    /// Case-sensitive match against the command tokens
    pub fn parse_command(&self, payload: &[u8]) -> Option<bool> {
        if payload == self.on.as_bytes() {
            Some(true)
        } else if payload == self.off.as_bytes() {
            Some(false)
        } else {
            None
        }
    }
}

impl Default for PayloadConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimingConfig {
    /// How long a button must be held before it counts as a press
    pub button_hold: Duration,
    /// Delay between broker connection attempts
    pub reconnect_delay: Duration,
    /// Upper bound of inbound messages dispatched in a single tick
    pub max_dispatch_per_tick: usize,
    /// Pause between two ticks of the poll loop
    pub tick_interval: Duration,
}

impl TimingConfig {
    pub const DEFAULT: TimingConfig = TimingConfig {
        button_hold: Duration::from_millis(1000),
        reconnect_delay: Duration::from_secs(5),
        max_dispatch_per_tick: 8,
        tick_interval: Duration::from_millis(10),
    };
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub wifi: WifiConfig,
    pub mqtt: MqttConfig,
    pub topics: TopicMap,
    pub payloads: PayloadConfig,
    pub timing: TimingConfig,
}
