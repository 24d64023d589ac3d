//! Device records handed over by the configuration parser.
//!
//! Records are deliberately permissive: every field except the device id and
//! interface name may be absent. Missing or unparseable values are recovered by
//! defaulting at build time and never surface as errors.

use std::fmt;
use std::net::Ipv4Addr;
use std::path::Path;

use ipnetwork::{ipv4_mask_to_prefix, Ipv4Network};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use crate::error::CoreError;

pub const TEN_GBPS: u64 = 10_000_000_000;
pub const ONE_GBPS: u64 = 1_000_000_000;
pub const HUNDRED_MBPS: u64 = 100_000_000;
pub const TEN_MBPS: u64 = 10_000_000;

/// Kind of network device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    Router,
    Switch,
    Pc,
    Firewall,
}

impl DeviceKind {
    /// Preference used when a subnet segment needs a hub (higher wins).
    pub fn hub_rank(self) -> u8 {
        match self {
            DeviceKind::Router => 3,
            DeviceKind::Firewall => 2,
            DeviceKind::Switch => 1,
            DeviceKind::Pc => 0,
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeviceKind::Router => "router",
            DeviceKind::Switch => "switch",
            DeviceKind::Pc => "pc",
            DeviceKind::Firewall => "firewall",
        };
        f.write_str(name)
    }
}

/// Interface family inferred from the interface name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterfaceClass {
    TenGigabit,
    Gigabit,
    FastEthernet,
    Ethernet,
    Unknown,
}

impl InterfaceClass {
    pub fn from_name(name: &str) -> Self {
        let name = name.trim().to_ascii_lowercase();
        if name.starts_with("te") {
            InterfaceClass::TenGigabit
        } else if name.starts_with("gi") {
            InterfaceClass::Gigabit
        } else if name.starts_with("fa") {
            InterfaceClass::FastEthernet
        } else if name.starts_with("et") {
            InterfaceClass::Ethernet
        } else {
            InterfaceClass::Unknown
        }
    }

    /// Conventional capacity of the class. Unknown names fall back on the
    /// device kind: PCs sit on access-class ports, everything else on uplinks.
    pub fn conventional_bps(self, kind: DeviceKind) -> u64 {
        match self {
            InterfaceClass::TenGigabit => TEN_GBPS,
            InterfaceClass::Gigabit => ONE_GBPS,
            InterfaceClass::FastEthernet => HUNDRED_MBPS,
            InterfaceClass::Ethernet => TEN_MBPS,
            InterfaceClass::Unknown => match kind {
                DeviceKind::Pc => HUNDRED_MBPS,
                _ => ONE_GBPS,
            },
        }
    }
}

fn default_admin_up() -> bool {
    true
}

/// A single interface of a device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interface {
    pub name: String,

    #[serde(default)]
    pub ip: Option<Ipv4Addr>,

    /// Subnet mask, dotted (`255.255.255.0`) or prefix (`/24`) form.
    #[serde(default, deserialize_with = "deserialize_mask")]
    pub mask: Option<Ipv4Addr>,

    /// Bandwidth in bits per second. Accepts a number or a human string
    /// such as `"1Gbps"`; a unit-less string is read as Mbps.
    #[serde(default, alias = "bandwidth", deserialize_with = "deserialize_bandwidth")]
    pub bandwidth_bps: Option<u64>,

    #[serde(default)]
    pub mtu: Option<u32>,

    #[serde(default)]
    pub vlan: Option<u16>,

    #[serde(default = "default_admin_up")]
    pub admin_up: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Interface {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ip: None,
            mask: None,
            bandwidth_bps: None,
            mtu: None,
            vlan: None,
            admin_up: true,
            description: None,
        }
    }

    /// Builder helper: address with a prefix length.
    pub fn with_address(mut self, ip: Ipv4Addr, prefix: u8) -> Self {
        self.ip = Some(ip);
        self.mask = prefix_to_mask(prefix);
        self
    }

    pub fn with_bandwidth(mut self, bps: u64) -> Self {
        self.bandwidth_bps = Some(bps);
        self
    }

    pub fn with_admin_up(mut self, up: bool) -> Self {
        self.admin_up = up;
        self
    }

    /// CIDR the configured address falls in. `None` when the address or mask
    /// is missing, or the mask is not contiguous.
    pub fn network(&self) -> Option<Ipv4Network> {
        let ip = self.ip?;
        let prefix = ipv4_mask_to_prefix(self.mask?).ok()?;
        let net = Ipv4Network::new(ip, prefix).ok()?;
        Ipv4Network::new(net.network(), prefix).ok()
    }

    pub fn class(&self) -> InterfaceClass {
        InterfaceClass::from_name(&self.name)
    }

    /// Configured bandwidth, or the conventional one for the interface class.
    pub fn effective_bandwidth(&self, kind: DeviceKind) -> u64 {
        match self.bandwidth_bps {
            Some(bps) if bps > 0 => bps,
            _ => self.class().conventional_bps(kind),
        }
    }
}

/// A router, switch, PC or firewall and its interfaces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub id: String,
    pub kind: DeviceKind,
    #[serde(default)]
    pub interfaces: Vec<Interface>,
}

impl Device {
    pub fn new(id: impl Into<String>, kind: DeviceKind) -> Self {
        Self {
            id: id.into(),
            kind,
            interfaces: Vec::new(),
        }
    }

    pub fn with_interface(mut self, interface: Interface) -> Self {
        self.interfaces.push(interface);
        self
    }

    pub fn interface(&self, name: &str) -> Option<&Interface> {
        self.interfaces.iter().find(|i| i.name == name)
    }
}

/// Reads device records from a JSON or YAML file (chosen by extension).
pub fn load_devices<P: AsRef<Path>>(path: P) -> Result<Vec<Device>, CoreError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(CoreError::FileNotFound(path.to_path_buf()));
    }
    let content = std::fs::read_to_string(path)?;
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    let devices: Vec<Device> = match extension.as_str() {
        "json" => serde_json::from_str(&content)?,
        "yaml" | "yml" => serde_yaml::from_str(&content)?,
        other => return Err(CoreError::UnsupportedFormat(other.to_string())),
    };
    debug!(count = devices.len(), path = %path.display(), "Loaded device records");
    Ok(devices)
}

/// Converts a prefix length into a dotted mask.
pub fn prefix_to_mask(prefix: u8) -> Option<Ipv4Addr> {
    if prefix > 32 {
        return None;
    }
    let bits = if prefix == 0 {
        0
    } else {
        u32::MAX << (32 - u32::from(prefix))
    };
    Some(Ipv4Addr::from(bits))
}

/// Parses `"1Gbps"`, `"100 Mbps"`, `"1544kbps"` or `"100"` (Mbps) into bits
/// per second.
pub fn parse_bandwidth(raw: &str) -> Option<u64> {
    let raw = raw.trim().to_ascii_lowercase();
    let mut num_part = String::new();
    let mut unit_part = String::new();
    for c in raw.chars() {
        if unit_part.is_empty() && (c.is_ascii_digit() || c == '.') {
            num_part.push(c);
        } else if !c.is_whitespace() {
            unit_part.push(c);
        }
    }
    let number: f64 = num_part.parse().ok()?;
    let multiplier = match unit_part.as_str() {
        "bps" | "b" => 1.0,
        "kbps" | "k" => 1e3,
        "mbps" | "m" | "" => 1e6,
        "gbps" | "g" => 1e9,
        "tbps" | "t" => 1e12,
        _ => return None,
    };
    let bps = number * multiplier;
    (bps.is_finite() && bps >= 1.0).then_some(bps as u64)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum BandwidthValue {
    Num(u64),
    Str(String),
}

fn deserialize_bandwidth<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<BandwidthValue>::deserialize(deserializer)?;
    Ok(match value {
        None => None,
        Some(BandwidthValue::Num(n)) => Some(n),
        Some(BandwidthValue::Str(s)) => {
            let parsed = parse_bandwidth(&s);
            if parsed.is_none() {
                debug!(value = %s, "Unparseable bandwidth, falling back to interface class");
            }
            parsed
        }
    })
}

fn deserialize_mask<'de, D>(deserializer: D) -> Result<Option<Ipv4Addr>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.and_then(|raw| {
        let raw = raw.trim();
        let prefix = raw.strip_prefix('/').unwrap_or(raw);
        match prefix.parse::<u8>() {
            Ok(len) => prefix_to_mask(len),
            Err(_) => raw.parse::<Ipv4Addr>().ok(),
        }
    }))
}
