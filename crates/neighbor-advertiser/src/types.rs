//! Neighbor advertiser slice model and supporting types
//!
//! The slice is the JSON document sent to the Ferret service. Field names on
//! the wire are camelCase.

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::AdvertiserError;

/// How long the Ferret service should keep the assignment (seconds)
pub const DEFAULT_DURATION_SECS: u64 = 300;

/// Highest usable 802.1Q VLAN id
pub const MAX_VLAN_ID: u16 = 4094;

static VLAN_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^Vlan([0-9]{1,4})$").expect("Invalid regex pattern"));

/// IP address family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IpFamily {
    V4,
    V6,
}

impl IpFamily {
    /// Classifies an address or prefix: anything with a colon is IPv6.
    pub fn classify(addr: &str) -> Self {
        if addr.contains(':') {
            IpFamily::V6
        } else {
            IpFamily::V4
        }
    }
}

impl fmt::Display for IpFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IpFamily::V4 => write!(f, "ipv4"),
            IpFamily::V6 => write!(f, "ipv6"),
        }
    }
}

/// Returns the address part of an `addr/len` prefix.
pub fn prefix_address(prefix: &str) -> &str {
    prefix.split_once('/').map_or(prefix, |(addr, _)| addr)
}

/// A validated VLAN interface name (`Vlan<id>`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VlanInterface {
    name: String,
    id: u16,
}

impl VlanInterface {
    /// Interface name, e.g. `Vlan1000`
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Numeric VLAN id
    pub fn id(&self) -> u16 {
        self.id
    }

    /// VXLAN network identifier bound to this VLAN (same as the VLAN id)
    pub fn vni(&self) -> u32 {
        u32::from(self.id)
    }
}

impl FromStr for VlanInterface {
    type Err = AdvertiserError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        let invalid = || AdvertiserError::InvalidInterfaceName {
            name: name.to_string(),
        };

        let digits = VLAN_NAME_RE
            .captures(name)
            .and_then(|caps| caps.get(1))
            .ok_or_else(invalid)?;
        let id: u16 = digits.as_str().parse().map_err(|_| invalid())?;
        if id == 0 || id > MAX_VLAN_ID {
            return Err(invalid());
        }

        Ok(Self {
            name: name.to_string(),
            id,
        })
    }
}

impl fmt::Display for VlanInterface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Identity of the switch being provisioned
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwitchInfo {
    pub name: String,
    /// Loopback IPv4 address, empty if none is configured
    pub ipv4_addr: String,
    /// Loopback IPv6 address, empty if none is configured
    pub ipv6_addr: String,
    pub hw_sku: String,
}

/// One address configured on a VLAN interface
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressMapping {
    pub ip_addr: String,
    pub mac_addr: String,
}

/// Addressing facts for one VLAN interface
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VlanInterfaceDescriptor {
    pub vlan_id: String,
    pub vxlan_id: String,
    pub ipv4_addr_mappings: Vec<AddressMapping>,
    pub ipv6_addr_mappings: Vec<AddressMapping>,
}

impl VlanInterfaceDescriptor {
    /// Builds the descriptor for `vlan`, pairing every address with `mac_addr`.
    pub fn new(vlan: &VlanInterface, addresses: &VlanAddresses, mac_addr: &str) -> Self {
        let mappings = |addrs: &[String]| {
            addrs
                .iter()
                .map(|ip| AddressMapping {
                    ip_addr: ip.clone(),
                    mac_addr: mac_addr.to_string(),
                })
                .collect()
        };

        Self {
            vlan_id: vlan.id().to_string(),
            vxlan_id: vlan.vni().to_string(),
            ipv4_addr_mappings: mappings(&addresses.ipv4),
            ipv6_addr_mappings: mappings(&addresses.ipv6),
        }
    }
}

/// Addresses configured on a VLAN interface, split by family
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VlanAddresses {
    pub ipv4: Vec<String>,
    pub ipv6: Vec<String>,
}

impl VlanAddresses {
    /// Adds an `addr/len` prefix to the list of its family.
    pub fn push_prefix(&mut self, prefix: &str) {
        let addr = prefix_address(prefix).to_string();
        match IpFamily::classify(&addr) {
            IpFamily::V4 => self.ipv4.push(addr),
            IpFamily::V6 => self.ipv6.push(addr),
        }
    }
}

/// How the Ferret service should respond for this switch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RespondingSchemeConfig {
    pub duration_in_sec: u64,
}

impl Default for RespondingSchemeConfig {
    fn default() -> Self {
        Self {
            duration_in_sec: DEFAULT_DURATION_SECS,
        }
    }
}

/// The negotiation request sent to the Ferret service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NeighborAdvertiserSlice {
    pub switch_info: SwitchInfo,
    pub vlan_interfaces: Vec<VlanInterfaceDescriptor>,
    pub responding_schemes: RespondingSchemeConfig,
}

/// Ferret service reply
///
/// Only `ipv4Addr` is required; any other fields are kept as-is so the
/// diagnostic snapshot reproduces the whole response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NegotiationResult {
    /// Responder address assigned to this switch
    pub ipv4_addr: Ipv4Addr,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}
