//! Table, field and object name constants for neighbor_advertiser

// CONFIG_DB tables (read)
pub const CFG_DEVICE_METADATA_TABLE: &str = "DEVICE_METADATA";
pub const CFG_LOOPBACK_INTERFACE_TABLE: &str = "LOOPBACK_INTERFACE";
pub const CFG_VLAN_TABLE: &str = "VLAN";
pub const CFG_VLAN_INTERFACE_TABLE: &str = "VLAN_INTERFACE";

// CONFIG_DB tables (written)
pub const CFG_VXLAN_TUNNEL_TABLE: &str = "VXLAN_TUNNEL";
pub const CFG_VXLAN_TUNNEL_MAP_TABLE: &str = "VXLAN_TUNNEL_MAP";
pub const CFG_MIRROR_SESSION_TABLE: &str = "MIRROR_SESSION";
pub const CFG_ACL_TABLE: &str = "ACL_TABLE";
pub const CFG_ACL_RULE_TABLE: &str = "ACL_RULE";

/// DEVICE_METADATA key holding this switch's identity
pub const DEVICE_METADATA_KEY: &str = "localhost";

/// Object names shared by every record this tool owns
pub mod names {
    /// VXLAN tunnel name; also the namespace of its map entries
    pub const VXLAN_TUNNEL: &str = "neighadv";

    /// Prefix of VXLAN tunnel map entry names (`map_1`, `map_2`, ...)
    pub const VXLAN_TUNNEL_MAP_PREFIX: &str = "map_";

    /// Mirror session name
    pub const MIRROR_SESSION: &str = "neighadv";

    /// Mirror ACL table name
    pub const MIRROR_ACL_TABLE: &str = "neighadv";

    /// Mirror ACL rule name
    pub const MIRROR_ACL_RULE: &str = "neighadvrule";
}

/// Field names
pub mod fields {
    // DEVICE_METADATA
    pub const HOSTNAME: &str = "hostname";
    pub const HWSKU: &str = "hwsku";

    // VXLAN_TUNNEL / MIRROR_SESSION
    pub const SRC_IP: &str = "src_ip";
    pub const DST_IP: &str = "dst_ip";

    // VXLAN_TUNNEL_MAP
    pub const VNI: &str = "vni";
    pub const VLAN: &str = "vlan";

    // ACL_TABLE
    pub const POLICY_DESC: &str = "policy_desc";
    pub const TYPE: &str = "type";
    pub const PORTS: &str = "ports";

    // ACL_RULE
    pub const PRIORITY: &str = "PRIORITY";
    pub const ETHER_TYPE: &str = "ETHER_TYPE";
    pub const MIRROR_ACTION: &str = "MIRROR_ACTION";
}

/// ACL table type for mirroring tables
pub const ACL_TABLE_TYPE_MIRROR: &str = "MIRROR";

/// Priority of the ARP mirror rule
pub const MIRROR_ACL_RULE_PRIORITY: &str = "8888";

/// Ether type matched by the mirror rule (ARP)
pub const ETHER_TYPE_ARP: &str = "0x0806";
