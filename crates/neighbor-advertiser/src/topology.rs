//! Topology discovery
//!
//! Reads switch identity and per-VLAN addressing from CONFIG_DB, and VLAN
//! interface MAC addresses from the kernel's network interface class
//! directory.

use std::path::{Path, PathBuf};

use sonic_cfgmgr_common::{ConfigDb, FieldValuesExt, Table, TableKey};
use tracing::{debug, info, warn};

use crate::error::{AdvertiserError, Result};
use crate::tables::{
    fields, CFG_DEVICE_METADATA_TABLE, CFG_LOOPBACK_INTERFACE_TABLE, CFG_VLAN_INTERFACE_TABLE,
    CFG_VLAN_TABLE, DEVICE_METADATA_KEY,
};
use crate::types::{
    prefix_address, IpFamily, SwitchInfo, VlanAddresses, VlanInterface, VlanInterfaceDescriptor,
};

/// Loopback interface that identifies the switch
pub const DEFAULT_LOOPBACK_INTERFACE: &str = "Loopback0";

/// Where the kernel exposes network interface attributes
pub const DEFAULT_SYSFS_NET_ROOT: &str = "/sys/class/net";

/// Access to `<root>/<ifname>/<attribute>` files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SysfsNetClass {
    root: PathBuf,
}

impl SysfsNetClass {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Hardware address of `ifname`, or `None` if unreadable or empty.
    pub async fn mac_address(&self, ifname: &str) -> Option<String> {
        let path = self.root.join(ifname).join("address");
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => {
                let mac = content.trim();
                (!mac.is_empty()).then(|| mac.to_string())
            }
            Err(e) => {
                debug!(path = %path.display(), error = %e, "Failed to read interface address");
                None
            }
        }
    }
}

impl Default for SysfsNetClass {
    fn default() -> Self {
        Self::new(DEFAULT_SYSFS_NET_ROOT)
    }
}

/// Everything the slice and the tunnel need to know about this switch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topology {
    pub switch_info: SwitchInfo,
    /// Every VLAN interface, including ones excluded from the slice
    pub vlans: Vec<VlanInterface>,
    /// VLAN interfaces with a resolvable MAC address
    pub descriptors: Vec<VlanInterfaceDescriptor>,
}

/// Reads topology facts from CONFIG_DB and sysfs
pub struct TopologyReader<'a> {
    db: &'a mut dyn ConfigDb,
    net: SysfsNetClass,
    loopback_interface: String,
}

impl<'a> TopologyReader<'a> {
    pub fn new(db: &'a mut dyn ConfigDb, net: SysfsNetClass) -> Self {
        Self {
            db,
            net,
            loopback_interface: DEFAULT_LOOPBACK_INTERFACE.to_string(),
        }
    }

    /// Prefer addresses of `name` when picking the loopback address (builder pattern)
    pub fn with_loopback_interface(mut self, name: impl Into<String>) -> Self {
        self.loopback_interface = name.into();
        self
    }

    /// Reads switch identity, VLAN interfaces and their descriptors.
    pub async fn read(&mut self) -> Result<Topology> {
        let switch_info = self.switch_info().await?;
        let vlans = self.vlan_interfaces().await?;
        let descriptors = self.vlan_descriptors(&vlans).await?;

        info!(
            switch = %switch_info.name,
            vlans = vlans.len(),
            advertised = descriptors.len(),
            "Topology read"
        );

        Ok(Topology {
            switch_info,
            vlans,
            descriptors,
        })
    }

    pub async fn switch_info(&mut self) -> Result<SwitchInfo> {
        let metadata = self
            .db
            .get_entry(CFG_DEVICE_METADATA_TABLE, &TableKey::new(DEVICE_METADATA_KEY))
            .await?
            .ok_or_else(|| {
                AdvertiserError::config_missing(
                    CFG_DEVICE_METADATA_TABLE,
                    DEVICE_METADATA_KEY,
                    fields::HOSTNAME,
                )
            })?;

        let field = |name: &str| {
            metadata.get_field(name).map(str::to_string).ok_or_else(|| {
                AdvertiserError::config_missing(CFG_DEVICE_METADATA_TABLE, DEVICE_METADATA_KEY, name)
            })
        };
        let name = field(fields::HOSTNAME)?;
        let hw_sku = field(fields::HWSKU)?;

        Ok(SwitchInfo {
            name,
            ipv4_addr: self.loopback_address(IpFamily::V4).await?,
            ipv6_addr: self.loopback_address(IpFamily::V6).await?,
            hw_sku,
        })
    }

    /// First loopback address of `family`, without prefix length.
    ///
    /// Returns an empty string when no loopback carries an address of that
    /// family; the Ferret service accepts a switch without one.
    pub async fn loopback_address(&mut self, family: IpFamily) -> Result<String> {
        let table = self.db.get_table(CFG_LOOPBACK_INTERFACE_TABLE).await?;

        let preferred = table
            .keys()
            .filter(|key| key.first() == self.loopback_interface);
        let others = table
            .keys()
            .filter(|key| key.first() != self.loopback_interface);

        let addr = preferred
            .chain(others)
            .filter_map(|key| key.part(1))
            .map(prefix_address)
            .find(|addr| IpFamily::classify(addr) == family);

        match addr {
            Some(addr) => Ok(addr.to_string()),
            None => {
                debug!(%family, "No loopback address configured");
                Ok(String::new())
            }
        }
    }

    /// Every VLAN in the VLAN table, in store order.
    pub async fn vlan_interfaces(&mut self) -> Result<Vec<VlanInterface>> {
        let table = self.db.get_table(CFG_VLAN_TABLE).await?;

        let mut vlans: Vec<VlanInterface> = Vec::with_capacity(table.len());
        for key in table.keys() {
            let vlan: VlanInterface = key.first().parse()?;
            if !vlans.contains(&vlan) {
                vlans.push(vlan);
            }
        }
        Ok(vlans)
    }

    /// Descriptors for `vlans`, skipping any VLAN without a MAC address.
    pub async fn vlan_descriptors(
        &mut self,
        vlans: &[VlanInterface],
    ) -> Result<Vec<VlanInterfaceDescriptor>> {
        let intf_table = self.db.get_table(CFG_VLAN_INTERFACE_TABLE).await?;

        let mut descriptors = Vec::with_capacity(vlans.len());
        for vlan in vlans {
            let Some(mac) = self.net.mac_address(vlan.name()).await else {
                warn!(vlan = %vlan, "Cannot find MAC address of VLAN interface, skipping");
                continue;
            };

            let addresses = vlan_addresses(&intf_table, vlan);
            debug!(
                vlan = %vlan,
                %mac,
                ipv4 = addresses.ipv4.len(),
                ipv6 = addresses.ipv6.len(),
                "VLAN interface discovered"
            );
            descriptors.push(VlanInterfaceDescriptor::new(vlan, &addresses, &mac));
        }
        Ok(descriptors)
    }
}

/// Addresses of `vlan` in a VLAN_INTERFACE table (`<vlan>|<prefix>` keys).
pub fn vlan_addresses(intf_table: &Table, vlan: &VlanInterface) -> VlanAddresses {
    let mut addresses = VlanAddresses::default();
    for key in intf_table.keys() {
        if key.first() != vlan.name() {
            continue;
        }
        if let Some(prefix) = key.part(1) {
            addresses.push_prefix(prefix);
        }
    }
    addresses
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sonic_cfgmgr_common::{field_values, MemoryConfigDb};
    use std::fs;
    use tempfile::TempDir;

    fn sysfs_with(macs: &[(&str, &str)]) -> TempDir {
        let tmp = tempfile::tempdir().unwrap();
        for (ifname, mac) in macs {
            let dir = tmp.path().join(ifname);
            fs::create_dir_all(&dir).unwrap();
            fs::write(dir.join("address"), format!("{}\n", mac)).unwrap();
        }
        tmp
    }

    fn base_db() -> MemoryConfigDb {
        MemoryConfigDb::new()
            .with_entry(
                "DEVICE_METADATA",
                "localhost",
                field_values! {"hostname" => "sw1", "hwsku" => "Force10-S6000"},
            )
            .with_entry("LOOPBACK_INTERFACE", "Loopback0", Vec::new())
            .with_entry(
                "LOOPBACK_INTERFACE",
                TableKey::pair("Loopback0", "10.0.0.1/32"),
                Vec::new(),
            )
            .with_entry(
                "LOOPBACK_INTERFACE",
                TableKey::pair("Loopback0", "fc00:1::32/128"),
                Vec::new(),
            )
    }

    #[tokio::test]
    async fn test_switch_info() {
        let mut db = base_db();
        let mut reader = TopologyReader::new(&mut db, SysfsNetClass::default());

        let info = reader.switch_info().await.unwrap();
        assert_eq!(
            info,
            SwitchInfo {
                name: "sw1".to_string(),
                ipv4_addr: "10.0.0.1".to_string(),
                ipv6_addr: "fc00:1::32".to_string(),
                hw_sku: "Force10-S6000".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_missing_device_metadata() {
        let mut db = MemoryConfigDb::new();
        let mut reader = TopologyReader::new(&mut db, SysfsNetClass::default());

        let err = reader.switch_info().await.unwrap_err();
        assert!(matches!(err, AdvertiserError::ConfigMissing { .. }));
    }

    #[tokio::test]
    async fn test_missing_hwsku_field() {
        let mut db = MemoryConfigDb::new().with_entry(
            "DEVICE_METADATA",
            "localhost",
            field_values! {"hostname" => "sw1"},
        );
        let mut reader = TopologyReader::new(&mut db, SysfsNetClass::default());

        match reader.switch_info().await.unwrap_err() {
            AdvertiserError::ConfigMissing { field, .. } => assert_eq!(field, "hwsku"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_loopback_address_missing_family_is_empty() {
        let mut db = MemoryConfigDb::new().with_entry(
            "LOOPBACK_INTERFACE",
            TableKey::pair("Loopback0", "10.0.0.1/32"),
            Vec::new(),
        );
        let mut reader = TopologyReader::new(&mut db, SysfsNetClass::default());

        assert_eq!(reader.loopback_address(IpFamily::V4).await.unwrap(), "10.0.0.1");
        assert_eq!(reader.loopback_address(IpFamily::V6).await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_loopback_prefers_configured_interface() {
        let mut db = MemoryConfigDb::new()
            .with_entry(
                "LOOPBACK_INTERFACE",
                TableKey::pair("Loopback0", "10.0.0.1/32"),
                Vec::new(),
            )
            .with_entry(
                "LOOPBACK_INTERFACE",
                TableKey::pair("Loopback0", "fc00::1/128"),
                Vec::new(),
            )
            .with_entry(
                "LOOPBACK_INTERFACE",
                TableKey::pair("Loopback3", "10.3.3.3/32"),
                Vec::new(),
            );
        let mut reader = TopologyReader::new(&mut db, SysfsNetClass::default())
            .with_loopback_interface("Loopback3");

        assert_eq!(reader.loopback_address(IpFamily::V4).await.unwrap(), "10.3.3.3");
        // Loopback3 has no IPv6 address
        assert_eq!(reader.loopback_address(IpFamily::V6).await.unwrap(), "fc00::1");
    }

    #[tokio::test]
    async fn test_vlan_interfaces_invalid_name() {
        let mut db = MemoryConfigDb::new().with_entry("VLAN", "Vlan100", Vec::new()).with_entry(
            "VLAN",
            "Bridge7",
            Vec::new(),
        );
        let mut reader = TopologyReader::new(&mut db, SysfsNetClass::default());

        match reader.vlan_interfaces().await.unwrap_err() {
            AdvertiserError::InvalidInterfaceName { name } => assert_eq!(name, "Bridge7"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_vlan_addresses_exact_interface_match() {
        let table: Table = [
            (TableKey::pair("Vlan10", "10.10.0.1/24"), Vec::new()),
            (TableKey::pair("Vlan100", "10.100.0.1/24"), Vec::new()),
            (TableKey::pair("Vlan100", "2001:db8::1/64"), Vec::new()),
            (TableKey::new("Vlan100"), Vec::new()),
        ]
        .into_iter()
        .collect();

        let vlan10: VlanInterface = "Vlan10".parse().unwrap();
        let addrs = vlan_addresses(&table, &vlan10);
        assert_eq!(addrs.ipv4, vec!["10.10.0.1".to_string()]);
        assert!(addrs.ipv6.is_empty());

        let vlan100: VlanInterface = "Vlan100".parse().unwrap();
        let addrs = vlan_addresses(&table, &vlan100);
        assert_eq!(addrs.ipv4, vec!["10.100.0.1".to_string()]);
        assert_eq!(addrs.ipv6, vec!["2001:db8::1".to_string()]);
    }

    #[tokio::test]
    async fn test_vlan_without_mac_is_excluded() {
        let sysfs = sysfs_with(&[("Vlan100", "aa:bb:cc:dd:ee:ff"), ("Vlan300", "  ")]);
        let mut db = base_db()
            .with_entry("VLAN", "Vlan100", Vec::new())
            .with_entry("VLAN", "Vlan200", Vec::new())
            .with_entry("VLAN", "Vlan300", Vec::new())
            .with_entry(
                "VLAN_INTERFACE",
                TableKey::pair("Vlan100", "192.168.1.1/24"),
                Vec::new(),
            )
            .with_entry(
                "VLAN_INTERFACE",
                TableKey::pair("Vlan200", "192.168.2.1/24"),
                Vec::new(),
            );

        let mut reader = TopologyReader::new(&mut db, SysfsNetClass::new(sysfs.path()));
        let topology = reader.read().await.unwrap();

        assert_eq!(topology.vlans.len(), 3);
        assert_eq!(topology.descriptors.len(), 1);
        assert_eq!(topology.descriptors[0].vlan_id, "100");
        assert_eq!(
            topology.descriptors[0].ipv4_addr_mappings[0].mac_addr,
            "aa:bb:cc:dd:ee:ff"
        );
    }

    #[tokio::test]
    async fn test_mac_address_trims_whitespace() {
        let sysfs = sysfs_with(&[("Vlan100", "  aa:bb:cc:dd:ee:ff  ")]);
        let net = SysfsNetClass::new(sysfs.path());

        assert_eq!(
            net.mac_address("Vlan100").await.as_deref(),
            Some("aa:bb:cc:dd:ee:ff")
        );
        assert_eq!(net.mac_address("Vlan999").await, None);
    }
}
