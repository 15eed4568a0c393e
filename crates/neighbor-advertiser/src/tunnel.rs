//! VXLAN tunnel and ARP mirror lifecycle in CONFIG_DB
//!
//! The responder path consists of five record families: the VXLAN tunnel,
//! its VLAN to VNI maps, the mirror session, the mirror ACL table and the ARP
//! rule. They are written together by [`TunnelApplier::apply`] and removed
//! together by [`TunnelApplier::revert`]. Every name is fixed, so both
//! operations can be repeated from any starting state.

use std::collections::BTreeSet;
use std::fmt;

use sonic_cfgmgr_common::{field_values, ConfigDb, FieldValues, FieldValuesExt, TableKey};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::tables::{
    fields, names, ACL_TABLE_TYPE_MIRROR, CFG_ACL_RULE_TABLE, CFG_ACL_TABLE,
    CFG_MIRROR_SESSION_TABLE, CFG_VXLAN_TUNNEL_MAP_TABLE, CFG_VXLAN_TUNNEL_TABLE, ETHER_TYPE_ARP,
    MIRROR_ACL_RULE_PRIORITY,
};
use crate::types::VlanInterface;

/// Where the applier is in the apply/revert lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TunnelPhase {
    Absent,
    Applying,
    Applied,
    Reverting,
    /// A previous run stopped part way through
    Interrupted,
}

impl fmt::Display for TunnelPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TunnelPhase::Absent => "absent",
            TunnelPhase::Applying => "applying",
            TunnelPhase::Applied => "applied",
            TunnelPhase::Reverting => "reverting",
            TunnelPhase::Interrupted => "interrupted",
        };
        f.write_str(s)
    }
}

/// Responder path state as found in CONFIG_DB
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TunnelStatus {
    /// None of the records exist
    Absent,
    /// Every record exists and points at `responder`
    Applied { responder: String },
    /// Some records exist, or they disagree
    Partial,
}

impl TunnelStatus {
    fn phase(&self) -> TunnelPhase {
        match self {
            TunnelStatus::Absent => TunnelPhase::Absent,
            TunnelStatus::Applied { .. } => TunnelPhase::Applied,
            TunnelStatus::Partial => TunnelPhase::Interrupted,
        }
    }
}

/// What to write on apply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TunnelPlan {
    /// Local loopback IPv4 address
    pub src_ip: String,
    /// Negotiated responder address
    pub dst_ip: String,
    /// VLANs mapped into the tunnel and bound to the ACL, in order
    pub vlans: Vec<VlanInterface>,
}

impl TunnelPlan {
    pub fn new(
        src_ip: impl Into<String>,
        dst_ip: impl Into<String>,
        vlans: Vec<VlanInterface>,
    ) -> Self {
        Self {
            src_ip: src_ip.into(),
            dst_ip: dst_ip.into(),
            vlans,
        }
    }

    fn endpoint_fields(&self) -> FieldValues {
        field_values! {
            fields::SRC_IP => self.src_ip,
            fields::DST_IP => self.dst_ip,
        }
    }

    fn ports(&self) -> String {
        vlan_ports(&self.vlans)
    }
}

/// Comma separated VLAN names, as bound to the mirror ACL table.
pub fn vlan_ports(vlans: &[VlanInterface]) -> String {
    vlans
        .iter()
        .map(VlanInterface::name)
        .collect::<Vec<_>>()
        .join(",")
}

/// Key of the `index`th (1-based) tunnel map entry.
pub fn tunnel_map_key(index: usize) -> TableKey {
    TableKey::pair(
        names::VXLAN_TUNNEL,
        format!("{}{}", names::VXLAN_TUNNEL_MAP_PREFIX, index),
    )
}

fn tunnel_key() -> TableKey {
    TableKey::new(names::VXLAN_TUNNEL)
}

fn mirror_session_key() -> TableKey {
    TableKey::new(names::MIRROR_SESSION)
}

fn acl_table_key() -> TableKey {
    TableKey::new(names::MIRROR_ACL_TABLE)
}

fn acl_rule_key() -> TableKey {
    TableKey::pair(names::MIRROR_ACL_TABLE, names::MIRROR_ACL_RULE)
}

/// Writes and removes the responder path
pub struct TunnelApplier<'a> {
    db: &'a mut dyn ConfigDb,
    phase: TunnelPhase,
}

impl<'a> TunnelApplier<'a> {
    /// Creates an applier that assumes nothing has been written.
    pub fn new(db: &'a mut dyn ConfigDb) -> Self {
        Self {
            db,
            phase: TunnelPhase::Absent,
        }
    }

    /// Creates an applier whose phase is derived from the current store.
    pub async fn attach(db: &'a mut dyn ConfigDb) -> Result<Self> {
        let mut applier = Self::new(db);
        applier.sync_phase().await?;
        Ok(applier)
    }

    /// Re-derives the phase from the store and returns what was observed.
    pub async fn sync_phase(&mut self) -> Result<TunnelStatus> {
        let status = self.observe().await?;
        self.phase = status.phase();
        if self.phase == TunnelPhase::Interrupted {
            warn!("Found a partially written responder path");
        }
        Ok(status)
    }

    pub fn phase(&self) -> TunnelPhase {
        self.phase
    }

    fn enter(&mut self, phase: TunnelPhase) {
        debug!(from = %self.phase, to = %phase, "Tunnel phase change");
        self.phase = phase;
    }

    /// Inspects CONFIG_DB and classifies the responder path.
    pub async fn observe(&mut self) -> Result<TunnelStatus> {
        let tunnel = self.db.get_entry(CFG_VXLAN_TUNNEL_TABLE, &tunnel_key()).await?;
        let session = self
            .db
            .get_entry(CFG_MIRROR_SESSION_TABLE, &mirror_session_key())
            .await?;
        let acl_table = self.db.get_entry(CFG_ACL_TABLE, &acl_table_key()).await?;
        let acl_rule = self.db.get_entry(CFG_ACL_RULE_TABLE, &acl_rule_key()).await?;
        let maps = self.owned_map_keys().await?;

        let present = [&tunnel, &session, &acl_table, &acl_rule]
            .iter()
            .filter(|entry| entry.is_some())
            .count();

        if present == 0 && maps.is_empty() {
            return Ok(TunnelStatus::Absent);
        }

        let (Some(tunnel), Some(session), Some(acl_table), Some(_)) =
            (tunnel, session, acl_table, acl_rule)
        else {
            return Ok(TunnelStatus::Partial);
        };

        let Some(dst) = tunnel.get_field(fields::DST_IP) else {
            return Ok(TunnelStatus::Partial);
        };
        if session.get_field(fields::DST_IP) != Some(dst) {
            return Ok(TunnelStatus::Partial);
        }

        let has_ports = acl_table
            .get_field(fields::PORTS)
            .is_some_and(|ports| !ports.is_empty());
        if has_ports && maps.is_empty() {
            return Ok(TunnelStatus::Partial);
        }

        Ok(TunnelStatus::Applied {
            responder: dst.to_string(),
        })
    }

    /// Writes the responder path for `plan`.
    ///
    /// Records are written tunnel first and rule last. Map entries of an
    /// earlier apply that are not part of `plan` are removed.
    pub async fn apply(&mut self, plan: &TunnelPlan) -> Result<()> {
        self.enter(TunnelPhase::Applying);

        self.add_vxlan_tunnel(plan).await?;
        self.add_vxlan_tunnel_maps(&plan.vlans).await?;
        self.add_mirror_session(plan).await?;
        self.add_mirror_acl_table(plan).await?;
        self.add_mirror_acl_rule().await?;

        self.enter(TunnelPhase::Applied);
        info!(responder = %plan.dst_ip, vlans = plan.vlans.len(), "Responder path applied");
        Ok(())
    }

    /// Removes the responder path.
    ///
    /// Map entries are removed for every index derived from `vlans` and for
    /// every entry found under the tunnel namespace. The mirror and the VXLAN
    /// teardowns are both attempted; the first error is returned.
    pub async fn revert(&mut self, vlans: &[VlanInterface]) -> Result<()> {
        self.enter(TunnelPhase::Reverting);

        let mirror = self.remove_mirror().await;
        if let Err(e) = &mirror {
            warn!("Mirror teardown failed: {}", e);
        }

        let vxlan = self.remove_vxlan(vlans).await;
        if let Err(e) = &vxlan {
            warn!("VXLAN teardown failed: {}", e);
        }

        mirror?;
        vxlan?;

        self.enter(TunnelPhase::Absent);
        info!("Responder path removed");
        Ok(())
    }

    async fn add_vxlan_tunnel(&mut self, plan: &TunnelPlan) -> Result<()> {
        self.db
            .set_entry(
                CFG_VXLAN_TUNNEL_TABLE,
                &tunnel_key(),
                Some(plan.endpoint_fields()),
            )
            .await?;
        info!("Added VXLAN tunnel {} to {}", names::VXLAN_TUNNEL, plan.dst_ip);
        Ok(())
    }

    async fn add_vxlan_tunnel_maps(&mut self, vlans: &[VlanInterface]) -> Result<()> {
        let mut wanted = BTreeSet::new();
        for (i, vlan) in vlans.iter().enumerate() {
            let key = tunnel_map_key(i + 1);
            let values = field_values! {
                fields::VNI => vlan.vni(),
                fields::VLAN => vlan.name(),
            };
            self.db
                .set_entry(CFG_VXLAN_TUNNEL_MAP_TABLE, &key, Some(values))
                .await?;
            info!("Added VXLAN tunnel map {} for {}", key, vlan);
            wanted.insert(key);
        }

        for stale in self.owned_map_keys().await? {
            if wanted.contains(&stale) {
                continue;
            }
            self.db
                .delete_entry(CFG_VXLAN_TUNNEL_MAP_TABLE, &stale)
                .await?;
            info!("Removed stale VXLAN tunnel map {}", stale);
        }
        Ok(())
    }

    async fn add_mirror_session(&mut self, plan: &TunnelPlan) -> Result<()> {
        self.db
            .set_entry(
                CFG_MIRROR_SESSION_TABLE,
                &mirror_session_key(),
                Some(plan.endpoint_fields()),
            )
            .await?;
        info!("Added mirror session {}", names::MIRROR_SESSION);
        Ok(())
    }

    async fn add_mirror_acl_table(&mut self, plan: &TunnelPlan) -> Result<()> {
        let values = field_values! {
            fields::POLICY_DESC => names::MIRROR_ACL_TABLE,
            fields::TYPE => ACL_TABLE_TYPE_MIRROR,
            fields::PORTS => plan.ports(),
        };
        self.db
            .set_entry(CFG_ACL_TABLE, &acl_table_key(), Some(values))
            .await?;
        info!("Added mirror ACL table {}", names::MIRROR_ACL_TABLE);
        Ok(())
    }

    async fn add_mirror_acl_rule(&mut self) -> Result<()> {
        let values = field_values! {
            fields::PRIORITY => MIRROR_ACL_RULE_PRIORITY,
            fields::ETHER_TYPE => ETHER_TYPE_ARP,
            fields::MIRROR_ACTION => names::MIRROR_SESSION,
        };
        self.db
            .set_entry(CFG_ACL_RULE_TABLE, &acl_rule_key(), Some(values))
            .await?;
        info!("Added mirror ACL rule {}", acl_rule_key());
        Ok(())
    }

    async fn remove_mirror(&mut self) -> Result<()> {
        self.db.delete_entry(CFG_ACL_RULE_TABLE, &acl_rule_key()).await?;
        info!("Removed mirror ACL rule {}", acl_rule_key());

        self.db.delete_entry(CFG_ACL_TABLE, &acl_table_key()).await?;
        info!("Removed mirror ACL table {}", names::MIRROR_ACL_TABLE);

        self.db
            .delete_entry(CFG_MIRROR_SESSION_TABLE, &mirror_session_key())
            .await?;
        info!("Removed mirror session {}", names::MIRROR_SESSION);
        Ok(())
    }

    async fn remove_vxlan(&mut self, vlans: &[VlanInterface]) -> Result<()> {
        let mut keys: BTreeSet<TableKey> = (1..=vlans.len()).map(tunnel_map_key).collect();
        keys.extend(self.owned_map_keys().await?);

        for key in &keys {
            self.db.delete_entry(CFG_VXLAN_TUNNEL_MAP_TABLE, key).await?;
            debug!("Removed VXLAN tunnel map {}", key);
        }
        info!("Removed {} VXLAN tunnel map(s)", keys.len());

        self.db
            .delete_entry(CFG_VXLAN_TUNNEL_TABLE, &tunnel_key())
            .await?;
        info!("Removed VXLAN tunnel {}", names::VXLAN_TUNNEL);
        Ok(())
    }

    /// Every tunnel map key under this tool's namespace.
    async fn owned_map_keys(&mut self) -> Result<BTreeSet<TableKey>> {
        let table = self.db.get_table(CFG_VXLAN_TUNNEL_MAP_TABLE).await?;
        Ok(table
            .into_keys()
            .filter(|key| key.is_composite() && key.first() == names::VXLAN_TUNNEL)
            .collect())
    }
}
