//! Top-level `set` and `reset` flows

use sonic_cfgmgr_common::ConfigDb;
use tracing::{info, warn};

use crate::config::AdvertiserConfig;
use crate::error::Result;
use crate::negotiator::{Negotiator, SliceTransport};
use crate::topology::{SysfsNetClass, Topology, TopologyReader};
use crate::tunnel::{TunnelApplier, TunnelPlan, TunnelStatus};

/// Drives one run against a CONFIG_DB handle
pub struct Advertiser<'a> {
    db: &'a mut dyn ConfigDb,
    config: AdvertiserConfig,
}

impl<'a> Advertiser<'a> {
    pub fn new(db: &'a mut dyn ConfigDb, config: AdvertiserConfig) -> Self {
        Self { db, config }
    }

    pub fn config(&self) -> &AdvertiserConfig {
        &self.config
    }

    fn topology_reader(&mut self) -> TopologyReader<'_> {
        TopologyReader::new(
            &mut *self.db,
            SysfsNetClass::new(&self.config.paths.sysfs_net_root),
        )
        .with_loopback_interface(&self.config.topology.loopback_interface)
    }

    /// Reads the topology without touching anything.
    pub async fn topology(&mut self) -> Result<Topology> {
        self.topology_reader().read().await
    }

    /// Negotiates a responder and installs the responder path.
    ///
    /// Nothing is written to CONFIG_DB unless negotiation succeeds.
    /// Returns the responder address.
    pub async fn set(
        &mut self,
        transport: &dyn SliceTransport,
        candidates: &[String],
    ) -> Result<String> {
        let topology = self.topology().await?;
        let slice = topology.to_slice(self.config.ferret.duration_secs);

        let negotiated = Negotiator::new(transport)
            .with_port(self.config.ferret.port)
            .with_dump(self.config.diagnostic_dump())
            .negotiate(&slice, candidates)
            .await?;
        let responder = negotiated.responder();

        let plan = TunnelPlan::new(
            topology.switch_info.ipv4_addr,
            responder.clone(),
            topology.vlans,
        );
        let mut applier = TunnelApplier::new(&mut *self.db);
        if let TunnelStatus::Applied { responder } = applier.sync_phase().await? {
            info!("Replacing responder path to {}", responder);
        }
        applier.apply(&plan).await?;

        info!(candidate = %negotiated.candidate, %responder, "Neighbor advertiser set");
        Ok(responder)
    }

    /// Removes the responder path.
    ///
    /// A VLAN table that cannot be read does not stop the teardown; map
    /// entries are then found by scanning the tunnel namespace alone.
    pub async fn reset(&mut self) -> Result<()> {
        let vlans = match self.topology_reader().vlan_interfaces().await {
            Ok(vlans) => vlans,
            Err(e) => {
                warn!("Cannot enumerate VLAN interfaces, continuing: {}", e);
                Vec::new()
            }
        };

        let mut applier = TunnelApplier::new(&mut *self.db);
        if let Err(e) = applier.sync_phase().await {
            warn!("Cannot observe responder path, continuing: {}", e);
        }
        applier.revert(&vlans).await?;

        info!("Neighbor advertiser reset");
        Ok(())
    }
}
