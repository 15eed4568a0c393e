//! Slice builder

use crate::topology::Topology;
use crate::types::{
    NeighborAdvertiserSlice, RespondingSchemeConfig, SwitchInfo, VlanInterfaceDescriptor,
};

/// Assembles the negotiation request. Pure and deterministic.
pub fn build_slice(
    switch_info: &SwitchInfo,
    vlan_interfaces: &[VlanInterfaceDescriptor],
    duration_secs: u64,
) -> NeighborAdvertiserSlice {
    NeighborAdvertiserSlice {
        switch_info: switch_info.clone(),
        vlan_interfaces: vlan_interfaces.to_vec(),
        responding_schemes: RespondingSchemeConfig {
            duration_in_sec: duration_secs,
        },
    }
}

impl Topology {
    /// Builds the slice advertising this topology.
    pub fn to_slice(&self, duration_secs: u64) -> NeighborAdvertiserSlice {
        build_slice(&self.switch_info, &self.descriptors, duration_secs)
    }
}
