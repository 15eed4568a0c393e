//! Neighbor advertiser - ARP/ND responder provisioning for SONiC
//!
//! neighbor_advertiser lets a remote service answer ARP and neighbor
//! discovery on behalf of a switch's VLAN interfaces:
//! - Topology discovery from CONFIG_DB and sysfs
//! - Slice negotiation with Ferret candidates, in failover order
//! - VXLAN tunnel, tunnel maps and ARP mirror ACL in CONFIG_DB
//! - Idempotent teardown of everything it wrote

pub mod advertiser;
pub mod config;
pub mod dump;
pub mod error;
pub mod negotiator;
pub mod slice;
pub mod tables;
pub mod topology;
pub mod tunnel;
pub mod types;

pub use advertiser::Advertiser;
pub use config::AdvertiserConfig;
pub use dump::DiagnosticDump;
pub use error::{AdvertiserError, Result, TransportFailure};
pub use negotiator::{parse_candidates, HttpSliceTransport, Negotiator, SliceTransport};
pub use slice::build_slice;
pub use topology::{SysfsNetClass, Topology, TopologyReader};
pub use tunnel::{TunnelApplier, TunnelPhase, TunnelPlan, TunnelStatus};
pub use types::{NeighborAdvertiserSlice, NegotiationResult, VlanInterface};
