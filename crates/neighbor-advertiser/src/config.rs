//! Configuration file support for neighbor_advertiser
//!
//! Loads settings from a TOML file. Default location:
//! /etc/sonic/neighbor_advertiser.toml. A missing file means defaults;
//! command line flags override file values.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sonic_cfgmgr_common::{DbId, DEFAULT_REDIS_HOST, DEFAULT_REDIS_PORT};
use tracing::info;

use crate::dump::{DiagnosticDump, DEFAULT_DUMP_DIR};
use crate::error::{AdvertiserError, Result};
use crate::negotiator::{DEFAULT_FERRET_PORT, DEFAULT_REQUEST_TIMEOUT_MS};
use crate::topology::{DEFAULT_LOOPBACK_INTERFACE, DEFAULT_SYSFS_NET_ROOT};
use crate::types::DEFAULT_DURATION_SECS;

/// Default configuration file path
pub const DEFAULT_CONFIG_PATH: &str = "/etc/sonic/neighbor_advertiser.toml";

/// Database configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Redis host
    #[serde(default = "default_redis_host")]
    pub redis_host: String,

    /// Redis port
    #[serde(default = "default_redis_port")]
    pub redis_port: u16,

    /// Redis database number for CONFIG_DB
    #[serde(default = "default_config_db_number")]
    pub config_db_number: u32,
}

/// Ferret service settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FerretConfig {
    /// HTTP port of the Ferret service
    #[serde(default = "default_ferret_port")]
    pub port: u16,

    /// Per-candidate request timeout in milliseconds
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Requested assignment lifetime in seconds
    #[serde(default = "default_duration_secs")]
    pub duration_secs: u64,
}

/// Filesystem locations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Directory for request/response snapshots
    #[serde(default = "default_dump_dir")]
    pub dump_dir: PathBuf,

    /// Root of the kernel network interface class (holds `<ifname>/address`)
    #[serde(default = "default_sysfs_net_root")]
    pub sysfs_net_root: PathBuf,
}

/// Topology discovery settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologyConfig {
    /// Loopback interface whose addresses identify the switch
    #[serde(default = "default_loopback_interface")]
    pub loopback_interface: String,
}

/// Complete neighbor_advertiser configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvertiserConfig {
    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub ferret: FerretConfig,

    #[serde(default)]
    pub paths: PathsConfig,

    #[serde(default)]
    pub topology: TopologyConfig,
}

fn default_redis_host() -> String {
    DEFAULT_REDIS_HOST.to_string()
}

fn default_redis_port() -> u16 {
    DEFAULT_REDIS_PORT
}

fn default_config_db_number() -> u32 {
    DbId::ConfigDb.id()
}

fn default_ferret_port() -> u16 {
    DEFAULT_FERRET_PORT
}

fn default_request_timeout_ms() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_MS
}

fn default_duration_secs() -> u64 {
    DEFAULT_DURATION_SECS
}

fn default_dump_dir() -> PathBuf {
    PathBuf::from(DEFAULT_DUMP_DIR)
}

fn default_sysfs_net_root() -> PathBuf {
    PathBuf::from(DEFAULT_SYSFS_NET_ROOT)
}

fn default_loopback_interface() -> String {
    DEFAULT_LOOPBACK_INTERFACE.to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            redis_host: default_redis_host(),
            redis_port: default_redis_port(),
            config_db_number: default_config_db_number(),
        }
    }
}

impl Default for FerretConfig {
    fn default() -> Self {
        Self {
            port: default_ferret_port(),
            request_timeout_ms: default_request_timeout_ms(),
            duration_secs: default_duration_secs(),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            dump_dir: default_dump_dir(),
            sysfs_net_root: default_sysfs_net_root(),
        }
    }
}

impl Default for TopologyConfig {
    fn default() -> Self {
        Self {
            loopback_interface: default_loopback_interface(),
        }
    }
}

impl AdvertiserConfig {
    /// Load configuration from file, falling back to defaults if file not found
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        match fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|e| {
                AdvertiserError::Config(format!(
                    "Failed to parse config file {}: {}",
                    path.display(),
                    e
                ))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "Config file not found, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(AdvertiserError::Config(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))),
        }
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.ferret.request_timeout_ms)
    }

    /// Diagnostic snapshot writer for the configured directory
    pub fn diagnostic_dump(&self) -> DiagnosticDump {
        DiagnosticDump::new(&self.paths.dump_dir)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.database.redis_port == 0 {
            return Err(AdvertiserError::Config(
                "redis_port must be > 0".to_string(),
            ));
        }

        if self.ferret.port == 0 {
            return Err(AdvertiserError::Config(
                "ferret port must be > 0".to_string(),
            ));
        }

        if self.ferret.request_timeout_ms == 0 {
            return Err(AdvertiserError::Config(
                "request_timeout_ms must be > 0".to_string(),
            ));
        }

        if self.ferret.duration_secs == 0 {
            return Err(AdvertiserError::Config(
                "duration_secs must be > 0".to_string(),
            ));
        }

        if self.topology.loopback_interface.is_empty() {
            return Err(AdvertiserError::Config(
                "loopback_interface must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}
