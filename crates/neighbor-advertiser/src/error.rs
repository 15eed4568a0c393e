//! Error types for neighbor_advertiser

use std::path::PathBuf;

use sonic_cfgmgr_common::CfgMgrError;
use thiserror::Error;

/// Why a single negotiation candidate failed.
#[derive(Debug, Error)]
pub enum TransportFailure {
    /// The request timed out.
    #[error("request timed out")]
    Timeout,

    /// The request could not be sent (connection refused, DNS failure, ...).
    #[error("request failed: {0}")]
    Request(String),

    /// The service answered with a non-2xx status.
    #[error("HTTP status {status}: {body}")]
    Status { status: u16, body: String },

    /// A 2xx response that does not carry a usable responder address.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Errors that can occur in neighbor_advertiser
#[derive(Debug, Error)]
pub enum AdvertiserError {
    /// A required CONFIG_DB record or field is absent.
    #[error("Missing CONFIG_DB entry {table}|{key} (field '{field}')")]
    ConfigMissing {
        table: String,
        key: String,
        field: String,
    },

    /// A VLAN interface name does not follow the `Vlan<id>` pattern.
    #[error("Invalid VLAN interface name '{name}'")]
    InvalidInterfaceName { name: String },

    /// A negotiation candidate failed.
    #[error("Candidate {candidate} failed: {source}")]
    Transport {
        candidate: String,
        #[source]
        source: TransportFailure,
    },

    /// Every negotiation candidate failed.
    #[error("Negotiation failed after trying {attempted} candidate(s)")]
    NegotiationFailed { attempted: usize },

    /// `set` was requested without any candidate host.
    #[error("No Ferret service candidates given")]
    NoCandidates,

    /// CONFIG_DB access failed.
    #[error("CONFIG_DB error: {0}")]
    Database(#[from] CfgMgrError),

    /// A diagnostic snapshot could not be written.
    #[error("Failed to write diagnostic file {}: {source}", .path.display())]
    Dump {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration file or override is invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP client could not be constructed.
    #[error("HTTP client error: {0}")]
    HttpClient(String),
}

impl AdvertiserError {
    /// Creates a missing-config error.
    pub fn config_missing(
        table: impl Into<String>,
        key: impl Into<String>,
        field: impl Into<String>,
    ) -> Self {
        Self::ConfigMissing {
            table: table.into(),
            key: key.into(),
            field: field.into(),
        }
    }
}

/// Result type alias for neighbor_advertiser operations
pub type Result<T> = std::result::Result<T, AdvertiserError>;
