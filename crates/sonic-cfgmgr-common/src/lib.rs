//! Common CONFIG_DB infrastructure for SONiC configuration tools.
//!
//! This crate provides the pieces every config tool needs to talk to
//! CONFIG_DB:
//!
//! - [`ConfigDb`]: table/key/field access trait (`get_table`, `set_entry`)
//! - [`TableKey`]: composite `a|b` entry keys
//! - [`RedisConfigDb`]: Redis-backed implementation (feature `redis`)
//! - [`MemoryConfigDb`]: in-memory implementation with a write log, for tests
//! - [`error`]: error types shared by all backends
//!
//! # Example
//!
//! ```ignore
//! use sonic_cfgmgr_common::{field_values, ConfigDb, RedisConfig, RedisConfigDb, TableKey};
//!
//! let mut db = RedisConfigDb::connect(RedisConfig::default()).await?;
//! db.set_entry(
//!     "VXLAN_TUNNEL",
//!     &TableKey::new("neighadv"),
//!     Some(field_values! { "src_ip" => "10.1.0.32", "dst_ip" => "10.64.0.7" }),
//! )
//! .await?;
//! ```

pub mod config_db;
pub mod error;
pub mod fields;
pub mod memory;
#[cfg(feature = "redis")]
pub mod redis_backend;

// Re-export commonly used items at crate root
pub use config_db::{ConfigDb, DbId, Table, TableKey, KEY_SEPARATOR};
pub use error::{CfgMgrError, CfgMgrResult};
pub use fields::{FieldValue, FieldValues, FieldValuesExt, NULL_FIELD};
pub use memory::{MemoryConfigDb, WriteOp};
#[cfg(feature = "redis")]
pub use redis_backend::{RedisConfig, RedisConfigDb, DEFAULT_REDIS_HOST, DEFAULT_REDIS_PORT};
