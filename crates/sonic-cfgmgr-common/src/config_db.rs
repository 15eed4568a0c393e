//! CONFIG_DB access abstractions.
//!
//! SONiC stores configuration as Redis hashes named `<TABLE>|<key>`, where the
//! key itself may be composite (`Vlan100|192.168.0.1/21`). [`ConfigDb`] exposes
//! the two operations config tools need: read a whole table and write (or
//! delete) a single entry.

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;

use crate::error::{CfgMgrError, CfgMgrResult};
use crate::fields::FieldValues;

/// Separator between table name and key components in CONFIG_DB.
pub const KEY_SEPARATOR: char = '|';

/// Database identifiers used by config tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DbId {
    /// Configuration database (CONFIG_DB).
    ConfigDb,
    /// Application database (APPL_DB).
    ApplDb,
    /// State database (STATE_DB).
    StateDb,
}

impl DbId {
    /// Returns the database name as used in Redis/SONiC.
    pub fn name(&self) -> &'static str {
        match self {
            DbId::ConfigDb => "CONFIG_DB",
            DbId::ApplDb => "APPL_DB",
            DbId::StateDb => "STATE_DB",
        }
    }

    /// Returns the database ID number.
    pub fn id(&self) -> u32 {
        match self {
            DbId::ConfigDb => 4,
            DbId::ApplDb => 0,
            DbId::StateDb => 6,
        }
    }
}

/// Key of a CONFIG_DB table entry, possibly composite.
///
/// `TableKey::pair("neighadv", "map_1")` is stored as `neighadv|map_1`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TableKey {
    parts: Vec<String>,
}

impl TableKey {
    /// Creates a single-component key.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            parts: vec![key.into()],
        }
    }

    /// Creates a two-component key.
    pub fn pair(first: impl Into<String>, second: impl Into<String>) -> Self {
        Self {
            parts: vec![first.into(), second.into()],
        }
    }

    /// Parses a raw key (without the table prefix).
    pub fn parse(raw: &str) -> CfgMgrResult<Self> {
        if raw.is_empty() {
            return Err(CfgMgrError::InvalidKey {
                key: raw.to_string(),
            });
        }
        Ok(Self {
            parts: raw.split(KEY_SEPARATOR).map(str::to_string).collect(),
        })
    }

    /// Returns the first key component.
    pub fn first(&self) -> &str {
        &self.parts[0]
    }

    /// Returns the key component at `index`, if any.
    pub fn part(&self, index: usize) -> Option<&str> {
        self.parts.get(index).map(String::as_str)
    }

    /// Returns the number of key components.
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    /// Always false: a key has at least one component.
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Returns true if this is a composite key.
    pub fn is_composite(&self) -> bool {
        self.parts.len() > 1
    }

    /// Returns the full Redis key for an entry of `table`.
    pub fn redis_key(&self, table: &str) -> String {
        format!("{}{}{}", table, KEY_SEPARATOR, self)
    }
}

impl fmt::Display for TableKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut sep = "";
        for part in &self.parts {
            write!(f, "{}{}", sep, part)?;
            sep = "|";
        }
        Ok(())
    }
}

impl From<&str> for TableKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

/// Contents of a table, ordered by key.
pub type Table = BTreeMap<TableKey, FieldValues>;

/// Table/key/field access to CONFIG_DB.
///
/// Writes replace the whole entry, mirroring SONiC `ConfigDBConnector.set_entry`.
#[async_trait]
pub trait ConfigDb: Send {
    /// Reads every entry of `table`.
    async fn get_table(&mut self, table: &str) -> CfgMgrResult<Table>;

    /// Writes `values` under `key`, or deletes the entry when `values` is `None`.
    ///
    /// Deleting a missing entry is not an error.
    async fn set_entry(
        &mut self,
        table: &str,
        key: &TableKey,
        values: Option<FieldValues>,
    ) -> CfgMgrResult<()>;

    /// Reads a single entry.
    async fn get_entry(&mut self, table: &str, key: &TableKey) -> CfgMgrResult<Option<FieldValues>> {
        Ok(self.get_table(table).await?.remove(key))
    }

    /// Deletes a single entry.
    async fn delete_entry(&mut self, table: &str, key: &TableKey) -> CfgMgrResult<()> {
        self.set_entry(table, key, None).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_id() {
        assert_eq!(DbId::ConfigDb.name(), "CONFIG_DB");
        assert_eq!(DbId::ConfigDb.id(), 4);
        assert_eq!(DbId::StateDb.id(), 6);
    }

    #[test]
    fn test_table_key_parse_composite() {
        let key = TableKey::parse("Vlan100|192.168.0.1/21").unwrap();
        assert!(key.is_composite());
        assert_eq!(key.first(), "Vlan100");
        assert_eq!(key.part(1), Some("192.168.0.1/21"));
        assert_eq!(key.part(2), None);
    }

    #[test]
    fn test_table_key_ipv6_prefix_stays_whole() {
        let key = TableKey::parse("Loopback0|fc00:1::32/128").unwrap();
        assert_eq!(key.len(), 2);
        assert_eq!(key.part(1), Some("fc00:1::32/128"));
    }

    #[test]
    fn test_table_key_display_and_redis_key() {
        let key = TableKey::pair("neighadv", "map_1");
        assert_eq!(key.to_string(), "neighadv|map_1");
        assert_eq!(key.redis_key("VXLAN_TUNNEL_MAP"), "VXLAN_TUNNEL_MAP|neighadv|map_1");
    }

    #[test]
    fn test_table_key_empty_rejected() {
        assert!(matches!(
            TableKey::parse(""),
            Err(CfgMgrError::InvalidKey { .. })
        ));
    }
}
