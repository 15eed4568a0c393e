//! In-memory CONFIG_DB.
//!
//! Used by unit and integration tests in place of a Redis server. Every
//! `set_entry` call is recorded in a write log so tests can assert on the
//! order of writes, or on their absence.

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::config_db::{ConfigDb, Table, TableKey};
use crate::error::{CfgMgrError, CfgMgrResult};
use crate::fields::FieldValues;

/// A single recorded write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOp {
    /// Entry written (replaced).
    Set { table: String, key: TableKey },
    /// Entry deleted.
    Del { table: String, key: TableKey },
}

impl WriteOp {
    /// Table the write targeted.
    pub fn table(&self) -> &str {
        match self {
            WriteOp::Set { table, .. } | WriteOp::Del { table, .. } => table,
        }
    }

    /// Key the write targeted.
    pub fn key(&self) -> &TableKey {
        match self {
            WriteOp::Set { key, .. } | WriteOp::Del { key, .. } => key,
        }
    }

    /// Returns true for deletions.
    pub fn is_delete(&self) -> bool {
        matches!(self, WriteOp::Del { .. })
    }
}

/// CONFIG_DB held in process memory.
#[derive(Debug, Default, Clone)]
pub struct MemoryConfigDb {
    tables: BTreeMap<String, Table>,
    writes: Vec<WriteOp>,
    fail_after: Option<usize>,
    failing_table: Option<String>,
}

impl MemoryConfigDb {
    /// Creates an empty database.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds an entry without recording a write (builder pattern).
    pub fn with_entry(
        mut self,
        table: &str,
        key: impl Into<TableKey>,
        values: FieldValues,
    ) -> Self {
        self.insert(table, key.into(), values);
        self
    }

    /// Seeds an entry without recording a write.
    pub fn insert(&mut self, table: &str, key: TableKey, values: FieldValues) {
        self.tables
            .entry(table.to_string())
            .or_default()
            .insert(key, values);
    }

    /// Makes every write after the first `writes` fail, simulating a crash mid-sequence.
    pub fn fail_after_writes(&mut self, writes: usize) {
        self.fail_after = Some(self.writes.len() + writes);
    }

    /// Makes every write to `table` fail.
    pub fn fail_writes_to(&mut self, table: &str) {
        self.failing_table = Some(table.to_string());
    }

    /// Clears any injected failure.
    pub fn clear_failure(&mut self) {
        self.fail_after = None;
        self.failing_table = None;
    }

    /// Returns the entry stored under `key`, if any.
    pub fn entry(&self, table: &str, key: &TableKey) -> Option<&FieldValues> {
        self.tables.get(table)?.get(key)
    }

    /// Returns true if `table` holds `key`.
    pub fn contains(&self, table: &str, key: &TableKey) -> bool {
        self.entry(table, key).is_some()
    }

    /// Returns the number of entries in `table`.
    pub fn table_len(&self, table: &str) -> usize {
        self.tables.get(table).map_or(0, BTreeMap::len)
    }

    /// Returns a snapshot of all tables.
    pub fn tables(&self) -> &BTreeMap<String, Table> {
        &self.tables
    }

    /// Returns the recorded write log.
    pub fn writes(&self) -> &[WriteOp] {
        &self.writes
    }

    /// Clears the write log.
    pub fn clear_writes(&mut self) {
        self.writes.clear();
        self.fail_after = None;
    }
}

#[async_trait]
impl ConfigDb for MemoryConfigDb {
    async fn get_table(&mut self, table: &str) -> CfgMgrResult<Table> {
        Ok(self.tables.get(table).cloned().unwrap_or_default())
    }

    async fn set_entry(
        &mut self,
        table: &str,
        key: &TableKey,
        values: Option<FieldValues>,
    ) -> CfgMgrResult<()> {
        let limit_reached = self.fail_after.is_some_and(|limit| self.writes.len() >= limit);
        if limit_reached || self.failing_table.as_deref() == Some(table) {
            return Err(CfgMgrError::database(
                "set",
                format!("injected failure writing {}", key.redis_key(table)),
            ));
        }

        match values {
            Some(values) => {
                self.insert(table, key.clone(), values);
                self.writes.push(WriteOp::Set {
                    table: table.to_string(),
                    key: key.clone(),
                });
            }
            None => {
                if let Some(entries) = self.tables.get_mut(table) {
                    entries.remove(key);
                    if entries.is_empty() {
                        self.tables.remove(table);
                    }
                }
                self.writes.push(WriteOp::Del {
                    table: table.to_string(),
                    key: key.clone(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field_values;

    #[tokio::test]
    async fn test_set_get_delete() {
        let mut db = MemoryConfigDb::new();
        let key = TableKey::new("neighadv");

        db.set_entry("VXLAN_TUNNEL", &key, Some(field_values! {"dst_ip" => "10.0.0.2"}))
            .await
            .unwrap();
        assert_eq!(db.table_len("VXLAN_TUNNEL"), 1);

        let entry = db.get_entry("VXLAN_TUNNEL", &key).await.unwrap();
        assert_eq!(entry, Some(field_values! {"dst_ip" => "10.0.0.2"}));

        db.delete_entry("VXLAN_TUNNEL", &key).await.unwrap();
        assert!(!db.contains("VXLAN_TUNNEL", &key));
        assert!(db.tables().is_empty());
        assert_eq!(db.writes().len(), 2);
        assert!(db.writes()[1].is_delete());
    }

    #[tokio::test]
    async fn test_delete_missing_is_ok() {
        let mut db = MemoryConfigDb::new();
        db.delete_entry("ACL_TABLE", &TableKey::new("missing"))
            .await
            .unwrap();
        assert_eq!(db.writes().len(), 1);
    }

    #[tokio::test]
    async fn test_seeded_entries_are_not_logged() {
        let mut db = MemoryConfigDb::new().with_entry("VLAN", "Vlan100", Vec::new());
        assert!(db.writes().is_empty());
        let table = db.get_table("VLAN").await.unwrap();
        assert!(table.contains_key(&TableKey::new("Vlan100")));
    }

    #[tokio::test]
    async fn test_injected_failure() {
        let mut db = MemoryConfigDb::new();
        db.fail_after_writes(1);

        let key = TableKey::new("a");
        db.set_entry("T", &key, Some(Vec::new())).await.unwrap();
        let err = db.set_entry("T", &key, None).await.unwrap_err();
        assert!(err.is_retryable());
        assert!(db.contains("T", &key));

        db.clear_failure();
        db.set_entry("T", &key, None).await.unwrap();
        assert!(!db.contains("T", &key));
    }

    #[tokio::test]
    async fn test_injected_table_failure() {
        let mut db = MemoryConfigDb::new();
        db.fail_writes_to("ACL_TABLE");

        assert!(db
            .set_entry("ACL_TABLE", &TableKey::new("x"), Some(Vec::new()))
            .await
            .is_err());
        db.set_entry("ACL_RULE", &TableKey::new("x"), Some(Vec::new()))
            .await
            .unwrap();
        assert_eq!(db.writes().len(), 1);
        assert_eq!(db.writes()[0].table(), "ACL_RULE");
    }
}
