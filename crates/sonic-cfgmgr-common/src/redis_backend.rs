//! Redis-backed CONFIG_DB client.
//!
//! Entries are Redis hashes named `<TABLE>|<key>`. Tables are read with
//! `KEYS` + `HGETALL`; writes replace the whole hash inside a MULTI/EXEC
//! pipeline so readers never observe a half-written entry.

use std::collections::HashMap;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use tracing::{debug, info, instrument};

use crate::config_db::{ConfigDb, DbId, Table, TableKey, KEY_SEPARATOR};
use crate::error::{CfgMgrError, CfgMgrResult};
use crate::fields::{FieldValues, NULL_FIELD};

/// Default Redis host for SONiC databases.
pub const DEFAULT_REDIS_HOST: &str = "127.0.0.1";

/// Default Redis port for SONiC databases.
pub const DEFAULT_REDIS_PORT: u16 = 6379;

/// Configuration for a CONFIG_DB connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedisConfig {
    /// Redis server hostname or IP
    pub host: String,
    /// Redis server port
    pub port: u16,
    /// Redis database number
    pub db: u32,
}

impl RedisConfig {
    /// Creates a new Redis configuration.
    pub fn new(host: impl Into<String>, port: u16, db: u32) -> Self {
        Self {
            host: host.into(),
            port,
            db,
        }
    }

    /// Creates CONFIG_DB connection config.
    pub fn config_db(host: impl Into<String>, port: u16) -> Self {
        Self::new(host, port, DbId::ConfigDb.id())
    }

    /// Returns the Redis connection URI.
    pub fn uri(&self) -> String {
        format!("redis://{}:{}/{}", self.host, self.port, self.db)
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self::config_db(DEFAULT_REDIS_HOST, DEFAULT_REDIS_PORT)
    }
}

/// CONFIG_DB connection.
pub struct RedisConfigDb {
    config: RedisConfig,
    connection: ConnectionManager,
}

impl RedisConfigDb {
    /// Connects to the database described by `config`.
    #[instrument(skip_all, fields(uri = %config.uri()))]
    pub async fn connect(config: RedisConfig) -> CfgMgrResult<Self> {
        let uri = config.uri();

        let client = Client::open(uri.clone())
            .map_err(|e| CfgMgrError::database("connect", format!("{}: {}", uri, e)))?;

        let connection = ConnectionManager::new(client).await.map_err(|e| {
            CfgMgrError::database("connect", format!("Failed to create connection: {}", e))
        })?;

        info!(host = %config.host, db = config.db, "Connected to CONFIG_DB");

        Ok(Self { config, connection })
    }

    /// Returns the connection configuration.
    pub fn config(&self) -> &RedisConfig {
        &self.config
    }
}

#[async_trait]
impl ConfigDb for RedisConfigDb {
    async fn get_table(&mut self, table: &str) -> CfgMgrResult<Table> {
        let pattern = format!("{}{}*", table, KEY_SEPARATOR);
        let keys: Vec<String> = self
            .connection
            .keys(&pattern)
            .await
            .map_err(|e| CfgMgrError::database("keys", e.to_string()))?;

        let mut entries = Table::new();
        for redis_key in keys {
            let Some(key) = split_table_key(table, &redis_key) else {
                continue;
            };
            let raw: HashMap<String, String> = self
                .connection
                .hgetall(&redis_key)
                .await
                .map_err(|e| CfgMgrError::database("hgetall", e.to_string()))?;
            entries.insert(key, decode_fields(raw));
        }

        debug!(table, entries = entries.len(), "Read table");
        Ok(entries)
    }

    async fn set_entry(
        &mut self,
        table: &str,
        key: &TableKey,
        values: Option<FieldValues>,
    ) -> CfgMgrResult<()> {
        let redis_key = key.redis_key(table);

        match values {
            None => {
                let _: () = self
                    .connection
                    .del(&redis_key)
                    .await
                    .map_err(|e| CfgMgrError::database("del", e.to_string()))?;
                debug!(key = %redis_key, "Deleted entry");
            }
            Some(values) => {
                let fields = encode_fields(values);
                let _: () = redis::pipe()
                    .atomic()
                    .del(&redis_key)
                    .ignore()
                    .hset_multiple(&redis_key, fields.as_slice())
                    .ignore()
                    .query_async(&mut self.connection)
                    .await
                    .map_err(|e| CfgMgrError::database("hset", e.to_string()))?;
                debug!(key = %redis_key, fields = fields.len(), "Wrote entry");
            }
        }

        Ok(())
    }
}

/// Strips the `<TABLE>|` prefix from a Redis key.
fn split_table_key(table: &str, redis_key: &str) -> Option<TableKey> {
    let rest = redis_key
        .strip_prefix(table)?
        .strip_prefix(KEY_SEPARATOR)?;
    TableKey::parse(rest).ok()
}

/// Converts a Redis hash into ordered field values, dropping the `NULL` placeholder.
fn decode_fields(raw: HashMap<String, String>) -> FieldValues {
    let mut fields: FieldValues = raw.into_iter().filter(|(f, _)| f != NULL_FIELD).collect();
    fields.sort();
    fields
}

/// Redis cannot store an empty hash; SONiC writes `NULL=NULL` instead.
fn encode_fields(values: FieldValues) -> FieldValues {
    if values.is_empty() {
        vec![(NULL_FIELD.to_string(), NULL_FIELD.to_string())]
    } else {
        values
    }
}
