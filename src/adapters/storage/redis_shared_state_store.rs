//! Redis-backed SharedStateStore for multi-process deployments.
//!
//! Values are written with `SET key value EX ttl`, so abandoned entries
//! expire on their own. Prefix listing uses `SCAN` rather than `KEYS` to
//! avoid blocking the server.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use std::time::Duration;

use crate::ports::{SharedStateStore, StateStoreError};

const SCAN_BATCH: usize = 200;

#[derive(Clone)]
pub struct RedisSharedStateStore {
    conn: MultiplexedConnection,
}

impl RedisSharedStateStore {
    pub fn new(conn: MultiplexedConnection) -> Self {
        Self { conn }
    }

    /// Opens a multiplexed connection to `url`.
    pub async fn connect(url: &str) -> Result<Self, StateStoreError> {
        let client = redis::Client::open(url)
            .map_err(|e: redis::RedisError| StateStoreError::Connection(e.to_string()))?;
        let conn = client
            .get_multiplexed_tokio_connection()
            .await
            .map_err(|e: redis::RedisError| StateStoreError::Connection(e.to_string()))?;
        Ok(Self::new(conn))
    }
}

#[async_trait]
impl SharedStateStore for RedisSharedStateStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StateStoreError> {
        let mut conn = self.conn.clone();
        conn.get::<_, Option<Vec<u8>>>(key)
            .await
            .map_err(|e: redis::RedisError| StateStoreError::Command(e.to_string()))
    }

    async fn set_with_ttl(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), StateStoreError> {
        let mut conn = self.conn.clone();
        let seconds = ttl.as_secs().max(1);
        redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("EX")
            .arg(seconds)
            .query_async::<_, ()>(&mut conn)
            .await
            .map_err(|e: redis::RedisError| StateStoreError::Command(e.to_string()))
    }

    async fn delete(&self, key: &str) -> Result<(), StateStoreError> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(key)
            .await
            .map_err(|e: redis::RedisError| StateStoreError::Command(e.to_string()))
    }

    async fn list_keys_by_prefix(&self, prefix: &str) -> Result<Vec<String>, StateStoreError> {
        let mut conn = self.conn.clone();
        let pattern = format!("{prefix}*");
        let mut cursor: u64 = 0;
        let mut keys = Vec::new();

        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await
                .map_err(|e: redis::RedisError| StateStoreError::Command(e.to_string()))?;
            keys.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }

        keys.sort();
        keys.dedup();
        Ok(keys)
    }
}
