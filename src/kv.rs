use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum KvError {
    #[error("redis: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("stored value is not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),
}

/// The key-value store the `/kv` endpoint reads flags from.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, KvError>;

    /// Store `value` only if `key` does not exist yet. Returns whether it was written.
    async fn put_if_absent(&self, key: &str, value: &str) -> Result<bool, KvError>;
}

/// Read `key` and parse it as JSON. A missing key reads as `null`.
pub async fn get_json(kv: &dyn KvStore, key: &str) -> Result<Value, KvError> {
    match kv.get(key).await? {
        Some(raw) => Ok(serde_json::from_str(&raw)?),
        None => Ok(Value::Null),
    }
}

/// Redis-backed store.
///
/// `ConnectionManager` is cheaply cloneable and reconnects on its own, so
/// every call works on a clone of the same multiplexed connection.
#[derive(Clone)]
pub struct RedisKv {
    conn: ConnectionManager,
}

impl RedisKv {
    pub async fn connect(url: &str) -> Result<Self, KvError> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl KvStore for RedisKv {
    async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        let mut conn = self.conn.clone();
        Ok(conn.get(key).await?)
    }

    async fn put_if_absent(&self, key: &str, value: &str) -> Result<bool, KvError> {
        let mut conn = self.conn.clone();
        Ok(conn.set_nx(key, value).await?)
    }
}
