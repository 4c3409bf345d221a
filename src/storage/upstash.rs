use async_trait::async_trait;
use chrono::NaiveDate;
use redis::{aio::MultiplexedConnection, AsyncCommands, Client};

use std::sync::Arc;

use super::{StorageError, UsageStore};

/// Counters outlive their day a little so late reads around midnight still work.
const USAGE_TTL_SECS: u64 = 2 * 24 * 60 * 60;

#[derive(Clone)]
pub struct RedisClient {
    inner: Arc<redis::Client>,
}

impl RedisClient {
    pub async fn new(url: &str) -> Result<Self, StorageError> {
        info!("Initializing RedisClient...");
        let redis = Arc::new(Client::open(url)?);

        let mut conn = redis.get_multiplexed_async_connection().await?;
        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        if pong != "PONG" {
            return Err(StorageError::Redis("Redis connection test failed".to_string()));
        }
        info!("Redis connection test successful");
        info!("RedisClient initialized");
        Ok(Self { inner: redis })
    }

    pub async fn get_connection(&self) -> Result<MultiplexedConnection, StorageError> {
        let conn = self.inner.get_multiplexed_async_connection().await?;
        Ok(conn)
    }
}

fn usage_key(user_id: i64, date: NaiveDate) -> String {
    format!("usage:{}:{}", user_id, date)
}

#[async_trait]
impl UsageStore for RedisClient {
    async fn get_usage_count(&self, user_id: i64, date: NaiveDate) -> Result<u32, StorageError> {
        let mut conn = self.get_connection().await?;
        let count: Option<u32> = conn.get(usage_key(user_id, date)).await?;
        Ok(count.unwrap_or(0))
    }

    async fn increment_usage(&self, user_id: i64, date: NaiveDate) -> Result<u32, StorageError> {
        let mut conn = self.get_connection().await?;
        let key = usage_key(user_id, date);

        let (count,): (u32,) = redis::pipe()
            .atomic()
            .cmd("INCR")
            .arg(&key)
            .cmd("EXPIRE")
            .arg(&key)
            .arg(USAGE_TTL_SECS)
            .ignore()
            .query_async(&mut conn)
            .await?;

        Ok(count)
    }

    async fn clear_usage(&self, user_id: i64) -> Result<(), StorageError> {
        let mut conn = self.get_connection().await?;
        let keys: Vec<String> = conn.keys(format!("usage:{}:*", user_id)).await?;
        if !keys.is_empty() {
            conn.del::<_, i32>(keys).await?;
        }
        Ok(())
    }
}
