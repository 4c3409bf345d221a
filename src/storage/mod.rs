mod error;
mod memory;
mod turso;
mod upstash;

pub use error::StorageError;
pub use memory::{MemoryProfileStore, MemoryPromoStore, MemorySessionStore, MemoryUsageStore};
pub use turso::TursoClient;
pub use upstash::RedisClient;

use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::Arc;

use crate::{
    config::StorageConfig,
    service::{
        profile::{ProfileUpdate, PromoActivation, PromoCode, UserProfile},
        session::Session,
    },
};

/// Durable per-user profile.
#[async_trait]
pub trait ProfileStore: Send + Sync + 'static {
    async fn get_profile(&self, user_id: i64) -> Result<Option<UserProfile>, StorageError>;

    /// Writes only the fields set in `update`, creating the profile if needed.
    async fn save_profile(&self, user_id: i64, update: &ProfileUpdate) -> Result<(), StorageError>;

    /// Records the activation unless the profile already used a code.
    /// Returns `false` when a code was already recorded.
    async fn activate_promo(&self, user_id: i64, activation: &PromoActivation) -> Result<bool, StorageError>;

    async fn delete_profile(&self, user_id: i64) -> Result<(), StorageError>;
}

#[async_trait]
pub trait PromoStore: Send + Sync + 'static {
    async fn get_promo(&self, code: &str) -> Result<Option<PromoCode>, StorageError>;
}

/// Per-user, per-UTC-day message counter.
#[async_trait]
pub trait UsageStore: Send + Sync + 'static {
    async fn get_usage_count(&self, user_id: i64, date: NaiveDate) -> Result<u32, StorageError>;

    /// Atomically adds one and returns the new count.
    async fn increment_usage(&self, user_id: i64, date: NaiveDate) -> Result<u32, StorageError>;

    async fn clear_usage(&self, user_id: i64) -> Result<(), StorageError>;
}

/// Transient per-chat sessions.
pub trait SessionStore: Send + Sync + 'static {
    fn get(&self, chat_id: i64) -> Option<Session>;
    fn set(&self, session: &Session);
    fn delete(&self, chat_id: i64);
}

#[derive(Clone)]
pub struct StorageManager {
    pub profiles: Arc<dyn ProfileStore>,
    pub promos: Arc<dyn PromoStore>,
    pub usage: Arc<dyn UsageStore>,
    pub sessions: Arc<dyn SessionStore>,
}

impl StorageManager {
    pub async fn connect(config: &StorageConfig, session_capacity: usize) -> Result<Self, StorageError> {
        let turso = TursoClient::new(&config.turso_url, &config.turso_token).await?;
        turso.migrate().await?;

        let usage: Arc<dyn UsageStore> = match config.redis_url.as_deref() {
            Some(url) => {
                info!("Using Redis for usage counters");
                Arc::new(RedisClient::new(url).await?)
            }
            None => {
                info!("Using Turso for usage counters");
                Arc::new(turso.clone())
            }
        };

        Ok(Self {
            profiles: Arc::new(turso.clone()),
            promos: Arc::new(turso),
            usage,
            sessions: Arc::new(MemorySessionStore::new(session_capacity)),
        })
    }
}
