use std::sync::Arc;

use crate::{
    config::AppConfig,
    error::BotResult,
    service::{dialogue::DialogueService, ServiceRegistry},
    storage::StorageManager,
};

/// Config and services for every endpoint, handed to the dispatcher as a dependency.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub service_registry: ServiceRegistry,
}

impl AppState {
    pub async fn new(config: AppConfig) -> BotResult<Self> {
        let storage = StorageManager::connect(&config.storage, config.session.cache_capacity).await?;
        let service_registry = ServiceRegistry::new(&config, &storage)?;

        Ok(Self {
            config: Arc::new(config),
            service_registry,
        })
    }

    pub fn from_parts(config: AppConfig, storage: StorageManager, dialogue: DialogueService) -> Self {
        let service_registry = ServiceRegistry::from_parts(&config, &storage, dialogue);

        Self {
            config: Arc::new(config),
            service_registry,
        }
    }
}
