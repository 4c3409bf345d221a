mod model;

pub use model::*;

use std::sync::Arc;

use crate::{
    service::ServiceError,
    storage::{ProfileStore, UsageStore},
};

#[derive(Clone)]
pub struct ProfileService {
    profiles: Arc<dyn ProfileStore>,
    usage: Arc<dyn UsageStore>,
}

impl ProfileService {
    pub fn new(profiles: Arc<dyn ProfileStore>, usage: Arc<dyn UsageStore>) -> Self {
        Self { profiles, usage }
    }

    pub async fn get_profile(&self, user_id: i64) -> Result<Option<UserProfile>, ServiceError> {
        Ok(self.profiles.get_profile(user_id).await?)
    }

    /// Best effort: a failed write is logged and reported as `false`, never raised.
    pub async fn save(&self, user_id: i64, update: ProfileUpdate) -> bool {
        if update.is_empty() {
            return true;
        }

        match self.profiles.save_profile(user_id, &update).await {
            Ok(()) => true,
            Err(e) => {
                error!("Failed to save profile for user {}: {} ({:?})", user_id, e, update);
                false
            }
        }
    }

    /// Removes the profile and every usage counter of the user.
    pub async fn erase(&self, user_id: i64) -> Result<(), ServiceError> {
        self.usage.clear_usage(user_id).await?;
        self.profiles.delete_profile(user_id).await?;
        info!("Erased stored data of user {}", user_id);
        Ok(())
    }
}
