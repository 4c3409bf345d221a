use async_trait::async_trait;
use chrono::NaiveDate;
use dashmap::DashMap;
use std::{hash::Hash, sync::Arc};

use crate::service::{
    profile::{format_timestamp, ProfileUpdate, PromoActivation, PromoCode, UserProfile},
    session::Session,
};

use super::{ProfileStore, PromoStore, SessionStore, StorageError, UsageStore};

#[derive(Clone, Debug)]
pub struct MemoryCache<K: Eq + Hash, T: Clone> {
    cache: Arc<DashMap<K, T>>,
}

impl<K: Eq + Hash, T: Clone> MemoryCache<K, T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            cache: Arc::new(DashMap::with_capacity(capacity)),
        }
    }

    pub fn get(&self, key: &K) -> Option<T> {
        self.cache.get(key).map(|value| value.value().clone())
    }

    pub fn set(&self, key: K, value: T) {
        self.cache.insert(key, value);
    }

    pub fn del(&self, key: &K) {
        self.cache.remove(key);
    }

    pub fn retain(&self, f: impl FnMut(&K, &mut T) -> bool) {
        self.cache.retain(f);
    }

    /// Runs `f` on the entry for `key` under its shard lock, inserting
    /// `T::default()` first if absent.
    pub fn update<R>(&self, key: K, f: impl FnOnce(&mut T) -> R) -> R
    where
        T: Default,
    {
        let mut entry = self.cache.entry(key).or_default();
        f(entry.value_mut())
    }
}

impl<K: Eq + Hash, T: Clone> Default for MemoryCache<K, T> {
    fn default() -> Self {
        Self::new(0)
    }
}

#[derive(Clone, Default)]
pub struct MemoryProfileStore {
    profiles: MemoryCache<i64, UserProfile>,
}

impl MemoryProfileStore {
    pub fn insert(&self, profile: UserProfile) {
        self.profiles.set(profile.user_id, profile);
    }
}

#[async_trait]
impl ProfileStore for MemoryProfileStore {
    async fn get_profile(&self, user_id: i64) -> Result<Option<UserProfile>, StorageError> {
        Ok(self.profiles.get(&user_id))
    }

    async fn save_profile(&self, user_id: i64, update: &ProfileUpdate) -> Result<(), StorageError> {
        self.profiles.update(user_id, |profile| {
            profile.user_id = user_id;
            profile.apply(update);
        });
        Ok(())
    }

    async fn activate_promo(&self, user_id: i64, activation: &PromoActivation) -> Result<bool, StorageError> {
        Ok(self.profiles.update(user_id, |profile| {
            profile.user_id = user_id;
            if profile.promo_code_used.is_some() {
                return false;
            }
            profile.promo_code_used = Some(activation.code.clone());
            profile.promo_type = Some(activation.promo_type);
            profile.promo_activated_at = Some(format_timestamp(activation.activated_at));
            profile.promo_days = activation.days;
            true
        }))
    }

    async fn delete_profile(&self, user_id: i64) -> Result<(), StorageError> {
        self.profiles.del(&user_id);
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct MemoryPromoStore {
    codes: MemoryCache<String, PromoCode>,
}

impl MemoryPromoStore {
    pub fn insert(&self, promo: PromoCode) {
        self.codes.set(promo.code.clone(), promo);
    }
}

#[async_trait]
impl PromoStore for MemoryPromoStore {
    async fn get_promo(&self, code: &str) -> Result<Option<PromoCode>, StorageError> {
        Ok(self.codes.get(&code.to_string()))
    }
}

#[derive(Clone, Default)]
pub struct MemoryUsageStore {
    counts: MemoryCache<(i64, NaiveDate), u32>,
}

#[async_trait]
impl UsageStore for MemoryUsageStore {
    async fn get_usage_count(&self, user_id: i64, date: NaiveDate) -> Result<u32, StorageError> {
        Ok(self.counts.get(&(user_id, date)).unwrap_or(0))
    }

    async fn increment_usage(&self, user_id: i64, date: NaiveDate) -> Result<u32, StorageError> {
        Ok(self.counts.update((user_id, date), |count| {
            *count += 1;
            *count
        }))
    }

    async fn clear_usage(&self, user_id: i64) -> Result<(), StorageError> {
        self.counts.retain(|(id, _), _| *id != user_id);
        Ok(())
    }
}

#[derive(Clone)]
pub struct MemorySessionStore {
    sessions: MemoryCache<i64, Session>,
}

impl MemorySessionStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            sessions: MemoryCache::new(capacity),
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, chat_id: i64) -> Option<Session> {
        self.sessions.get(&chat_id)
    }

    fn set(&self, session: &Session) {
        self.sessions.set(session.chat_id, session.clone());
    }

    fn delete(&self, chat_id: i64) {
        self.sessions.del(&chat_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::profile::{Language, PromoType};
    use chrono::Utc;

    #[tokio::test]
    async fn test_usage_counter_per_day() {
        let store = MemoryUsageStore::default();
        let today = NaiveDate::from_ymd_opt(2025, 1, 10).unwrap();
        let tomorrow = today.succ_opt().unwrap();

        assert_eq!(store.get_usage_count(1, today).await.unwrap(), 0);
        assert_eq!(store.increment_usage(1, today).await.unwrap(), 1);
        assert_eq!(store.increment_usage(1, today).await.unwrap(), 2);
        assert_eq!(store.get_usage_count(1, today).await.unwrap(), 2);
        assert_eq!(store.get_usage_count(1, today).await.unwrap(), 2);

        assert_eq!(store.get_usage_count(1, tomorrow).await.unwrap(), 0);
        assert_eq!(store.get_usage_count(2, today).await.unwrap(), 0);

        store.clear_usage(1).await.unwrap();
        assert_eq!(store.get_usage_count(1, today).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_increments_are_counted() {
        let store = MemoryUsageStore::default();
        let today = Utc::now().date_naive();

        let handles: Vec<_> = (0..20)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.increment_usage(9, today).await.unwrap() })
            })
            .collect();

        let mut results = Vec::new();
        for handle in handles {
            results.push(handle.await.unwrap());
        }
        results.sort();

        assert_eq!(results, (1..=20).collect::<Vec<u32>>());
    }

    #[tokio::test]
    async fn test_save_profile_is_partial() {
        let store = MemoryProfileStore::default();
        store
            .save_profile(3, &ProfileUpdate::interface_lang(Language::Russian))
            .await
            .unwrap();
        store
            .save_profile(3, &ProfileUpdate::target_lang(Language::German))
            .await
            .unwrap();

        let profile = store.get_profile(3).await.unwrap().unwrap();
        assert_eq!(profile.user_id, 3);
        assert_eq!(profile.interface_lang, Some(Language::Russian));
        assert_eq!(profile.target_lang, Some(Language::German));
    }

    #[tokio::test]
    async fn test_activate_promo_once() {
        let store = MemoryProfileStore::default();
        let activation = PromoActivation {
            code: "FIRST".into(),
            promo_type: PromoType::Permanent,
            activated_at: Utc::now(),
            days: None,
        };

        assert!(store.activate_promo(4, &activation).await.unwrap());

        let second = PromoActivation {
            code: "SECOND".into(),
            ..activation
        };
        assert!(!store.activate_promo(4, &second).await.unwrap());

        let profile = store.get_profile(4).await.unwrap().unwrap();
        assert_eq!(profile.promo_code_used.as_deref(), Some("FIRST"));
    }
}
