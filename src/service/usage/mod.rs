mod model;

pub use model::*;

use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::{config::GateConfig, service::entitlement::EntitlementService, storage::UsageStore};

/// Meters countable messages against the free daily quota.
#[derive(Clone)]
pub struct UsageGate {
    entitlement: EntitlementService,
    usage: Arc<dyn UsageStore>,
    config: GateConfig,
}

impl UsageGate {
    pub fn new(entitlement: EntitlementService, usage: Arc<dyn UsageStore>, config: GateConfig) -> Self {
        Self {
            entitlement,
            usage,
            config,
        }
    }

    pub fn daily_limit(&self) -> u32 {
        self.config.daily_limit
    }

    /// Messages left after the reminder fires.
    pub fn remaining_at_reminder(&self) -> u32 {
        self.config.daily_limit.saturating_sub(self.config.reminder_at)
    }

    /// Entitlement errors fail closed, the first count read fails open and a
    /// failed increment halts.
    pub async fn check(&self, user_id: i64, now: DateTime<Utc>) -> GateDecision {
        if self.entitlement.has_unrestricted_access(user_id, now).await {
            debug!("User {} has unrestricted access", user_id);
            return GateDecision::Unlimited;
        }

        let today = now.date_naive();

        let used = match self.usage.get_usage_count(user_id, today).await {
            Ok(used) => used,
            Err(e) => {
                warn!("Usage read failed for user {}, assuming none used: {}", user_id, e);
                0
            }
        };

        if used >= self.config.daily_limit {
            info!("User {} reached the daily limit ({})", user_id, used);
            return GateDecision::Halt;
        }

        let used = match self.usage.increment_usage(user_id, today).await {
            Ok(used) => used,
            Err(e) => {
                error!("Usage increment failed for user {}, halting: {}", user_id, e);
                return GateDecision::Halt;
            }
        };

        // A concurrent message may have slipped past the first read.
        if used > self.config.daily_limit {
            info!("User {} went over the daily limit ({})", user_id, used);
            return GateDecision::Halt;
        }

        GateDecision::Counted {
            used,
            remind: used == self.config.reminder_at,
        }
    }

    /// Free messages left today; `None` when unmetered.
    pub async fn remaining_today(&self, user_id: i64, now: DateTime<Utc>) -> Option<u32> {
        if self.entitlement.has_unrestricted_access(user_id, now).await {
            return None;
        }

        let used = self
            .usage
            .get_usage_count(user_id, now.date_naive())
            .await
            .unwrap_or_else(|e| {
                warn!("Usage read failed for user {}: {}", user_id, e);
                0
            });

        Some(self.config.daily_limit.saturating_sub(used))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::EntitlementConfig,
        service::profile::{format_timestamp, PromoCode, PromoType, UserProfile},
        storage::{MemoryProfileStore, MemoryPromoStore, MemoryUsageStore, StorageError},
    };
    use async_trait::async_trait;
    use chrono::{Duration, NaiveDate, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 15, 18, 0, 0).unwrap()
    }

    fn gate_with(usage: Arc<dyn UsageStore>, profiles: MemoryProfileStore, promos: MemoryPromoStore) -> UsageGate {
        let entitlement =
            EntitlementService::new(Arc::new(profiles), Arc::new(promos), &EntitlementConfig::default());
        UsageGate::new(entitlement, usage, GateConfig::default())
    }

    fn free_gate() -> (UsageGate, MemoryUsageStore) {
        let usage = MemoryUsageStore::default();
        let gate = gate_with(
            Arc::new(usage.clone()),
            MemoryProfileStore::default(),
            MemoryPromoStore::default(),
        );
        (gate, usage)
    }

    #[tokio::test]
    async fn test_fifteen_free_messages_then_halt() {
        let (gate, _) = free_gate();
        let mut reminders = 0;

        for n in 1..=15 {
            match gate.check(1, now()).await {
                GateDecision::Counted { used, remind } => {
                    assert_eq!(used, n);
                    if remind {
                        reminders += 1;
                        assert_eq!(n, 10);
                    }
                }
                other => panic!("message {} unexpectedly gated: {:?}", n, other),
            }
        }

        assert_eq!(reminders, 1);
        assert_eq!(gate.check(1, now()).await, GateDecision::Halt);
        assert_eq!(gate.check(1, now()).await, GateDecision::Halt);
    }

    #[tokio::test]
    async fn test_halt_does_not_increment() {
        let (gate, usage) = free_gate();
        for _ in 0..20 {
            gate.check(2, now()).await;
        }
        assert_eq!(usage.get_usage_count(2, now().date_naive()).await.unwrap(), 15);
    }

    #[tokio::test]
    async fn test_new_day_resets_quota() {
        let (gate, _) = free_gate();
        for _ in 0..15 {
            gate.check(3, now()).await;
        }
        assert_eq!(gate.check(3, now()).await, GateDecision::Halt);

        let tomorrow = now() + Duration::days(1);
        assert_eq!(
            gate.check(3, tomorrow).await,
            GateDecision::Counted { used: 1, remind: false }
        );
    }

    #[tokio::test]
    async fn test_premium_and_promo_bypass_meter() {
        let usage = MemoryUsageStore::default();
        let profiles = MemoryProfileStore::default();
        let promos = MemoryPromoStore::default();
        promos.insert(PromoCode {
            code: "FREE".into(),
            promo_type: PromoType::Permanent,
            days: None,
        });

        let mut premium = UserProfile::new(4);
        premium.premium_expires_at = Some(format_timestamp(now() + Duration::days(2)));
        profiles.insert(premium);

        let gate = gate_with(Arc::new(usage.clone()), profiles, promos.clone());
        gate.entitlement.activate_promo(5, "FREE", now()).await.unwrap();

        for _ in 0..30 {
            assert_eq!(gate.check(4, now()).await, GateDecision::Unlimited);
            assert_eq!(gate.check(5, now()).await, GateDecision::Unlimited);
        }
        assert_eq!(usage.get_usage_count(4, now().date_naive()).await.unwrap(), 0);
        assert_eq!(gate.remaining_today(4, now()).await, None);
    }

    #[tokio::test]
    async fn test_remaining_today() {
        let (gate, _) = free_gate();
        assert_eq!(gate.remaining_today(6, now()).await, Some(15));
        for _ in 0..4 {
            gate.check(6, now()).await;
        }
        assert_eq!(gate.remaining_today(6, now()).await, Some(11));
        assert_eq!(gate.remaining_at_reminder(), 5);
    }

    /// Reads fail, increments work, or the other way round.
    struct FlakyUsage {
        inner: MemoryUsageStore,
        fail_reads: bool,
        fail_increments: bool,
    }

    #[async_trait]
    impl UsageStore for FlakyUsage {
        async fn get_usage_count(&self, user_id: i64, date: NaiveDate) -> Result<u32, StorageError> {
            if self.fail_reads {
                return Err(StorageError::Redis("read timed out".into()));
            }
            self.inner.get_usage_count(user_id, date).await
        }

        async fn increment_usage(&self, user_id: i64, date: NaiveDate) -> Result<u32, StorageError> {
            if self.fail_increments {
                return Err(StorageError::Redis("write timed out".into()));
            }
            self.inner.increment_usage(user_id, date).await
        }

        async fn clear_usage(&self, user_id: i64) -> Result<(), StorageError> {
            self.inner.clear_usage(user_id).await
        }
    }

    #[tokio::test]
    async fn test_read_failure_fails_open_but_increment_still_guards() {
        let inner = MemoryUsageStore::default();
        for _ in 0..15 {
            inner.increment_usage(7, now().date_naive()).await.unwrap();
        }
        let usage = FlakyUsage {
            inner,
            fail_reads: true,
            fail_increments: false,
        };
        let gate = gate_with(
            Arc::new(usage),
            MemoryProfileStore::default(),
            MemoryPromoStore::default(),
        );

        assert_eq!(gate.check(8, now()).await, GateDecision::Counted { used: 1, remind: false });
        assert_eq!(gate.check(7, now()).await, GateDecision::Halt);
    }

    #[tokio::test]
    async fn test_increment_failure_fails_closed() {
        let usage = FlakyUsage {
            inner: MemoryUsageStore::default(),
            fail_reads: false,
            fail_increments: true,
        };
        let gate = gate_with(
            Arc::new(usage),
            MemoryProfileStore::default(),
            MemoryPromoStore::default(),
        );

        assert_eq!(gate.check(9, now()).await, GateDecision::Halt);
    }

    #[tokio::test]
    async fn test_concurrent_burst_never_exceeds_limit() {
        let (gate, _) = free_gate();

        let handles: Vec<_> = (0..40)
            .map(|_| {
                let gate = gate.clone();
                tokio::spawn(async move { gate.check(10, now()).await })
            })
            .collect();

        let mut allowed = 0;
        for handle in handles {
            if handle.await.unwrap().should_continue() {
                allowed += 1;
            }
        }

        assert_eq!(allowed, 15);
    }
}
