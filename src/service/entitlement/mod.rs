mod model;

pub use model::*;

use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use std::sync::{Arc, LazyLock};

use crate::{
    config::EntitlementConfig,
    service::{
        profile::{ProfileUpdate, PromoActivation, PromoType, UserProfile},
        ServiceError,
    },
    storage::{ProfileStore, PromoStore},
};

static PROMO_CODE_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_\-]{3,32}$").unwrap());

/// Decides who may skip the free-tier meter, and books promo and premium grants.
#[derive(Clone)]
pub struct EntitlementService {
    profiles: Arc<dyn ProfileStore>,
    promos: Arc<dyn PromoStore>,
    subscription_period: Duration,
}

impl EntitlementService {
    pub fn new(profiles: Arc<dyn ProfileStore>, promos: Arc<dyn PromoStore>, config: &EntitlementConfig) -> Self {
        Self {
            profiles,
            promos,
            subscription_period: Duration::try_days(config.subscription_days).unwrap_or_else(|| {
                warn!(
                    "Subscription period of {} days is out of range, using the default",
                    config.subscription_days
                );
                Duration::days(EntitlementConfig::default().subscription_days)
            }),
        }
    }

    /// Premium holds only while the stored expiry parses and lies strictly in the future.
    pub fn is_premium_valid(profile: &UserProfile, now: DateTime<Utc>) -> bool {
        profile.premium_expires_at().is_some_and(|expires_at| expires_at > now)
    }

    pub fn promo_valid_until(profile: &UserProfile) -> Option<DateTime<Utc>> {
        let activated_at = profile.promo_activated_at()?;
        let days = profile.promo_days?;
        activated_at.checked_add_signed(Duration::try_days(days)?)
    }

    pub fn is_promo_valid(profile: &UserProfile, now: DateTime<Utc>) -> bool {
        if profile.promo_code_used.is_none() {
            return false;
        }

        match profile.promo_type {
            Some(PromoType::Permanent) => true,
            Some(PromoType::Timed) => Self::promo_valid_until(profile).is_some_and(|until| now < until),
            Some(PromoType::EnglishOnly) => match profile.promo_days {
                Some(_) => Self::promo_valid_until(profile).is_some_and(|until| now < until),
                None => true,
            },
            None => false,
        }
    }

    pub fn has_unrestricted(profile: &UserProfile, now: DateTime<Utc>) -> bool {
        Self::is_premium_valid(profile, now) || Self::is_promo_valid(profile, now)
    }

    /// English is the only selectable target while an English-only promo holds.
    pub fn is_english_only(profile: &UserProfile, now: DateTime<Utc>) -> bool {
        profile.promo_type == Some(PromoType::EnglishOnly)
            && Self::is_promo_valid(profile, now)
            && !Self::is_premium_valid(profile, now)
    }

    /// Extends from the later of `now` and any unexpired paid time.
    pub fn compute_premium_expiry(&self, current: Option<DateTime<Utc>>, now: DateTime<Utc>) -> DateTime<Utc> {
        let base = current.filter(|expires_at| *expires_at > now).unwrap_or(now);
        base.checked_add_signed(self.subscription_period)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Storage failures read as "no access".
    pub async fn has_unrestricted_access(&self, user_id: i64, now: DateTime<Utc>) -> bool {
        match self.profiles.get_profile(user_id).await {
            Ok(Some(profile)) => Self::has_unrestricted(&profile, now),
            Ok(None) => false,
            Err(e) => {
                warn!("Entitlement lookup failed for user {}: {}", user_id, e);
                false
            }
        }
    }

    pub async fn english_only(&self, user_id: i64, now: DateTime<Utc>) -> bool {
        match self.profiles.get_profile(user_id).await {
            Ok(Some(profile)) => Self::is_english_only(&profile, now),
            Ok(None) => false,
            Err(e) => {
                warn!("English-only lookup failed for user {}: {}", user_id, e);
                false
            }
        }
    }

    /// A profile redeems at most one code; the same code may be redeemed by
    /// any number of profiles.
    pub async fn activate_promo(
        &self,
        user_id: i64,
        raw_code: &str,
        now: DateTime<Utc>,
    ) -> Result<PromoOutcome, ServiceError> {
        let code = raw_code.trim();

        let profile = self.profiles.get_profile(user_id).await?;
        if profile.as_ref().is_some_and(|p| p.promo_code_used.is_some()) {
            info!("User {} tried a second promo code", user_id);
            return Ok(PromoOutcome::AlreadyUsed);
        }

        if !PROMO_CODE_REGEX.is_match(code) {
            return Ok(PromoOutcome::Invalid);
        }

        let Some(promo) = self.promos.get_promo(code).await? else {
            info!("User {} sent unknown promo code", user_id);
            return Ok(PromoOutcome::Invalid);
        };

        let activation = PromoActivation {
            code: promo.code.clone(),
            promo_type: promo.promo_type,
            activated_at: now,
            days: promo.days,
        };

        if self.profiles.activate_promo(user_id, &activation).await? {
            info!("User {} activated {} promo {}", user_id, promo.promo_type, promo.code);
            Ok(PromoOutcome::Activated(promo.promo_type))
        } else {
            Ok(PromoOutcome::AlreadyUsed)
        }
    }

    /// Books one paid period and returns the new expiry.
    pub async fn extend_premium(&self, user_id: i64, now: DateTime<Utc>) -> Result<DateTime<Utc>, ServiceError> {
        let current = self
            .profiles
            .get_profile(user_id)
            .await?
            .and_then(|profile| profile.premium_expires_at());

        let expires_at = self.compute_premium_expiry(current, now);
        self.profiles
            .save_profile(user_id, &ProfileUpdate::premium(expires_at))
            .await?;

        info!("User {} premium extended until {}", user_id, expires_at);
        Ok(expires_at)
    }

    pub async fn status(&self, user_id: i64, now: DateTime<Utc>) -> Result<EntitlementStatus, ServiceError> {
        let profile = self.profiles.get_profile(user_id).await?.unwrap_or_else(|| UserProfile::new(user_id));

        let premium_until = profile
            .premium_expires_at()
            .filter(|_| Self::is_premium_valid(&profile, now));

        let promo = match (&profile.promo_code_used, profile.promo_type) {
            (Some(_), Some(promo_type)) => Some(PromoStatus {
                promo_type,
                valid: Self::is_promo_valid(&profile, now),
                valid_until: Self::promo_valid_until(&profile),
            }),
            _ => None,
        };

        Ok(EntitlementStatus { premium_until, promo })
    }
}
