use chrono::{DateTime, Utc};

use crate::service::profile::PromoType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromoOutcome {
    Activated(PromoType),
    Invalid,
    AlreadyUsed,
}

/// Snapshot for the `/status` view.
#[derive(Debug, Clone, PartialEq)]
pub struct EntitlementStatus {
    pub premium_until: Option<DateTime<Utc>>,
    pub promo: Option<PromoStatus>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PromoStatus {
    pub promo_type: PromoType,
    pub valid: bool,
    pub valid_until: Option<DateTime<Utc>>,
}
