use std::{fmt, str::FromStr};

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    English,
    Russian,
    Spanish,
    German,
    French,
    Italian,
}

impl Language {
    /// Languages with a translated interface.
    pub const INTERFACE: [Language; 2] = [Language::Russian, Language::English];

    /// Languages the bot can hold a conversation in.
    pub const TARGETS: [Language; 5] = [
        Language::English,
        Language::Spanish,
        Language::German,
        Language::French,
        Language::Italian,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            Language::English => "en",
            Language::Russian => "ru",
            Language::Spanish => "es",
            Language::German => "de",
            Language::French => "fr",
            Language::Italian => "it",
        }
    }

    /// English name, used in model prompts.
    pub fn name(&self) -> &'static str {
        match self {
            Language::English => "English",
            Language::Russian => "Russian",
            Language::Spanish => "Spanish",
            Language::German => "German",
            Language::French => "French",
            Language::Italian => "Italian",
        }
    }

    /// Unknown codes fall back to English.
    pub fn parse_or_default(s: &str) -> Self {
        Language::from_str(s).unwrap_or(Language::English)
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "en" | "english" => Ok(Language::English),
            "ru" | "russian" => Ok(Language::Russian),
            "es" | "spanish" => Ok(Language::Spanish),
            "de" | "german" => Ok(Language::German),
            "fr" | "french" => Ok(Language::French),
            "it" | "italian" => Ok(Language::Italian),
            _ => Err(format!("Unknown language code: {}", s)),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    A0,
    A1,
    A2,
    B1,
    B2,
    C1,
    C2,
}

impl Level {
    pub const ALL: [Level; 7] = [Level::A0, Level::A1, Level::A2, Level::B1, Level::B2, Level::C1, Level::C2];

    /// A0 to A2 draw from the easy question pool.
    pub fn is_beginner(&self) -> bool {
        *self <= Level::A2
    }

    pub fn parse_or_default(s: &str) -> Self {
        Level::from_str(s).unwrap_or(Level::A2)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::A0 => "A0",
            Level::A1 => "A1",
            Level::A2 => "A2",
            Level::B1 => "B1",
            Level::B2 => "B2",
            Level::C1 => "C1",
            Level::C2 => "C2",
        }
    }
}

impl FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "A0" => Ok(Level::A0),
            "A1" => Ok(Level::A1),
            "A2" => Ok(Level::A2),
            "B1" => Ok(Level::B1),
            "B2" => Ok(Level::B2),
            "C1" => Ok(Level::C1),
            "C2" => Ok(Level::C2),
            _ => Err(format!("Unknown level: {}", s)),
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Style {
    Casual,
    Business,
}

impl Style {
    pub fn parse_or_default(s: &str) -> Self {
        Style::from_str(s).unwrap_or(Style::Casual)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Style::Casual => "casual",
            Style::Business => "business",
        }
    }
}

impl FromStr for Style {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "casual" => Ok(Style::Casual),
            "business" => Ok(Style::Business),
            _ => Err(format!("Unknown style: {}", s)),
        }
    }
}

impl fmt::Display for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PromoType {
    Permanent,
    Timed,
    EnglishOnly,
}

impl PromoType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PromoType::Permanent => "permanent",
            PromoType::Timed => "timed",
            PromoType::EnglishOnly => "english_only",
        }
    }
}

impl FromStr for PromoType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "permanent" => Ok(PromoType::Permanent),
            "timed" => Ok(PromoType::Timed),
            "english_only" => Ok(PromoType::EnglishOnly),
            _ => Err(format!("Unknown promo type: {}", s)),
        }
    }
}

impl fmt::Display for PromoType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Durable per-user record.
///
/// Timestamps are kept as they were persisted and parsed on demand, so a
/// malformed value reads as "no access" instead of failing the whole record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: i64,
    pub interface_lang: Option<Language>,
    pub target_lang: Option<Language>,
    pub level: Option<Level>,
    pub style: Option<Style>,
    pub promo_code_used: Option<String>,
    pub promo_type: Option<PromoType>,
    pub promo_activated_at: Option<String>,
    pub promo_days: Option<i64>,
    pub is_premium: bool,
    pub premium_expires_at: Option<String>,
}

impl UserProfile {
    pub fn new(user_id: i64) -> Self {
        Self {
            user_id,
            ..Default::default()
        }
    }

    pub fn promo_activated_at(&self) -> Option<DateTime<Utc>> {
        self.promo_activated_at.as_deref().and_then(parse_timestamp)
    }

    pub fn premium_expires_at(&self) -> Option<DateTime<Utc>> {
        self.premium_expires_at.as_deref().and_then(parse_timestamp)
    }

    /// All onboarding choices have been stored.
    pub fn is_onboarded(&self) -> bool {
        self.interface_lang.is_some() && self.target_lang.is_some() && self.level.is_some() && self.style.is_some()
    }

    pub fn apply(&mut self, update: &ProfileUpdate) {
        if let Some(lang) = update.interface_lang {
            self.interface_lang = Some(lang);
        }
        if let Some(lang) = update.target_lang {
            self.target_lang = Some(lang);
        }
        if let Some(level) = update.level {
            self.level = Some(level);
        }
        if let Some(style) = update.style {
            self.style = Some(style);
        }
        if let Some(is_premium) = update.is_premium {
            self.is_premium = is_premium;
        }
        if let Some(expires_at) = update.premium_expires_at {
            self.premium_expires_at = Some(format_timestamp(expires_at));
        }
    }
}

/// Partial profile write. `None` leaves the stored field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileUpdate {
    pub interface_lang: Option<Language>,
    pub target_lang: Option<Language>,
    pub level: Option<Level>,
    pub style: Option<Style>,
    pub is_premium: Option<bool>,
    pub premium_expires_at: Option<DateTime<Utc>>,
}

impl ProfileUpdate {
    pub fn interface_lang(lang: Language) -> Self {
        Self {
            interface_lang: Some(lang),
            ..Default::default()
        }
    }

    pub fn target_lang(lang: Language) -> Self {
        Self {
            target_lang: Some(lang),
            ..Default::default()
        }
    }

    pub fn level(level: Level) -> Self {
        Self {
            level: Some(level),
            ..Default::default()
        }
    }

    pub fn style(style: Style) -> Self {
        Self {
            style: Some(style),
            ..Default::default()
        }
    }

    pub fn premium(expires_at: DateTime<Utc>) -> Self {
        Self {
            is_premium: Some(true),
            premium_expires_at: Some(expires_at),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// A redeemable code as stored in the promo table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromoCode {
    pub code: String,
    pub promo_type: PromoType,
    pub days: Option<i64>,
}

/// Fields written in one step when a promo code is redeemed.
#[derive(Debug, Clone, PartialEq)]
pub struct PromoActivation {
    pub code: String,
    pub promo_type: PromoType,
    pub activated_at: DateTime<Utc>,
    pub days: Option<i64>,
}

/// Accepts RFC 3339 and naive `YYYY-MM-DD HH:MM:SS[.f]` / `YYYY-MM-DDTHH:MM:SS[.f]`.
/// Naive values are read as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

pub fn format_timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339()
}
