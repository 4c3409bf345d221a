use shuttle_runtime::SecretStore;
use std::{str::FromStr, time::Duration};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing secret: {0}")]
    MissingKey(String),
    #[error("Invalid value for {0}")]
    InvalidValue(String),
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub telegram: TelegramConfig,
    pub storage: StorageConfig,
    pub llm: LlmConfig,
    pub retry: RetryConfig,
    pub gate: GateConfig,
    pub entitlement: EntitlementConfig,
    pub session: SessionConfig,
}

#[derive(Clone, Debug)]
pub struct TelegramConfig(pub String);

#[derive(Clone, Debug)]
pub struct StorageConfig {
    pub turso_url: String,
    pub turso_token: String,
    /// Usage counters go to Redis when set, otherwise to Turso.
    pub redis_url: Option<String>,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub api_key: String,
    pub base_url: String,
    pub chat_model: String,
    pub tts_model: String,
    pub tts_voice: String,
    pub stt_model: String,
}

#[derive(Clone, Debug)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_millis(1500),
        }
    }
}

#[derive(Clone, Debug)]
pub struct GateConfig {
    pub daily_limit: u32,
    /// Post-increment count that triggers the "messages remaining" reminder.
    pub reminder_at: u32,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            daily_limit: 15,
            reminder_at: 10,
        }
    }
}

#[derive(Clone, Debug)]
pub struct EntitlementConfig {
    pub subscription_days: i64,
}

impl Default for EntitlementConfig {
    fn default() -> Self {
        Self { subscription_days: 30 }
    }
}

#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub history_capacity: usize,
    /// Slots preallocated for the session store; it grows past this as needed.
    pub cache_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            history_capacity: 40,
            cache_capacity: 1_000,
        }
    }
}

fn required(store: &SecretStore, key: &str) -> Result<String, ConfigError> {
    store.get(key).ok_or_else(|| ConfigError::MissingKey(key.to_string()))
}

fn optional(store: &SecretStore, key: &str) -> Option<String> {
    store.get(key).filter(|value| !value.trim().is_empty())
}

fn parsed_or<T: FromStr>(store: &SecretStore, key: &str, default: T) -> Result<T, ConfigError> {
    match optional(store, key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        None => Ok(default),
    }
}

pub fn build_config(secret_store: &SecretStore) -> Result<AppConfig, ConfigError> {
    info!("Building AppConfig...");

    let retry_defaults = RetryConfig::default();
    let gate_defaults = GateConfig::default();
    let session_defaults = SessionConfig::default();

    let config = AppConfig {
        telegram: TelegramConfig(required(secret_store, "TELEGRAM_BOT_TOKEN")?),
        storage: StorageConfig {
            turso_url: required(secret_store, "TURSO_URL")?,
            turso_token: required(secret_store, "TURSO_TOKEN")?,
            redis_url: optional(secret_store, "REDIS_URL"),
        },
        llm: LlmConfig {
            api_key: required(secret_store, "OPENAI_API_KEY")?,
            base_url: optional(secret_store, "OPENAI_BASE_URL").unwrap_or_else(|| "https://api.openai.com/v1".into()),
            chat_model: optional(secret_store, "LLM_MODEL").unwrap_or_else(|| "gpt-4o-mini".into()),
            tts_model: optional(secret_store, "TTS_MODEL").unwrap_or_else(|| "tts-1".into()),
            tts_voice: optional(secret_store, "TTS_VOICE").unwrap_or_else(|| "alloy".into()),
            stt_model: optional(secret_store, "STT_MODEL").unwrap_or_else(|| "whisper-1".into()),
        },
        retry: RetryConfig {
            max_attempts: parsed_or(secret_store, "RETRY_MAX_ATTEMPTS", retry_defaults.max_attempts)?,
            backoff: Duration::from_millis(parsed_or(
                secret_store,
                "RETRY_BACKOFF_MS",
                retry_defaults.backoff.as_millis() as u64,
            )?),
        },
        gate: GateConfig {
            daily_limit: parsed_or(secret_store, "FREE_DAILY_LIMIT", gate_defaults.daily_limit)?,
            reminder_at: parsed_or(secret_store, "FREE_REMINDER_AT", gate_defaults.reminder_at)?,
        },
        entitlement: EntitlementConfig {
            subscription_days: parsed_or(
                secret_store,
                "SUBSCRIPTION_DAYS",
                EntitlementConfig::default().subscription_days,
            )?,
        },
        session: SessionConfig {
            history_capacity: parsed_or(secret_store, "HISTORY_CAPACITY", session_defaults.history_capacity)?,
            cache_capacity: parsed_or(secret_store, "SESSION_CACHE_CAPACITY", session_defaults.cache_capacity)?,
        },
    };

    if config.gate.reminder_at >= config.gate.daily_limit {
        return Err(ConfigError::InvalidValue("FREE_REMINDER_AT".to_string()));
    }

    info!("AppConfig built");

    Ok(config)
}
