use async_trait::async_trait;
use chrono::NaiveDate;
use libsql::{params, Builder, Connection, Database, Row, Value};
use std::{str::FromStr, sync::Arc};

use crate::service::profile::{
    format_timestamp, ProfileUpdate, PromoActivation, PromoCode, PromoType, UserProfile,
};

use super::{ProfileStore, PromoStore, StorageError, UsageStore};

const SCHEMA: [&str; 3] = [
    "CREATE TABLE IF NOT EXISTS user_profiles (
        user_id INTEGER PRIMARY KEY,
        interface_lang TEXT,
        target_lang TEXT,
        level TEXT,
        style TEXT,
        promo_code_used TEXT,
        promo_type TEXT,
        promo_activated_at TEXT,
        promo_days INTEGER,
        is_premium INTEGER NOT NULL DEFAULT 0,
        premium_expires_at TEXT
    )",
    "CREATE TABLE IF NOT EXISTS promo_codes (
        code TEXT PRIMARY KEY,
        promo_type TEXT NOT NULL,
        days INTEGER
    )",
    "CREATE TABLE IF NOT EXISTS usage_counters (
        user_id INTEGER NOT NULL,
        day TEXT NOT NULL,
        used_count INTEGER NOT NULL DEFAULT 0,
        PRIMARY KEY (user_id, day)
    )",
];

const PROFILE_COLUMNS: &str = "user_id, interface_lang, target_lang, level, style, promo_code_used, promo_type, \
     promo_activated_at, promo_days, is_premium, premium_expires_at";

#[derive(Clone)]
pub struct TursoClient {
    inner: Arc<Database>,
}

impl TursoClient {
    pub async fn new(url: &str, token: &str) -> Result<Self, StorageError> {
        info!("Initializing TursoClient...");
        let db = Builder::new_remote(url.to_string(), token.to_string())
            .build()
            .await
            .map_err(StorageError::Turso)?;

        info!("TursoClient initialized");
        Ok(Self { inner: Arc::new(db) })
    }

    pub async fn get_connection(&self) -> Result<Connection, StorageError> {
        let conn = self.inner.connect().map_err(StorageError::Turso)?;
        Ok(conn)
    }

    pub async fn migrate(&self) -> Result<(), StorageError> {
        let conn = self.get_connection().await?;
        for statement in SCHEMA {
            conn.execute(statement, ()).await?;
        }
        info!("Turso schema ready");
        Ok(())
    }
}

fn read_text(row: &Row, idx: i32) -> Result<Option<String>, StorageError> {
    match row.get_value(idx)? {
        Value::Null => Ok(None),
        Value::Text(s) => Ok(Some(s)),
        Value::Integer(i) => Ok(Some(i.to_string())),
        Value::Real(f) => Ok(Some(f.to_string())),
        Value::Blob(_) => Err(StorageError::Malformed(format!("unexpected blob in column {}", idx))),
    }
}

fn read_int(row: &Row, idx: i32) -> Result<Option<i64>, StorageError> {
    match row.get_value(idx)? {
        Value::Null => Ok(None),
        Value::Integer(i) => Ok(Some(i)),
        Value::Text(s) => Ok(s.trim().parse().ok()),
        Value::Real(f) => Ok(Some(f as i64)),
        Value::Blob(_) => Err(StorageError::Malformed(format!("unexpected blob in column {}", idx))),
    }
}

/// Unknown enum values are dropped rather than failing the read.
fn read_enum<T: FromStr>(row: &Row, idx: i32) -> Result<Option<T>, StorageError> {
    Ok(read_text(row, idx)?.and_then(|raw| match raw.parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Ignoring unrecognized value {:?} in column {}", raw, idx);
            None
        }
    }))
}

fn profile_from_row(row: &Row) -> Result<UserProfile, StorageError> {
    Ok(UserProfile {
        user_id: read_int(row, 0)?.ok_or_else(|| StorageError::Malformed("missing user_id".into()))?,
        interface_lang: read_enum(row, 1)?,
        target_lang: read_enum(row, 2)?,
        level: read_enum(row, 3)?,
        style: read_enum(row, 4)?,
        promo_code_used: read_text(row, 5)?,
        promo_type: read_enum(row, 6)?,
        promo_activated_at: read_text(row, 7)?,
        promo_days: read_int(row, 8)?,
        is_premium: read_int(row, 9)?.unwrap_or(0) != 0,
        premium_expires_at: read_text(row, 10)?,
    })
}

/// Column/value pairs for the fields set in `update`.
fn update_columns(update: &ProfileUpdate) -> Vec<(&'static str, Value)> {
    let mut columns = Vec::new();
    if let Some(lang) = update.interface_lang {
        columns.push(("interface_lang", Value::Text(lang.code().to_string())));
    }
    if let Some(lang) = update.target_lang {
        columns.push(("target_lang", Value::Text(lang.code().to_string())));
    }
    if let Some(level) = update.level {
        columns.push(("level", Value::Text(level.to_string())));
    }
    if let Some(style) = update.style {
        columns.push(("style", Value::Text(style.to_string())));
    }
    if let Some(is_premium) = update.is_premium {
        columns.push(("is_premium", Value::Integer(is_premium as i64)));
    }
    if let Some(expires_at) = update.premium_expires_at {
        columns.push(("premium_expires_at", Value::Text(format_timestamp(expires_at))));
    }
    columns
}

#[async_trait]
impl ProfileStore for TursoClient {
    async fn get_profile(&self, user_id: i64) -> Result<Option<UserProfile>, StorageError> {
        let conn = self.get_connection().await?;
        let mut rows = conn
            .query(
                &format!("SELECT {} FROM user_profiles WHERE user_id = ?1 LIMIT 1", PROFILE_COLUMNS),
                params![user_id],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(profile_from_row(&row)?)),
            None => Ok(None),
        }
    }

    async fn save_profile(&self, user_id: i64, update: &ProfileUpdate) -> Result<(), StorageError> {
        let conn = self.get_connection().await?;
        let columns = update_columns(update);

        if columns.is_empty() {
            conn.execute(
                "INSERT OR IGNORE INTO user_profiles (user_id) VALUES (?1)",
                params![user_id],
            )
            .await?;
            return Ok(());
        }

        let names: Vec<&str> = columns.iter().map(|(name, _)| *name).collect();
        let placeholders: Vec<String> = (0..columns.len()).map(|i| format!("?{}", i + 2)).collect();
        let assignments: Vec<String> = names.iter().map(|name| format!("{0} = excluded.{0}", name)).collect();

        let query = format!(
            "INSERT INTO user_profiles (user_id, {}) VALUES (?1, {}) ON CONFLICT(user_id) DO UPDATE SET {}",
            names.join(", "),
            placeholders.join(", "),
            assignments.join(", ")
        );

        let mut values = vec![Value::Integer(user_id)];
        values.extend(columns.into_iter().map(|(_, value)| value));

        conn.execute(&query, values).await?;
        Ok(())
    }

    async fn activate_promo(&self, user_id: i64, activation: &PromoActivation) -> Result<bool, StorageError> {
        let conn = self.get_connection().await?;
        conn.execute(
            "INSERT OR IGNORE INTO user_profiles (user_id) VALUES (?1)",
            params![user_id],
        )
        .await?;

        let values = vec![
            Value::Text(activation.code.clone()),
            Value::Text(activation.promo_type.to_string()),
            Value::Text(format_timestamp(activation.activated_at)),
            activation.days.map(Value::Integer).unwrap_or(Value::Null),
            Value::Integer(user_id),
        ];

        let affected = conn
            .execute(
                "UPDATE user_profiles
                 SET promo_code_used = ?1, promo_type = ?2, promo_activated_at = ?3, promo_days = ?4
                 WHERE user_id = ?5 AND promo_code_used IS NULL",
                values,
            )
            .await?;

        Ok(affected == 1)
    }

    async fn delete_profile(&self, user_id: i64) -> Result<(), StorageError> {
        let conn = self.get_connection().await?;
        let tx = conn.transaction().await?;
        tx.execute("DELETE FROM usage_counters WHERE user_id = ?1", params![user_id])
            .await?;
        tx.execute("DELETE FROM user_profiles WHERE user_id = ?1", params![user_id])
            .await?;
        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl PromoStore for TursoClient {
    async fn get_promo(&self, code: &str) -> Result<Option<PromoCode>, StorageError> {
        let conn = self.get_connection().await?;
        let mut rows = conn
            .query(
                "SELECT code, promo_type, days FROM promo_codes WHERE code = ?1 LIMIT 1",
                params![code],
            )
            .await?;

        let Some(row) = rows.next().await? else {
            return Ok(None);
        };

        let raw_type = read_text(&row, 1)?.unwrap_or_default();
        let promo_type = match PromoType::from_str(&raw_type) {
            Ok(promo_type) => promo_type,
            Err(e) => {
                warn!("Promo code {} has an unusable type: {}", code, e);
                return Ok(None);
            }
        };

        Ok(Some(PromoCode {
            code: read_text(&row, 0)?.unwrap_or_else(|| code.to_string()),
            promo_type,
            days: read_int(&row, 2)?,
        }))
    }
}

#[async_trait]
impl UsageStore for TursoClient {
    async fn get_usage_count(&self, user_id: i64, date: NaiveDate) -> Result<u32, StorageError> {
        let conn = self.get_connection().await?;
        let mut rows = conn
            .query(
                "SELECT used_count FROM usage_counters WHERE user_id = ?1 AND day = ?2",
                params![user_id, date.to_string()],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(read_int(&row, 0)?.unwrap_or(0).max(0) as u32),
            None => Ok(0),
        }
    }

    async fn increment_usage(&self, user_id: i64, date: NaiveDate) -> Result<u32, StorageError> {
        let conn = self.get_connection().await?;
        let mut rows = conn
            .query(
                "INSERT INTO usage_counters (user_id, day, used_count) VALUES (?1, ?2, 1)
                 ON CONFLICT(user_id, day) DO UPDATE SET used_count = used_count + 1
                 RETURNING used_count",
                params![user_id, date.to_string()],
            )
            .await?;

        let row = rows
            .next()
            .await?
            .ok_or_else(|| StorageError::Malformed("increment returned no row".into()))?;

        Ok(read_int(&row, 0)?.unwrap_or(0).max(0) as u32)
    }

    async fn clear_usage(&self, user_id: i64) -> Result<(), StorageError> {
        let conn = self.get_connection().await?;
        conn.execute("DELETE FROM usage_counters WHERE user_id = ?1", params![user_id])
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::profile::{Language, Level};

    #[test]
    fn test_update_columns_only_set_fields() {
        let update = ProfileUpdate {
            target_lang: Some(Language::Spanish),
            level: Some(Level::C1),
            ..Default::default()
        };
        let names: Vec<_> = update_columns(&update).into_iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["target_lang", "level"]);

        assert!(update_columns(&ProfileUpdate::default()).is_empty());
    }
}
