//! Second-factor configuration and the rolling local auth session.
//!
//! Both live in sqlite as single-row tables. The session is deliberately
//! local: it gates re-entry into the app on this device, not any server-side
//! credential.

use sha2::{Digest, Sha256};
use sqlx::SqlitePool;

use crate::error::AppError;

/// A successful unlock stays valid for 15 days of wall-clock time.
pub const DEFAULT_SESSION_TIMEOUT_MS: i64 = 15 * 24 * 60 * 60 * 1_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TwoFactorConfig {
    pub pin_enabled: bool,
    pub pin_digest: Option<String>,
    pub biometric_enabled: bool,
    pub biometric_credential_id: Option<String>,
    pub session_timeout_ms: i64,
}

impl Default for TwoFactorConfig {
    fn default() -> Self {
        Self {
            pin_enabled: false,
            pin_digest: None,
            biometric_enabled: false,
            biometric_credential_id: None,
            session_timeout_ms: DEFAULT_SESSION_TIMEOUT_MS,
        }
    }
}

impl TwoFactorConfig {
    /// Combined flag reported upstream whenever the config changes.
    pub fn two_factor_enabled(&self) -> bool {
        self.pin_enabled || self.biometric_enabled
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMethod {
    Pin,
    Biometric,
}

impl AuthMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pin => "pin",
            Self::Biometric => "biometric",
        }
    }

    pub fn parse_str(value: &str) -> Option<Self> {
        match value {
            "pin" => Some(Self::Pin),
            "biometric" => Some(Self::Biometric),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthSession {
    pub authenticated_at_ms: i64,
    pub method: AuthMethod,
}

fn hash_pin(pin: &str) -> String {
    hex::encode(Sha256::digest(pin.as_bytes()))
}

pub async fn load_config(pool: &SqlitePool) -> Result<TwoFactorConfig, AppError> {
    let row = sqlx::query_as::<_, (i64, Option<String>, i64, Option<String>, i64)>(
        "SELECT pin_enabled, pin_digest, biometric_enabled, biometric_credential_id, \
         session_timeout_ms FROM two_factor_config WHERE id = 1",
    )
    .fetch_optional(pool)
    .await?;

    Ok(match row {
        Some((pin_enabled, pin_digest, biometric_enabled, biometric_credential_id, timeout)) => {
            TwoFactorConfig {
                pin_enabled: pin_enabled != 0,
                pin_digest,
                biometric_enabled: biometric_enabled != 0,
                biometric_credential_id,
                session_timeout_ms: timeout,
            }
        }
        None => TwoFactorConfig::default(),
    })
}

/// Persists the config and returns the combined enabled flag so callers can
/// report it upstream.
pub async fn save_config(pool: &SqlitePool, config: &TwoFactorConfig) -> Result<bool, AppError> {
    sqlx::query(
        "INSERT INTO two_factor_config \
         (id, pin_enabled, pin_digest, biometric_enabled, biometric_credential_id, session_timeout_ms) \
         VALUES (1, ?1, ?2, ?3, ?4, ?5) \
         ON CONFLICT(id) DO UPDATE SET \
         pin_enabled = excluded.pin_enabled, \
         pin_digest = excluded.pin_digest, \
         biometric_enabled = excluded.biometric_enabled, \
         biometric_credential_id = excluded.biometric_credential_id, \
         session_timeout_ms = excluded.session_timeout_ms",
    )
    .bind(config.pin_enabled as i64)
    .bind(&config.pin_digest)
    .bind(config.biometric_enabled as i64)
    .bind(&config.biometric_credential_id)
    .bind(config.session_timeout_ms)
    .execute(pool)
    .await?;

    Ok(config.two_factor_enabled())
}

pub async fn setup_pin(pool: &SqlitePool, pin: &str) -> Result<bool, AppError> {
    let mut config = load_config(pool).await?;
    config.pin_enabled = true;
    config.pin_digest = Some(hash_pin(pin));
    save_config(pool, &config).await
}

pub async fn setup_biometric(pool: &SqlitePool, credential_id: &str) -> Result<bool, AppError> {
    let mut config = load_config(pool).await?;
    config.biometric_enabled = true;
    config.biometric_credential_id = Some(credential_id.to_string());
    save_config(pool, &config).await
}

async fn store_session(
    pool: &SqlitePool,
    method: AuthMethod,
    now_ms: i64,
) -> Result<(), AppError> {
    sqlx::query(
        "INSERT INTO auth_session (id, authenticated_at_ms, method) VALUES (1, ?1, ?2) \
         ON CONFLICT(id) DO UPDATE SET \
         authenticated_at_ms = excluded.authenticated_at_ms, \
         method = excluded.method",
    )
    .bind(now_ms)
    .bind(method.as_str())
    .execute(pool)
    .await?;
    Ok(())
}

/// Checks a PIN against the stored digest. A match opens a fresh session
/// stamped at `now_ms`; with no PIN configured every attempt fails.
pub async fn verify_pin(pool: &SqlitePool, pin: &str, now_ms: i64) -> Result<bool, AppError> {
    let config = load_config(pool).await?;
    let Some(stored_digest) = config.pin_digest else {
        return Ok(false);
    };

    if hash_pin(pin) != stored_digest {
        return Ok(false);
    }

    store_session(pool, AuthMethod::Pin, now_ms).await?;
    Ok(true)
}

/// The platform biometric prompt already succeeded; just open the session.
pub async fn mark_biometric_authenticated(
    pool: &SqlitePool,
    now_ms: i64,
) -> Result<(), AppError> {
    store_session(pool, AuthMethod::Biometric, now_ms).await
}

pub async fn load_session(pool: &SqlitePool) -> Result<Option<AuthSession>, AppError> {
    let row = sqlx::query_as::<_, (i64, String)>(
        "SELECT authenticated_at_ms, method FROM auth_session WHERE id = 1",
    )
    .fetch_optional(pool)
    .await?;

    Ok(row.and_then(|(authenticated_at_ms, method)| {
        AuthMethod::parse_str(&method).map(|method| AuthSession {
            authenticated_at_ms,
            method,
        })
    }))
}

/// Whether the stored session is still within its timeout at `now_ms`.
/// An expired or unreadable session is cleared as a side effect, so the next
/// check starts from a clean slate.
pub async fn is_auth_valid_at(pool: &SqlitePool, now_ms: i64) -> Result<bool, AppError> {
    let config = load_config(pool).await?;
    let Some(session) = load_session(pool).await? else {
        return Ok(false);
    };

    let timeout = if config.session_timeout_ms > 0 {
        config.session_timeout_ms
    } else {
        DEFAULT_SESSION_TIMEOUT_MS
    };

    if now_ms.saturating_sub(session.authenticated_at_ms) > timeout {
        clear_auth(pool).await?;
        return Ok(false);
    }

    Ok(true)
}

pub async fn clear_auth(pool: &SqlitePool) -> Result<(), AppError> {
    sqlx::query("DELETE FROM auth_session WHERE id = 1")
        .execute(pool)
        .await?;
    Ok(())
}

/// Wipes both the second-factor config and any open session.
pub async fn reset_two_factor(pool: &SqlitePool) -> Result<(), AppError> {
    sqlx::query("DELETE FROM two_factor_config WHERE id = 1")
        .execute(pool)
        .await?;
    clear_auth(pool).await
}
