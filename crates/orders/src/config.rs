//! Order core configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `ORDERS_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//!
//! ## Optional
//! - `ORDERS_DB_MAX_CONNECTIONS` - Pool size (default: 10)
//! - `ORDERS_LOCK_TIMEOUT_MS` - Bound on row-lock waits before `Busy` (default: 5000)
//! - `ORDERS_LOW_STOCK_THRESHOLD` - Warn when stock drops below this (default: 5)
//! - `ORDERS_NOTIFY_TIMEOUT_MS` - Bound on one notification attempt (default: 10000)
//!
//! ## Optional (SMTP - enables e-mail notifications, all or none)
//! - `SMTP_HOST` - SMTP server hostname
//! - `SMTP_USERNAME` - SMTP authentication username
//! - `SMTP_PASSWORD` - SMTP authentication password
//! - `SMTP_FROM` - Email sender address
//! - `SMTP_PORT` - SMTP port (default: 587)

use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;

const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_LOCK_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_LOW_STOCK_THRESHOLD: i32 = 5;
const DEFAULT_NOTIFY_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_SMTP_PORT: u16 = 587;

const SMTP_VARS: [&str; 4] = ["SMTP_HOST", "SMTP_USERNAME", "SMTP_PASSWORD", "SMTP_FROM"];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Full configuration for processes that talk to `PostgreSQL`.
#[derive(Debug, Clone)]
pub struct OrdersConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// Maximum pool connections
    pub max_connections: u32,
    /// Runtime knobs for the order services
    pub settings: ServiceSettings,
    /// SMTP settings; `None` means notices are only logged
    pub email: Option<EmailConfig>,
}

/// Non-secret runtime settings for the order services.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceSettings {
    /// Bound on waiting for a row lock. Exceeding it aborts the transaction
    /// with a retryable `Busy` error.
    pub lock_timeout: Duration,
    /// A reservation leaving less stock than this logs a warning.
    pub low_stock_threshold: i32,
    /// Bound on a single notification attempt.
    pub notify_timeout: Duration,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            lock_timeout: Duration::from_millis(DEFAULT_LOCK_TIMEOUT_MS),
            low_stock_threshold: DEFAULT_LOW_STOCK_THRESHOLD,
            notify_timeout: Duration::from_millis(DEFAULT_NOTIFY_TIMEOUT_MS),
        }
    }
}

/// Email (SMTP) configuration.
///
/// Implements `Debug` manually to redact the password.
#[derive(Clone)]
pub struct EmailConfig {
    /// SMTP server hostname
    pub smtp_host: String,
    /// SMTP server port
    pub smtp_port: u16,
    /// SMTP authentication username
    pub smtp_username: String,
    /// SMTP authentication password
    pub smtp_password: SecretString,
    /// Email sender address (From header)
    pub from_address: String,
}

impl std::fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailConfig")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_username", &self.smtp_username)
            .field("smtp_password", &"[REDACTED]")
            .field("from_address", &self.from_address)
            .finish()
    }
}

impl EmailConfig {
    fn from_lookup(env: &impl Fn(&str) -> Option<String>) -> Result<Option<Self>, ConfigError> {
        let present: Vec<_> = SMTP_VARS.iter().map(|key| env(*key)).collect();

        match present.as_slice() {
            [Some(host), Some(username), Some(password), Some(from)] => Ok(Some(Self {
                smtp_host: host.clone(),
                smtp_port: parse_or_default(env, "SMTP_PORT", DEFAULT_SMTP_PORT)?,
                smtp_username: username.clone(),
                smtp_password: SecretString::from(password.clone()),
                from_address: from.clone(),
            })),
            values if values.iter().all(Option::is_none) => Ok(None),
            _ => Err(ConfigError::InvalidEnvVar(
                "SMTP_*".to_string(),
                "SMTP_HOST, SMTP_USERNAME, SMTP_PASSWORD and SMTP_FROM must be set together"
                    .to_string(),
            )),
        }
    }
}

impl ServiceSettings {
    fn from_lookup(env: &impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let lock_timeout_ms =
            parse_or_default(env, "ORDERS_LOCK_TIMEOUT_MS", DEFAULT_LOCK_TIMEOUT_MS)?;
        let notify_timeout_ms =
            parse_or_default(env, "ORDERS_NOTIFY_TIMEOUT_MS", DEFAULT_NOTIFY_TIMEOUT_MS)?;
        let low_stock_threshold = parse_or_default(
            env,
            "ORDERS_LOW_STOCK_THRESHOLD",
            DEFAULT_LOW_STOCK_THRESHOLD,
        )?;

        if lock_timeout_ms == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "ORDERS_LOCK_TIMEOUT_MS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            lock_timeout: Duration::from_millis(lock_timeout_ms),
            low_stock_threshold,
            notify_timeout: Duration::from_millis(notify_timeout_ms),
        })
    }
}

impl OrdersConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_lookup(env: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database_url = env("ORDERS_DATABASE_URL")
            .or_else(|| env("DATABASE_URL"))
            .map(SecretString::from)
            .ok_or_else(|| ConfigError::MissingEnvVar("ORDERS_DATABASE_URL".to_string()))?;

        let max_connections =
            parse_or_default(&env, "ORDERS_DB_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS)?;
        if max_connections == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "ORDERS_DB_MAX_CONNECTIONS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            database_url,
            max_connections,
            settings: ServiceSettings::from_lookup(&env)?,
            email: EmailConfig::from_lookup(&env)?,
        })
    }
}

/// Parse an optional variable, falling back to `default` when unset.
fn parse_or_default<T>(
    env: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    env(key).map_or(Ok(default), |raw| {
        raw.trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    })
}
