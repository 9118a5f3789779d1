//! Runtime configuration loaded from the environment

use std::time::Duration;

use anyhow::{Context, Result};

/// Storage keys used on the device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageKeys {
    pub preferences: String,
    pub onboarding_complete: String,
    pub auth_state: String,
}

impl Default for StorageKeys {
    fn default() -> Self {
        Self {
            preferences: "pitchlink_user_preferences".to_string(),
            onboarding_complete: "pitchlink_onboarding_complete".to_string(),
            auth_state: "pitchlink_auth_state".to_string(),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// SQLite URL of the secure store
    pub database_url: String,
    /// Upper bound for any single storage call
    pub storage_timeout: Duration,
    /// Delay before a LOW severity error is hidden
    pub error_dismiss_delay: Duration,
    /// Simulated latency of the mock content source
    pub mock_latency: Duration,
    /// Cron expression for background content refreshes
    pub refresh_schedule: String,
    pub keys: StorageKeys,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite:database/pitchlink.db".to_string(),
            storage_timeout: Duration::from_millis(5000),
            error_dismiss_delay: Duration::from_millis(3000),
            mock_latency: Duration::from_millis(1000),
            refresh_schedule: "0 */5 * * * *".to_string(),
            keys: StorageKeys::default(),
        }
    }
}

impl AppConfig {
    /// Build the configuration from `.env` and the process environment.
    ///
    /// Unset variables keep their defaults; malformed values are errors.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(url) = lookup("PITCHLINK_DATABASE_URL") {
            config.database_url = url;
        }
        if let Some(value) = lookup("PITCHLINK_STORAGE_TIMEOUT_MS") {
            config.storage_timeout = parse_millis("PITCHLINK_STORAGE_TIMEOUT_MS", &value)?;
        }
        if let Some(value) = lookup("PITCHLINK_ERROR_DISMISS_MS") {
            config.error_dismiss_delay = parse_millis("PITCHLINK_ERROR_DISMISS_MS", &value)?;
        }
        if let Some(value) = lookup("PITCHLINK_MOCK_LATENCY_MS") {
            config.mock_latency = parse_millis("PITCHLINK_MOCK_LATENCY_MS", &value)?;
        }
        if let Some(schedule) = lookup("PITCHLINK_REFRESH_SCHEDULE") {
            config.refresh_schedule = schedule;
        }

        Ok(config)
    }
}

fn parse_millis(name: &str, value: &str) -> Result<Duration> {
    let millis: u64 = value
        .trim()
        .parse()
        .with_context(|| format!("{name} must be a number of milliseconds, got '{value}'"))?;
    Ok(Duration::from_millis(millis))
}
