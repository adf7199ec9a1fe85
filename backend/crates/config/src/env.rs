use crmsync_common::error::{CrmSyncError, CrmSyncResult};
use serde::Deserialize;
use std::env;
use std::str::FromStr;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
}

impl AppConfig {
    /// Load configuration from environment variables.
    /// Loads `.env` file if present, then reads required vars.
    pub fn from_env() -> CrmSyncResult<Self> {
        // Best-effort .env load; ignore if missing
        let _ = dotenvy::dotenv();

        Ok(Self {
            database_url: get_var("DATABASE_URL")?,
        })
    }
}

pub fn get_var(key: &str) -> CrmSyncResult<String> {
    env::var(key).map_err(|_| CrmSyncError::Config(format!("{key} is required but not set")))
}

pub fn get_var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_owned())
}

/// Parse an optional variable, failing on a present but malformed value.
pub fn parse_var_or<T>(key: &str, default: T) -> CrmSyncResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| CrmSyncError::Config(format!("invalid {key}: {e}"))),
        Err(_) => Ok(default),
    }
}
