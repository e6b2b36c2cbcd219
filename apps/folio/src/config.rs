use std::time::Duration;

use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Every variable has a default; malformed values fail startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    /// Trailing delay used to coalesce bursts of preview snapshots.
    pub preview_debounce: Duration,
    /// Upper bound on concurrently open preview sessions (measurement slots).
    pub preview_max_sessions: usize,
    /// Sessions not touched for this long are closed and their slot returned.
    pub preview_idle_ttl: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            port: parse_env("PORT", 8080).context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            preview_debounce: Duration::from_millis(
                parse_env("PREVIEW_DEBOUNCE_MS", 150)
                    .context("PREVIEW_DEBOUNCE_MS must be a number of milliseconds")?,
            ),
            preview_max_sessions: parse_env("PREVIEW_MAX_SESSIONS", 64)
                .context("PREVIEW_MAX_SESSIONS must be a positive integer")?,
            preview_idle_ttl: Duration::from_secs(
                parse_env("PREVIEW_IDLE_TTL_SECS", 900)
                    .context("PREVIEW_IDLE_TTL_SECS must be a number of seconds")?,
            ),
        })
    }
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("invalid value '{raw}' for {key}")),
        Err(_) => Ok(default),
    }
}
