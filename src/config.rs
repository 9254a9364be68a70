use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use chrono_tz::Tz;

use crate::lastfm::{LastFmConfig, DEFAULT_API_URL, DEFAULT_REQUEST_DELAY};
use crate::pipeline::DEFAULT_BUFFER_SECS;

/// Settings read from the environment (and `.env`, loaded by `main`).
#[derive(Debug, Clone)]
pub struct Config {
    pub lastfm: LastFmConfig,
    pub duplicate_buffer: chrono::Duration,
    pub export_timezone: Tz,
    pub database_path: String,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("LASTFM_API_KEY").context("LASTFM_API_KEY must be set")?;
        let api_secret = lookup("LASTFM_API_SECRET").context("LASTFM_API_SECRET must be set")?;

        let request_delay = match lookup("LASTFM_REQUEST_DELAY_MS") {
            Some(ms) => Duration::from_millis(
                ms.parse()
                    .with_context(|| format!("invalid LASTFM_REQUEST_DELAY_MS '{}'", ms))?,
            ),
            None => DEFAULT_REQUEST_DELAY,
        };

        let duplicate_buffer_secs = match lookup("DUPLICATE_BUFFER_SECS") {
            Some(secs) => secs
                .parse()
                .with_context(|| format!("invalid DUPLICATE_BUFFER_SECS '{}'", secs))?,
            None => DEFAULT_BUFFER_SECS,
        };

        let export_timezone = match lookup("EXPORT_TIMEZONE") {
            Some(name) => name
                .parse::<Tz>()
                .map_err(|e| anyhow!("invalid EXPORT_TIMEZONE '{}': {}", name, e))?,
            None => Tz::UTC,
        };

        let lastfm = LastFmConfig::new(api_key, api_secret)
            .with_api_url(lookup("LASTFM_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()))
            .with_request_delay(request_delay);

        Ok(Self {
            lastfm,
            duplicate_buffer: chrono::Duration::seconds(duplicate_buffer_secs),
            export_timezone,
            database_path: lookup("DATABASE_PATH").unwrap_or_else(|| "scrobblify.db".to_string()),
            port: lookup("PORT").and_then(|p| p.parse().ok()).unwrap_or(3000),
        })
    }
}
