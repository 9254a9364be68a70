use chrono::{DateTime, Duration, Utc};

use crate::models::Listen;

/// How far back Last.fm accepts scrobbles.
pub const MAX_BACKDATE_DAYS: i64 = 14;

#[derive(Debug, Clone)]
pub struct RetroactivityFilter {
    window: Duration,
}

impl Default for RetroactivityFilter {
    fn default() -> Self {
        Self::new(Duration::days(MAX_BACKDATE_DAYS))
    }
}

impl RetroactivityFilter {
    pub fn new(window: Duration) -> Self {
        Self { window }
    }

    /// Drops listens that started before `now - window`. A listen exactly at
    /// the limit is kept.
    pub fn filter(&self, listens: Vec<Listen>, now: DateTime<Utc>) -> Vec<Listen> {
        let limit = now - self.window;
        let total = listens.len();
        let kept: Vec<Listen> = listens
            .into_iter()
            .filter(|listen| listen.start_time() >= limit)
            .collect();

        if kept.len() < total {
            tracing::info!(
                "Dropped {} listens older than {}",
                total - kept.len(),
                limit
            );
        }
        kept
    }

    /// Moves every listen to `timestamp`, which gets listens older than the
    /// window accepted. Never applied by `filter`.
    pub fn retag(&self, listens: Vec<Listen>, timestamp: DateTime<Utc>) -> Vec<Listen> {
        tracing::info!("Retagging {} listens to {}", listens.len(), timestamp);
        listens
            .into_iter()
            .map(|listen| listen.retagged(timestamp))
            .collect()
    }
}
