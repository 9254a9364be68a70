//! Last.fm's scrobbling policy (https://www.last.fm/api/scrobbling): a track
//! counts only if it is longer than 30 seconds and was played for at least half
//! its length or 4 minutes, whichever comes first.

use std::collections::HashMap;
use std::time::Duration;

use crate::lastfm::ScrobbleApi;
use crate::models::Listen;

#[derive(Debug, Clone, PartialEq)]
pub struct ValidationPolicy {
    pub min_track_length: Duration,
    pub min_listen_fraction: f64,
    pub max_required_listen: Duration,
    /// Stands in for tracks whose length Last.fm does not know.
    pub unknown_track_length: Duration,
    /// Used for every track when lookups are skipped. Not recommended: it
    /// effectively drops the half-length requirement.
    pub assumed_track_length: Duration,
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self {
            min_track_length: Duration::from_secs(30),
            min_listen_fraction: 0.5,
            max_required_listen: Duration::from_secs(4 * 60),
            unknown_track_length: Duration::from_secs(2 * 60),
            assumed_track_length: Duration::from_secs(60),
        }
    }
}

/// How long the user engaged with a listen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Engagement {
    /// The export recorded how long the track played.
    PlayedDuration(u64),
    /// No played figure; the gap until the next listen stands in for it.
    UntilNextListen(u64),
    /// No played figure and no later listen to bound it.
    Unbounded,
}

impl Engagement {
    fn meets(self, required_ms: u64) -> bool {
        match self {
            Engagement::PlayedDuration(ms) | Engagement::UntilNextListen(ms) => ms >= required_ms,
            Engagement::Unbounded => true,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ListenValidator {
    policy: ValidationPolicy,
}

impl ListenValidator {
    pub fn new(policy: ValidationPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &ValidationPolicy {
        &self.policy
    }

    /// Keeps the listens that satisfy the scrobbling policy, in input order.
    ///
    /// Track lengths are looked up one listen at a time through `api`, never
    /// concurrently, so every lookup passes through the client's rate gate.
    /// `progress` runs once per listen before its lookup.
    pub async fn remove_invalid_listens<A, F>(
        &self,
        api: &A,
        listens: Vec<Listen>,
        mut progress: F,
        assume_track_length: bool,
    ) -> Vec<Listen>
    where
        A: ScrobbleApi + ?Sized,
        F: FnMut(usize, &Listen),
    {
        let mut durations = Vec::with_capacity(listens.len());
        let mut cache: HashMap<(&str, &str), u64> = HashMap::new();

        for (index, listen) in listens.iter().enumerate() {
            progress(index, listen);

            if assume_track_length {
                durations.push(as_ms(self.policy.assumed_track_length));
                continue;
            }

            let key = (listen.artist_name(), listen.track_name());
            if let Some(&cached) = cache.get(&key) {
                durations.push(cached);
                continue;
            }

            let duration = match api
                .fetch_track_duration_ms(listen.track_name(), listen.artist_name())
                .await
            {
                Ok(ms) => ms,
                // Any failed lookup counts as an unknown length
                Err(e) => {
                    tracing::debug!("No track length for {}: {}", listen, e);
                    0
                }
            };
            cache.insert(key, duration);
            durations.push(duration);
        }

        let engagement = engagements(&listens);
        let total = listens.len();

        let valid: Vec<Listen> = listens
            .iter()
            .zip(durations)
            .zip(engagement)
            .filter(|((listen, duration_ms), engagement)| {
                self.is_valid(listen, *duration_ms, *engagement)
            })
            .map(|((listen, _), _)| listen.clone())
            .collect();

        tracing::info!("{} of {} listens meet the scrobbling policy", valid.len(), total);
        valid
    }

    /// Listened time a track of `duration_ms` needs before it counts.
    pub fn required_listen_ms(&self, duration_ms: u64) -> u64 {
        let half = (duration_ms as f64 * self.policy.min_listen_fraction) as u64;
        half.min(as_ms(self.policy.max_required_listen))
    }

    pub fn is_valid(&self, listen: &Listen, duration_ms: u64, engagement: Engagement) -> bool {
        let duration_ms = if duration_ms == 0 {
            as_ms(self.policy.unknown_track_length)
        } else {
            duration_ms
        };

        if duration_ms < as_ms(self.policy.min_track_length) {
            tracing::debug!("Invalid due to track duration: {} ({} ms)", listen, duration_ms);
            return false;
        }

        let required = self.required_listen_ms(duration_ms);
        let valid = engagement.meets(required);
        if !valid {
            tracing::debug!(
                "Invalid: {} only engaged {:?} of {} ms required",
                listen,
                engagement,
                required
            );
        }
        valid
    }
}

/// Engagement per listen, in input order. The next-listen gap is measured to
/// the chronologically following listen, so unsorted input is handled.
///
/// Spotify exports stamp the end of a play. For those listens the gap spans
/// the following listen's play time rather than this one's, so
/// `UntilNextListen` is only an approximation; `PlayedDuration` is exact
/// and always takes precedence.
pub fn engagements(listens: &[Listen]) -> Vec<Engagement> {
    let mut chronological: Vec<usize> = (0..listens.len()).collect();
    chronological.sort_by_key(|&i| listens[i].start_time());

    let mut next_start = vec![None; listens.len()];
    for pair in chronological.windows(2) {
        next_start[pair[0]] = Some(listens[pair[1]].start_time());
    }

    listens
        .iter()
        .zip(next_start)
        .map(|(listen, next)| match (listen.played_duration_ms(), next) {
            (Some(played), _) => Engagement::PlayedDuration(played),
            (None, Some(next)) => {
                let gap = (next - listen.start_time()).num_milliseconds().max(0);
                Engagement::UntilNextListen(gap as u64)
            }
            (None, None) => Engagement::Unbounded,
        })
        .collect()
}

fn as_ms(duration: Duration) -> u64 {
    duration.as_millis() as u64
}
