use chrono::Duration;

use crate::error::Result;
use crate::lastfm::ScrobbleApi;
use crate::models::Scrobble;

/// Seconds on either side of a proposed scrobble searched for an existing play.
pub const DEFAULT_BUFFER_SECS: i64 = 210;

/// Track names with a Dice coefficient above this are the same track.
pub const SAME_TRACK_SIMILARITY: f64 = 0.9;

#[derive(Debug, Clone)]
pub struct DuplicateDetector {
    buffer: Duration,
}

impl Default for DuplicateDetector {
    fn default() -> Self {
        Self::new(Duration::seconds(DEFAULT_BUFFER_SECS))
    }
}

impl DuplicateDetector {
    pub fn new(buffer: Duration) -> Self {
        Self { buffer }
    }

    pub async fn is_already_scrobbled<A>(&self, api: &A, proposed: &Scrobble) -> Result<bool>
    where
        A: ScrobbleApi + ?Sized,
    {
        let from = proposed.timestamp - self.buffer;
        let to = proposed.timestamp + self.buffer;
        let recorded = api.fetch_recent_plays(from, to).await?;

        let duplicate = recorded.iter().any(|play| is_same_play(proposed, play));
        if duplicate {
            tracing::debug!("Already scrobbled: {}", proposed);
        }
        Ok(duplicate)
    }
}

/// Artists must match exactly; track names only closely, since sources
/// disagree on remix tags and punctuation.
pub fn is_same_play(proposed: &Scrobble, recorded: &Scrobble) -> bool {
    recorded.artist == proposed.artist
        && strsim::sorensen_dice(&proposed.track, &recorded.track) > SAME_TRACK_SIMILARITY
}
