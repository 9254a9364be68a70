use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Listen;

/// A play as Last.fm records it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scrobble {
    pub track: String,
    pub artist: String,
    pub timestamp: DateTime<Utc>,
}

impl Scrobble {
    pub fn new(track: String, artist: String, timestamp: DateTime<Utc>) -> Self {
        Self {
            track,
            artist,
            timestamp,
        }
    }
}

impl From<&Listen> for Scrobble {
    fn from(listen: &Listen) -> Self {
        Self::new(
            listen.track_name().to_string(),
            listen.artist_name().to_string(),
            listen.start_time(),
        )
    }
}

impl fmt::Display for Scrobble {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.track, self.artist)
    }
}
