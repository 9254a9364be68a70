use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single play taken from a listening history export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listen {
    artist_name: String,
    track_name: String,
    start_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    played_duration_ms: Option<u64>,
}

impl Listen {
    pub fn new(
        artist_name: String,
        track_name: String,
        start_time: DateTime<Utc>,
        played_duration_ms: Option<u64>,
    ) -> Self {
        Self {
            artist_name,
            track_name,
            start_time,
            played_duration_ms,
        }
    }

    pub fn artist_name(&self) -> &str {
        &self.artist_name
    }

    pub fn track_name(&self) -> &str {
        &self.track_name
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    pub fn played_duration_ms(&self) -> Option<u64> {
        self.played_duration_ms
    }

    /// Only the retroactivity filter rewrites play times.
    pub(crate) fn retagged(mut self, start_time: DateTime<Utc>) -> Self {
        self.start_time = start_time;
        self
    }
}

impl fmt::Display for Listen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.track_name, self.artist_name)
    }
}
