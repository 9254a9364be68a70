use chrono::DateTime;
use serde::{Deserialize, Deserializer};

use crate::models::Scrobble;

#[derive(Debug, Deserialize)]
pub(crate) struct ApiError {
    pub error: i64,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SessionResponse {
    pub session: SessionInfo,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SessionInfo {
    pub name: String,
    pub key: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RecentTracksResponse {
    pub recenttracks: RecentTracks,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RecentTracks {
    // A single play comes back as an object rather than a one-element array
    #[serde(default, deserialize_with = "one_or_many")]
    pub track: Vec<Track>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Track {
    pub artist: Artist,
    pub name: String,
    pub date: Option<DateInfo>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Artist {
    #[serde(rename = "#text")]
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DateInfo {
    pub uts: String,
}

impl Track {
    /// `None` for the "now playing" entry, which has no date.
    pub fn into_scrobble(self) -> Option<Scrobble> {
        let timestamp = self.date?.uts.parse::<i64>().ok()?;
        Some(Scrobble::new(
            self.name,
            self.artist.text,
            DateTime::from_timestamp(timestamp, 0)?,
        ))
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct TrackInfoResponse {
    pub track: TrackInfo,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TrackInfo {
    #[serde(default)]
    pub duration: Option<StringOrNumber>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum StringOrNumber {
    Number(u64),
    String(String),
}

impl StringOrNumber {
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            StringOrNumber::Number(n) => Some(*n),
            StringOrNumber::String(s) => s.trim().parse().ok(),
        }
    }
}

fn one_or_many<'de, D, T>(de: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany<T> {
        Many(Vec<T>),
        One(T),
    }

    Ok(match OneOrMany::deserialize(de)? {
        OneOrMany::Many(items) => items,
        OneOrMany::One(item) => vec![item],
    })
}
