//! Spotify listening history exports.
//!
//! Both the account-data export (`StreamingHistory*.json`: `endTime`,
//! `artistName`, `trackName`, `msPlayed`) and the extended streaming history
//! (`endsong_*.json`: `ts`, `master_metadata_*`, `ms_played`) are accepted.

use std::path::Path;

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::Deserialize;

use crate::error::{Result, ScrobbleError};
use crate::models::Listen;

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M", "%Y-%m-%d %H:%M:%S"];

/// Separator Spotify uses when a play credits several artists.
const ARTIST_SEPARATOR: &str = ", ";

#[derive(Debug, Deserialize)]
struct ExportRecord {
    #[serde(alias = "endTime", alias = "ts")]
    end_time: String,

    #[serde(alias = "artistName", alias = "master_metadata_album_artist_name")]
    artist_name: String,

    #[serde(alias = "trackName", alias = "master_metadata_track_name")]
    track_name: String,

    #[serde(default, alias = "msPlayed", alias = "ms_played")]
    ms_played: Option<u64>,
}

/// Parses a serialized export into listens. Naive timestamps are read in `tz`.
///
/// # Errors
///
/// Returns `MalformedExport` if the input is not an array of records, any
/// record lacks a required field, or a timestamp cannot be resolved. No
/// partial result is returned.
pub fn parse_export(json: &str, tz: Tz) -> Result<Vec<Listen>> {
    let records: Vec<ExportRecord> =
        serde_json::from_str(json).map_err(|e| ScrobbleError::MalformedExport(e.to_string()))?;

    records
        .into_iter()
        .enumerate()
        .map(|(index, record)| {
            let start_time = parse_time(&record.end_time, tz).map_err(|reason| {
                ScrobbleError::MalformedExport(format!("record {}: {}", index, reason))
            })?;
            Ok(Listen::new(
                first_artist(&record.artist_name).to_string(),
                record.track_name,
                start_time,
                record.ms_played,
            ))
        })
        .collect()
}

pub fn load_export(path: &Path, tz: Tz) -> Result<Vec<Listen>> {
    let json = std::fs::read_to_string(path).map_err(|e| {
        ScrobbleError::MalformedExport(format!("{}: {}", path.display(), e))
    })?;
    let listens = parse_export(&json, tz)?;
    tracing::info!("Loaded {} listens from {}", listens.len(), path.display());
    Ok(listens)
}

fn first_artist(artists: &str) -> &str {
    artists
        .split(ARTIST_SEPARATOR)
        .next()
        .unwrap_or(artists)
        .trim()
}

fn parse_time(value: &str, tz: Tz) -> std::result::Result<DateTime<Utc>, String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }

    let naive = NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .ok_or_else(|| format!("unrecognized timestamp '{}'", value))?;

    tz.from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| format!("timestamp '{}' is ambiguous or skipped in {}", value, tz))
}
