// Test utilities: listen fixtures and an in-memory stand-in for Last.fm
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    extract::{Form, Query, State},
    response::Json,
    routing::get,
    Router,
};
use chrono::{DateTime, Duration, Utc};
use serde_json::{json, Value};

use crate::error::{Result, ScrobbleError};
use crate::lastfm::ScrobbleApi;
use crate::models::{Listen, Scrobble};
use crate::session::{KeyValueStore, MemoryStore, AUTH_KEY_KEY, AUTH_TOKEN_KEY, USER_NAME_KEY};

/// Create a test listen with specified parameters
pub fn test_listen(
    artist: &str,
    track: &str,
    start_time: DateTime<Utc>,
    played_ms: Option<u64>,
) -> Listen {
    Listen::new(artist.to_string(), track.to_string(), start_time, played_ms)
}

/// Create a test listen from RFC3339 timestamp string
pub fn test_listen_from_rfc3339(artist: &str, track: &str, timestamp_str: &str) -> Listen {
    let start_time = DateTime::parse_from_rfc3339(timestamp_str)
        .unwrap()
        .with_timezone(&Utc);
    test_listen(artist, track, start_time, None)
}

/// Generate back-to-back listens without played durations
pub fn generate_listen_sequence(
    count: usize,
    start_time: DateTime<Utc>,
    interval_minutes: i64,
) -> Vec<Listen> {
    (0..count)
        .map(|i| {
            let start = start_time + Duration::minutes(interval_minutes * i as i64);
            test_listen(&format!("Artist {}", i % 5), &format!("Track {}", i), start, None)
        })
        .collect()
}

/// Scripted Last.fm: known durations, recorded history, and a log of every call.
#[derive(Default)]
pub struct FakeScrobbleApi {
    durations: HashMap<(String, String), u64>,
    history: Vec<Scrobble>,
    failing_submissions: Vec<String>,
    authenticated: bool,
    pub calls: Mutex<Vec<String>>,
    pub submitted: Mutex<Vec<Listen>>,
}

impl FakeScrobbleApi {
    pub fn new() -> Self {
        Self {
            authenticated: true,
            ..Self::default()
        }
    }

    pub fn with_duration(mut self, artist: &str, track: &str, ms: u64) -> Self {
        self.durations
            .insert((artist.to_string(), track.to_string()), ms);
        self
    }

    pub fn with_history(mut self, scrobble: Scrobble) -> Self {
        self.history.push(scrobble);
        self
    }

    pub fn with_failing_submission(mut self, track: &str) -> Self {
        self.failing_submissions.push(track.to_string());
        self
    }

    pub fn signed_out(mut self) -> Self {
        self.authenticated = false;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl ScrobbleApi for FakeScrobbleApi {
    async fn fetch_recent_plays(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Scrobble>> {
        self.record(format!("recent {} {}", from.timestamp(), to.timestamp()));
        if !self.authenticated {
            return Err(ScrobbleError::NotAuthenticated);
        }
        Ok(self
            .history
            .iter()
            .filter(|s| s.timestamp >= from && s.timestamp <= to)
            .cloned()
            .collect())
    }

    async fn fetch_track_duration_ms(&self, track: &str, artist: &str) -> Result<u64> {
        self.record(format!("duration {} - {}", track, artist));
        self.durations
            .get(&(artist.to_string(), track.to_string()))
            .copied()
            .ok_or_else(|| ScrobbleError::LookupFailure {
                track: track.to_string(),
                artist: artist.to_string(),
                reason: "Track not found".to_string(),
            })
    }

    async fn submit_scrobble(&self, listen: &Listen) -> Result<()> {
        self.record(format!("scrobble {}", listen));
        if !self.authenticated {
            return Err(ScrobbleError::NotAuthenticated);
        }
        if self.failing_submissions.iter().any(|t| t == listen.track_name()) {
            return Err(ScrobbleError::RemoteService {
                method: "track.scrobble".to_string(),
                code: 16,
                message: "The service is temporarily unavailable".to_string(),
                params: Default::default(),
            });
        }
        self.submitted.lock().unwrap().push(listen.clone());
        Ok(())
    }
}

/// Parameters of every request the mock Last.fm server received
pub type Recorded = Arc<Mutex<Vec<HashMap<String, String>>>>;

async fn record_get(
    State(recorded): State<Recorded>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    respond(recorded, params)
}

async fn record_post(
    State(recorded): State<Recorded>,
    Form(params): Form<HashMap<String, String>>,
) -> Json<Value> {
    respond(recorded, params)
}

fn respond(recorded: Recorded, params: HashMap<String, String>) -> Json<Value> {
    let method = params.get("method").cloned().unwrap_or_default();
    let body = match method.as_str() {
        "auth.getSession" if params.get("token").map(String::as_str) == Some("good") => {
            json!({"session": {"name": "alice", "key": "sk-1", "subscriber": 0}})
        }
        "auth.getSession" => json!({"error": 4, "message": "Invalid authentication token supplied"}),
        "user.getrecenttracks" => json!({"recenttracks": {"track": [
            {"artist": {"#text": "Now"}, "name": "Playing", "@attr": {"nowplaying": "true"}},
            {"artist": {"#text": "Lansdowne"}, "name": "Burn Brighter", "date": {"uts": "1577836800"}},
            {"artist": {"#text": "Lansdowne"}, "name": "Blue Collar", "date": {"uts": "1577836500"}}
        ]}}),
        "track.getInfo" if params.get("track").map(String::as_str) == Some("Known") => {
            json!({"track": {"name": "Known", "duration": "240000"}})
        }
        "track.getInfo" => json!({"error": 6, "message": "Track not found"}),
        "track.scrobble" if params.get("track").map(String::as_str) == Some("Ignored") => {
            json!({"scrobbles": {
                "scrobble": {"ignoredMessage": {"code": "3", "#text": "Timestamp too old"}},
                "@attr": {"accepted": 0, "ignored": 1}
            }})
        }
        "track.scrobble" => json!({"scrobbles": {"@attr": {"accepted": 1, "ignored": 0}}}),
        _ => json!({"error": 3, "message": "Invalid Method"}),
    };
    recorded.lock().unwrap().push(params);
    Json(body)
}

/// Serve a canned Last.fm API on a random local port; returns its URL
pub async fn spawn_lastfm() -> (String, Recorded) {
    let recorded: Recorded = Arc::default();
    let app = Router::new()
        .route("/2.0/", get(record_get).post(record_post))
        .with_state(recorded.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}/2.0/", addr), recorded)
}

/// A store holding a complete session for user "alice"
pub fn signed_store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::default());
    store.set(AUTH_TOKEN_KEY, "token").unwrap();
    store.set(AUTH_KEY_KEY, "sk-1").unwrap();
    store.set(USER_NAME_KEY, "alice").unwrap();
    store
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_listen_creation() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let listen = test_listen("Artist", "Track", start, Some(1000));

        assert_eq!(listen.artist_name(), "Artist");
        assert_eq!(listen.track_name(), "Track");
        assert_eq!(listen.start_time(), start);
    }

    #[test]
    fn test_generate_listen_sequence() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let listens = generate_listen_sequence(10, start, 5);

        assert_eq!(listens.len(), 10);
        assert_eq!(listens[0].start_time(), start);
        assert_eq!(listens[9].start_time(), start + Duration::minutes(45));
    }

    #[tokio::test]
    async fn test_fake_api_filters_history_by_range() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let api = FakeScrobbleApi::new()
            .with_history(Scrobble::new("X".to_string(), "A".to_string(), at))
            .with_history(Scrobble::new(
                "Y".to_string(),
                "A".to_string(),
                at + Duration::hours(1),
            ));

        let plays = api
            .fetch_recent_plays(at - Duration::minutes(1), at + Duration::minutes(1))
            .await
            .unwrap();

        assert_eq!(plays.len(), 1);
        assert_eq!(plays[0].track, "X");
    }
}
