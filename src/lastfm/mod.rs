mod rate_limit;
mod signature;
mod types;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{Result, ScrobbleError};
use crate::models::{Listen, Scrobble, Session};
use crate::session::{KeyValueStore, SessionStore};

pub use rate_limit::RequestGate;
pub use signature::sign;
use types::{ApiError, RecentTracksResponse, SessionResponse, Track, TrackInfoResponse};

pub const DEFAULT_API_URL: &str = "https://ws.audioscrobbler.com/2.0/";
pub const AUTH_URL: &str = "https://www.last.fm/api/auth/";
pub const DEFAULT_REQUEST_DELAY: Duration = Duration::from_millis(150);

/// Parameters whose values never show up in errors or logs.
const REDACTED_PARAMS: [&str; 4] = ["api_key", "api_sig", "sk", "token"];

/// The calls the listen pipeline makes against Last.fm.
#[async_trait]
pub trait ScrobbleApi: Send + Sync {
    /// Plays recorded for the session user between `from` and `to`, inclusive.
    async fn fetch_recent_plays(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Scrobble>>;

    /// Canonical track length in milliseconds; `0` when Last.fm does not know it.
    async fn fetch_track_duration_ms(&self, track: &str, artist: &str) -> Result<u64>;

    async fn submit_scrobble(&self, listen: &Listen) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct LastFmConfig {
    pub api_key: String,
    pub api_secret: String,
    pub api_url: String,
    pub request_delay: Duration,
}

impl LastFmConfig {
    pub fn new(api_key: String, api_secret: String) -> Self {
        Self {
            api_key,
            api_secret,
            api_url: DEFAULT_API_URL.to_string(),
            request_delay: DEFAULT_REQUEST_DELAY,
        }
    }

    pub fn with_api_url(mut self, api_url: String) -> Self {
        self.api_url = api_url;
        self
    }

    pub fn with_request_delay(mut self, request_delay: Duration) -> Self {
        self.request_delay = request_delay;
        self
    }
}

#[derive(Debug, Clone, Copy)]
enum Verb {
    Get,
    Post,
}

pub struct LastFmClient {
    config: LastFmConfig,
    client: reqwest::Client,
    session: SessionStore,
    gate: RequestGate,
}

impl LastFmClient {
    pub fn new(config: LastFmConfig, store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            gate: RequestGate::new(config.request_delay),
            config,
            client: reqwest::Client::new(),
            session: SessionStore::new(store),
        }
    }

    pub fn session(&self) -> &Session {
        self.session.session()
    }

    pub fn is_authenticated(&self) -> bool {
        self.session().is_authenticated()
    }

    /// Loads persisted credentials and, when only a token is known, trades it
    /// for a session key. Without any token the client stays unauthenticated.
    pub async fn init_session(&mut self, incoming_token: Option<&str>) -> Result<()> {
        self.session.load()?;
        self.session.set_auth_token(incoming_token)?;

        if self.session().auth_key.is_some() {
            return Ok(());
        }

        let Some(token) = self.session().auth_token.clone() else {
            tracing::debug!("No Last.fm auth token available, staying signed out");
            return Ok(());
        };

        let params = vec![("method", "auth.getSession".to_string()), ("token", token)];
        let response: SessionResponse = self.call(Verb::Get, params, true).await?;

        self.session.set_user_name(Some(&response.session.name))?;
        self.session.set_auth_key(Some(&response.session.key))?;
        tracing::info!("Established Last.fm session for {}", response.session.name);

        Ok(())
    }

    pub fn set_auth_key(&mut self, value: Option<&str>) -> Result<()> {
        self.session.set_auth_key(value)
    }

    pub fn set_auth_token(&mut self, value: Option<&str>) -> Result<()> {
        self.session.set_auth_token(value)
    }

    pub fn set_user_name(&mut self, value: Option<&str>) -> Result<()> {
        self.session.set_user_name(value)
    }

    pub fn clear_session(&mut self) -> Result<()> {
        self.session.clear()
    }

    /// Where to send the user to grant access; Last.fm redirects back to
    /// `callback` with a `token` query parameter.
    pub fn auth_url(&self, callback: Option<&str>) -> String {
        let mut url = format!(
            "{}?api_key={}",
            AUTH_URL,
            urlencoding::encode(&self.config.api_key)
        );
        if let Some(cb) = callback {
            url.push_str("&cb=");
            url.push_str(&urlencoding::encode(cb));
        }
        url
    }

    /// Last.fm reports most failures as a JSON body with an `error` field,
    /// sometimes alongside a non-2xx status; those bodies are returned as-is.
    async fn send(&self, verb: Verb, params: &BTreeMap<String, String>) -> Result<Value> {
        let request = match verb {
            Verb::Get => self.client.get(&self.config.api_url).query(params),
            Verb::Post => self.client.post(&self.config.api_url).form(params),
        };
        let response = request.send().await?;
        let status_error = response.error_for_status_ref().err();
        let bytes = response.bytes().await?;

        match (serde_json::from_slice::<Value>(&bytes), status_error) {
            (Ok(body), _) if body.get("error").is_some() => Ok(body),
            (_, Some(e)) => Err(ScrobbleError::Transport(e)),
            (Ok(body), None) => Ok(body),
            (Err(e), None) => Err(ScrobbleError::InvalidResponse(e)),
        }
    }

    async fn call<T: DeserializeOwned>(
        &self,
        verb: Verb,
        params: Vec<(&'static str, String)>,
        signed: bool,
    ) -> Result<T> {
        let mut params: BTreeMap<String, String> = params
            .into_iter()
            .map(|(name, value)| (name.to_string(), value))
            .collect();
        params.insert("api_key".to_string(), self.config.api_key.clone());

        if signed {
            let api_sig = sign(
                params.iter().map(|(k, v)| (k.as_str(), v.as_str())),
                &self.config.api_secret,
            );
            params.insert("api_sig".to_string(), api_sig);
        }
        params.insert("format".to_string(), "json".to_string());

        let method = params.get("method").cloned().unwrap_or_default();
        tracing::debug!("Last.fm {:?} {} {:?}", verb, method, redact(&params));

        let body = self.gate.run(self.send(verb, &params)).await?;

        if body.get("error").is_some() {
            let api_error: ApiError =
                serde_json::from_value(body).map_err(ScrobbleError::InvalidResponse)?;
            tracing::debug!(
                "Last.fm returned error {} for {}: {}",
                api_error.error,
                method,
                api_error.message
            );
            return Err(ScrobbleError::RemoteService {
                method,
                code: api_error.error,
                message: api_error.message,
                params: redact(&params),
            });
        }

        serde_json::from_value(body).map_err(ScrobbleError::InvalidResponse)
    }
}

#[async_trait]
impl ScrobbleApi for LastFmClient {
    async fn fetch_recent_plays(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Scrobble>> {
        let user = self
            .session()
            .user_name
            .clone()
            .ok_or(ScrobbleError::NotAuthenticated)?;

        let params = vec![
            ("method", "user.getrecenttracks".to_string()),
            ("user", user),
            ("from", from.timestamp().to_string()),
            ("to", to.timestamp().to_string()),
            ("limit", "200".to_string()),
        ];
        let response: RecentTracksResponse = self.call(Verb::Get, params, false).await?;

        Ok(response
            .recenttracks
            .track
            .into_iter()
            .filter_map(Track::into_scrobble)
            .collect())
    }

    async fn fetch_track_duration_ms(&self, track: &str, artist: &str) -> Result<u64> {
        let lookup_failure = |reason: String| ScrobbleError::LookupFailure {
            track: track.to_string(),
            artist: artist.to_string(),
            reason,
        };

        let params = vec![
            ("method", "track.getInfo".to_string()),
            ("artist", artist.to_string()),
            ("track", track.to_string()),
        ];
        let response: TrackInfoResponse = self
            .call(Verb::Get, params, false)
            .await
            .map_err(|e| lookup_failure(e.to_string()))?;

        match response.track.duration {
            None => Ok(0),
            Some(duration) => duration
                .as_u64()
                .ok_or_else(|| lookup_failure(format!("unreadable duration {:?}", duration))),
        }
    }

    async fn submit_scrobble(&self, listen: &Listen) -> Result<()> {
        if !self.is_authenticated() {
            return Err(ScrobbleError::NotAuthenticated);
        }
        let session_key = self
            .session()
            .auth_key
            .clone()
            .ok_or(ScrobbleError::NotAuthenticated)?;

        let params = vec![
            ("method", "track.scrobble".to_string()),
            ("artist", listen.artist_name().to_string()),
            ("track", listen.track_name().to_string()),
            ("timestamp", listen.start_time().timestamp().to_string()),
            ("sk", session_key),
        ];
        let sent: BTreeMap<String, String> = params
            .iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect();
        let response: Value = self.call(Verb::Post, params, true).await?;

        // Accepted with a 200 but filtered out, e.g. a timestamp too far back
        let ignored = response
            .pointer("/scrobbles/@attr/ignored")
            .and_then(as_count)
            .unwrap_or(0);
        if ignored > 0 {
            let ignored_message = response.pointer("/scrobbles/scrobble/ignoredMessage");
            let code = ignored_message
                .and_then(|m| m.get("code"))
                .and_then(as_count)
                .unwrap_or(0);
            let message = ignored_message
                .and_then(|m| m.get("#text"))
                .and_then(Value::as_str)
                .filter(|text| !text.is_empty())
                .unwrap_or("scrobble ignored")
                .to_string();
            tracing::warn!("Last.fm ignored scrobble {}: {}", listen, message);
            return Err(ScrobbleError::RemoteService {
                method: "track.scrobble".to_string(),
                code: code as i64,
                message,
                params: redact(&sent),
            });
        }

        tracing::debug!("Scrobbled: {}", listen);
        Ok(())
    }
}

/// Last.fm sends counters either as numbers or as numeric strings.
fn as_count(value: &Value) -> Option<u64> {
    value
        .as_u64()
        .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
}

fn redact(params: &BTreeMap<String, String>) -> BTreeMap<String, String> {
    params
        .iter()
        .map(|(name, value)| {
            let value = if REDACTED_PARAMS.contains(&name.as_str()) {
                "<redacted>".to_string()
            } else {
                value.clone()
            };
            (name.clone(), value)
        })
        .collect()
}
