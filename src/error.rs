use std::collections::BTreeMap;

use thiserror::Error;

/// Failures surfaced by the Last.fm client and the listen pipeline.
#[derive(Debug, Error)]
pub enum ScrobbleError {
    /// A credential required for the call is missing; the auth flow must be run again.
    #[error("not authenticated with Last.fm")]
    NotAuthenticated,

    /// The call completed but Last.fm reported an error in the body.
    #[error("Last.fm error {code} on {method}: {message} (params: {params:?})")]
    RemoteService {
        method: String,
        code: i64,
        message: String,
        params: BTreeMap<String, String>,
    },

    #[error("request to Last.fm failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected response from Last.fm: {0}")]
    InvalidResponse(#[source] serde_json::Error),

    /// A single track duration could not be resolved.
    #[error("could not look up duration of '{track}' by '{artist}': {reason}")]
    LookupFailure {
        track: String,
        artist: String,
        reason: String,
    },

    #[error("malformed listening history export: {0}")]
    MalformedExport(String),

    #[error("session storage failed: {0:#}")]
    Storage(anyhow::Error),
}

pub type Result<T, E = ScrobbleError> = std::result::Result<T, E>;
