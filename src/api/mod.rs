use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::error::ScrobbleError;
use crate::export;
use crate::lastfm::LastFmClient;
use crate::models::{Listen, SessionStatus};
use crate::pipeline::{DuplicateDetector, UploadReport, Uploader};

pub struct AppState {
    pub client: RwLock<LastFmClient>,
    pub timezone: Tz,
    pub duplicate_buffer: chrono::Duration,
}

impl AppState {
    pub fn new(client: LastFmClient, timezone: Tz, duplicate_buffer: chrono::Duration) -> Self {
        Self {
            client: RwLock::new(client),
            timezone,
            duplicate_buffer,
        }
    }
}

#[derive(Deserialize)]
pub struct AuthUrlParams {
    #[serde(default)]
    cb: Option<String>,
}

#[derive(Serialize)]
pub struct AuthUrlResponse {
    url: String,
}

#[derive(Deserialize)]
pub struct CallbackParams {
    token: String,
}

#[derive(Deserialize)]
pub struct PrepareRequest {
    /// Raw contents of the export file.
    export: String,
    #[serde(default)]
    assume_track_length: bool,
    #[serde(default)]
    retag_to: Option<DateTime<Utc>>,
}

#[derive(Serialize)]
pub struct PrepareResponse {
    listens: Vec<Listen>,
    total: usize,
    too_old: usize,
    invalid: usize,
}

#[derive(Deserialize)]
pub struct ScrobbleRequest {
    listens: Vec<Listen>,
}

/// Maps pipeline failures onto status codes with a `{ "error": .. }` body.
pub struct ApiError(ScrobbleError);

impl From<ScrobbleError> for ApiError {
    fn from(err: ScrobbleError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            ScrobbleError::NotAuthenticated => StatusCode::UNAUTHORIZED,
            ScrobbleError::MalformedExport(_) => StatusCode::BAD_REQUEST,
            ScrobbleError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ScrobbleError::RemoteService { .. }
            | ScrobbleError::Transport(_)
            | ScrobbleError::InvalidResponse(_)
            | ScrobbleError::LookupFailure { .. } => StatusCode::BAD_GATEWAY,
        };
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self.0);
        }
        let body = serde_json::json!({ "error": self.0.to_string() });
        (status, Json(body)).into_response()
    }
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/auth/url", get(auth_url_handler))
        .route("/api/auth/callback", get(auth_callback_handler))
        .route(
            "/api/session",
            get(get_session_handler).delete(delete_session_handler),
        )
        .route("/api/listens/prepare", post(prepare_listens_handler))
        .route("/api/scrobbles", post(scrobble_handler))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

async fn auth_url_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AuthUrlParams>,
) -> Json<AuthUrlResponse> {
    let client = state.client.read().await;
    Json(AuthUrlResponse {
        url: client.auth_url(params.cb.as_deref()),
    })
}

async fn auth_callback_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CallbackParams>,
) -> Result<Json<SessionStatus>, ApiError> {
    let mut client = state.client.write().await;
    client.init_session(Some(&params.token)).await?;
    Ok(Json(client.session().status()))
}

async fn get_session_handler(State(state): State<Arc<AppState>>) -> Json<SessionStatus> {
    Json(state.client.read().await.session().status())
}

async fn delete_session_handler(
    State(state): State<Arc<AppState>>,
) -> Result<StatusCode, ApiError> {
    state.client.write().await.clear_session()?;
    Ok(StatusCode::NO_CONTENT)
}

async fn prepare_listens_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PrepareRequest>,
) -> Result<Json<PrepareResponse>, ApiError> {
    let listens = export::parse_export(&request.export, state.timezone)?;
    let total = listens.len();

    let client = state.client.read().await;
    let uploader = Uploader::new(&*client);

    // Engagement is measured on the export's own timestamps, so retagging
    // only happens after validation.
    let candidates = match request.retag_to {
        Some(_) => listens,
        None => uploader.remove_old_listens(listens),
    };
    let too_old = total - candidates.len();
    let considered = candidates.len();

    let valid = uploader
        .remove_invalid_listens(
            candidates,
            |index, listen| tracing::debug!("Checking listen {}/{}: {}", index + 1, considered, listen),
            request.assume_track_length,
        )
        .await;
    let invalid = considered - valid.len();

    let listens = match request.retag_to {
        Some(timestamp) => uploader.retag_old_listens(valid, timestamp),
        None => valid,
    };

    Ok(Json(PrepareResponse {
        listens,
        total,
        too_old,
        invalid,
    }))
}

async fn scrobble_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ScrobbleRequest>,
) -> Result<Json<UploadReport>, ApiError> {
    let client = state.client.read().await;
    let count = request.listens.len();
    let report = Uploader::new(&*client)
        .with_duplicates(DuplicateDetector::new(state.duplicate_buffer))
        .upload(&request.listens, |index, listen| {
            tracing::debug!("Scrobbling {}/{}: {}", index + 1, count, listen)
        })
        .await?;
    Ok(Json(report))
}
