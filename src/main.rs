use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use scrobblify::api::{self, AppState};
use scrobblify::config::Config;
use scrobblify::db;
use scrobblify::lastfm::LastFmClient;
use scrobblify::session::SqliteStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "scrobblify=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment variables if .env exists
    let _ = dotenvy::dotenv();

    let config = Config::from_env()?;

    tracing::info!("Initializing session store at {}", config.database_path);

    let pool = db::create_pool(&config.database_path)?;
    db::init_database(&pool)?;

    let store = Arc::new(SqliteStore::new(pool, "lastfm"));
    let mut client = LastFmClient::new(config.lastfm.clone(), store);

    // A stored session needs no network; a stored token is exchanged now
    if let Err(e) = client.init_session(None).await {
        tracing::warn!("Could not restore Last.fm session: {}", e);
    }
    match &client.session().user_name {
        Some(user) if client.is_authenticated() => tracing::info!("Signed in to Last.fm as {}", user),
        _ => tracing::info!("Not signed in to Last.fm; visit /api/auth/url to connect"),
    }

    let state = Arc::new(AppState::new(
        client,
        config.export_timezone,
        config.duplicate_buffer,
    ));
    let app = api::create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
