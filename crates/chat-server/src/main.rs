//! HTTP and WebSocket server for Duet chat.
//!
//! Serves the conversation API under `/api`, the realtime relay at `/api/ws`
//! and, with the disk media backend, uploaded audio under `/media`.

mod auth;
mod config;
mod error;
mod routes;
mod state;

use std::env;
use std::sync::Arc;

use database::Database;
use media_store::{DiskObjectStore, HttpObjectStore, HttpStoreConfig, ObjectStore};
use messaging::MessageService;
use relay::Relay;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::auth::SessionKeys;
use crate::config::{Config, MediaBackend};
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    init_tracing();

    // Load configuration
    let config = Config::from_env()?;
    info!(addr = %config.addr, "Starting chat server");

    // Connect to database
    let db = Database::connect(&config.database_url).await?;
    db.migrate().await?;

    // Object storage for audio uploads
    let storage: Arc<dyn ObjectStore> = match &config.media {
        MediaBackend::Disk { dir, public_url } => Arc::new(DiskObjectStore::new(
            dir.clone(),
            public_url.clone(),
            config.media_folder.clone(),
        )),
        MediaBackend::Http { url, token } => {
            let mut gateway = HttpStoreConfig::new(url.clone()).with_folder(config.media_folder.clone());
            if let Some(token) = token {
                gateway = gateway.with_token(token.clone());
            }
            Arc::new(HttpObjectStore::new(gateway)?)
        }
    };

    // Build application state
    let service = MessageService::new(db, storage, Relay::new());
    let state = AppState::new(
        service,
        SessionKeys::new(&config.session_secret),
        config.ws_ping,
    );

    // Build router
    let mut app = routes::router(config.max_upload_bytes);
    if let MediaBackend::Disk { dir, public_url } = &config.media {
        if public_url.starts_with('/') {
            app = app.nest_service(public_url.trim_end_matches('/'), ServeDir::new(dir));
        }
    }
    let app = app.layer(TraceLayer::new_for_http()).with_state(state);

    // Start server
    info!(addr = %config.addr, "Chat server listening");
    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// `RUST_LOG` filters (default `info`); `LOG_FORMAT=json` switches to JSON lines.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
