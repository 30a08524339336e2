//! Collaborative plain-text editor server: WebSocket endpoint with per-line
//! locking over one shared document, plus HTTP routes for named snapshots.
mod api;
mod config;
mod persist;
mod ws;

use std::sync::Arc;
use std::time::Instant;

use axum::routing::{get, post};
use axum::Router;
use coedit::EditorHub;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tracing::info;

use crate::config::ServerConfig;
use crate::persist::SnapshotStore;

#[derive(Clone)]
pub struct AppState {
    pub hub: Arc<EditorHub>,
    pub store: Arc<SnapshotStore>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "coedit_server=debug,coedit=debug".into()),
        )
        .init();

    let config = ServerConfig::from_env();
    info!("starting coedit server: {config:?}");

    let hub = Arc::new(EditorHub::new(config.lease));
    let store = Arc::new(SnapshotStore::new(&config.data_dir)?);
    let state = AppState {
        hub: hub.clone(),
        store,
    };

    // Lease sweep for the process lifetime.
    let sweep_hub = hub.clone();
    let sweep_period = config.sweep_period;
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(sweep_period);
        loop {
            interval.tick().await;
            sweep_hub.sweep_expired(Instant::now());
        }
    });

    let app = Router::new()
        .route("/", get(api::index))
        .route("/ws", get(ws::ws_handler))
        .route("/save", post(api::save))
        .route("/load", post(api::load))
        .route("/listFiles", get(api::list_files))
        .nest_service("/static", ServeDir::new(&config.static_dir))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!("listening on http://{}", config.bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}
