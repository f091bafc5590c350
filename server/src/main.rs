mod app;
mod config;
mod routes;
mod services;
mod state;
mod storage;

use std::sync::Arc;

use tokio::signal;
use tracing_subscriber::EnvFilter;
use worldboard_shared::board::{self, PixelBoard};
use worldboard_shared::grid::WorldGrid;
use worldboard_shared::painter::PAINTED_PIXELS_KEY;
use worldboard_shared::seed;
use worldboard_shared::store::KeyValueStore;

use crate::state::{AppState, SharedStore};
use crate::storage::FileStore;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let data_dir = config::data_dir();
    let store: SharedStore = match FileStore::open(&data_dir) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            tracing::error!(error = %e, %data_dir, "failed to open data directory");
            return;
        }
    };

    let grid = WorldGrid::new(
        config::CANVAS_WIDTH,
        config::CANVAS_HEIGHT,
        worldboard_shared::grid::WORLD_MIN_LATITUDE,
        worldboard_shared::grid::WORLD_MAX_LATITUDE,
    );
    let board = load_board(grid, &store);
    tracing::info!(
        painted_pixels = board.len(),
        width = grid.width,
        height = grid.height,
        "Canvas ready"
    );

    let state = AppState::new(grid, board, store);

    tokio::spawn(services::snapshot_service::run(state.clone()));

    let app = app::build_app(state.clone());

    let addr = format!("0.0.0.0:{}", config::server_port());
    tracing::info!("Worldboard server listening on {addr}");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(error = %e, %addr, "failed to bind TCP listener");
            return;
        }
    };
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(error = %e, "server failed");
    }

    services::snapshot_service::persist_now(&state).await;
    tracing::info!("Server shut down gracefully");
}

/// Restore the persisted canvas, or seed a fresh one with the built-in
/// artworks. A store read failure degrades to the seeded board; the
/// fallback is meant to come up regardless.
fn load_board(grid: WorldGrid, store: &SharedStore) -> PixelBoard {
    match store.get(PAINTED_PIXELS_KEY) {
        Ok(Some(raw)) => PixelBoard::from_pixels(grid, board::parse_stored_pixels(&raw)),
        Ok(None) => {
            if config::seed_enabled() {
                PixelBoard::from_pixels(grid, seed::seeded_pixels(grid))
            } else {
                PixelBoard::new(grid)
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "failed to read persisted canvas; starting seeded");
            if config::seed_enabled() {
                PixelBoard::from_pixels(grid, seed::seeded_pixels(grid))
            } else {
                PixelBoard::new(grid)
            }
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        let mut sigterm = match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(sigterm) => sigterm,
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                return;
            }
        };
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
