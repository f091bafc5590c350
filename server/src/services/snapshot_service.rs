use std::time::Duration;

use tracing::{info, warn};
use worldboard_shared::board;
use worldboard_shared::painter::PAINTED_PIXELS_KEY;
use worldboard_shared::store::KeyValueStore;

use crate::config::snapshot_interval_secs;
use crate::state::AppState;

/// Periodically writes the canvas back to the store so a restart picks up
/// where the board left off. Unchanged boards are skipped.
pub async fn run(state: AppState) {
    let interval_secs = snapshot_interval_secs();
    info!("Snapshot service started (interval: {interval_secs}s)");

    let mut last_persisted: Option<u32> = None;
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
    // Consume the immediate first tick so the first write waits a full
    // interval after startup.
    interval.tick().await;

    loop {
        interval.tick().await;
        persist_once(&state, &mut last_persisted).await;
    }
}

/// One unconditional persistence pass, used to flush on shutdown.
pub async fn persist_now(state: &AppState) {
    persist_once(state, &mut None).await;
}

async fn persist_once(state: &AppState, last_persisted: &mut Option<u32>) {
    let (fingerprint, painted, encoded) = {
        let snapshot = state.board.read().await;
        let encoded = board::encode_stored_pixels(snapshot.board.pixels());
        (snapshot.fingerprint, snapshot.board.len(), encoded)
    };

    if *last_persisted == Some(fingerprint) {
        return;
    }

    let encoded = match encoded {
        Ok(encoded) => encoded,
        Err(e) => {
            state.observability.record_snapshot_persist_failure();
            warn!("failed to encode canvas snapshot: {e}");
            return;
        }
    };

    match state.store.set(PAINTED_PIXELS_KEY, &encoded) {
        Ok(()) => {
            state.observability.record_snapshot_persisted();
            *last_persisted = Some(fingerprint);
            info!("Saved canvas snapshot ({painted} painted pixels)");
        }
        Err(e) => {
            state.observability.record_snapshot_persist_failure();
            warn!("Failed to persist canvas snapshot: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::persist_now;
    use crate::state::AppState;
    use worldboard_shared::board::{self, PixelBoard};
    use worldboard_shared::grid::WorldGrid;
    use worldboard_shared::painter::PAINTED_PIXELS_KEY;
    use worldboard_shared::store::{KeyValueStore, MemoryStore};

    #[tokio::test]
    async fn persisted_snapshot_round_trips_through_the_store() {
        let grid = WorldGrid::canvas();
        let store = Arc::new(MemoryStore::new());
        let state = AppState::new(grid, PixelBoard::new(grid), store.clone());

        state.apply_pixel(5, 5, "#ff0000").await.unwrap();
        state.apply_pixel(6, 6, "#22c55e").await.unwrap();
        persist_now(&state).await;

        let raw = store.get(PAINTED_PIXELS_KEY).unwrap().expect("snapshot stored");
        let restored = board::parse_stored_pixels(&raw);
        assert_eq!(restored.len(), 2);
        assert_eq!(restored.get("5:5").map(String::as_str), Some("#ff0000"));

        let observability = state.observability.snapshot();
        assert_eq!(observability.snapshots_persisted_total, 1);
        assert_eq!(observability.snapshot_persist_failures_total, 0);
    }
}
