use std::time::Duration;

use tokio::sync::watch;
use tracing::warn;
use worldboard_shared::board::PixelMap;

use crate::http::CanvasApi;

/// How often the canvas is refreshed from the remote store.
pub const POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Poll the remote canvas on a fixed interval and publish every successful
/// fetch. A failed poll is logged and the next tick refreshes the full
/// state — there is no retry or backoff. Returns when every receiver is
/// gone.
pub async fn run(api: CanvasApi, interval: Duration, tx: watch::Sender<PixelMap>) {
    let mut ticker = tokio::time::interval(interval);

    loop {
        ticker.tick().await;

        match api.fetch_canvas().await {
            Ok(pixels) => {
                if tx.send(pixels).is_err() {
                    return;
                }
            }
            Err(e) => {
                warn!("canvas refresh failed: {e}");
            }
        }
    }
}
