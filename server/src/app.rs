use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;

use crate::routes;
use crate::state::AppState;

pub(crate) fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/api/canvas", axum::routing::get(routes::api::get_canvas))
        .route(
            "/api/canvas/raw",
            axum::routing::get(routes::api::get_canvas_raw),
        )
        .route("/api/pixel", axum::routing::post(routes::api::post_pixel))
        .route("/api/events", axum::routing::get(routes::sse::pixel_events))
        .route("/api/health", axum::routing::get(routes::api::health))
        .route("/api/metrics", axum::routing::get(routes::api::metrics))
        .layer(CompressionLayer::new())
        // Browsers hit this API from a dev frontend on another origin.
        .layer(CorsLayer::permissive())
        .with_state(state)
}
