use std::fmt::Write as _;

use axum::Json;
use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use serde::Deserialize;
use worldboard_shared::board::BoardAction;
use worldboard_shared::error::BoardError;

use crate::state::{AppState, ObservabilitySnapshot};

const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";
const CANVAS_CACHE_CONTROL: &str = "public, max-age=1";

#[derive(Debug, Deserialize)]
pub struct SetPixelRequest {
    pub x: i64,
    pub y: i64,
    pub color: String,
}

pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let (painted, seq, fingerprint) = {
        let snapshot = state.board.read().await;
        (snapshot.board.len(), snapshot.seq, snapshot.fingerprint)
    };
    let observability = state.observability.snapshot();
    Json(serde_json::json!({
        "status": "ok",
        "painted_pixels": painted,
        "seq": seq,
        "fingerprint": format!("{fingerprint:08x}"),
        "grid": { "width": state.grid.width, "height": state.grid.height },
        "observability": {
            "canvas_requests_total": observability.canvas_requests_total,
            "pixels_painted_total": observability.pixels_painted_total,
            "pixels_erased_total": observability.pixels_erased_total,
            "pixel_rejections_total": observability.pixel_rejections_total,
            "snapshots_persisted_total": observability.snapshots_persisted_total,
            "snapshot_persist_failures_total": observability.snapshot_persist_failures_total,
        }
    }))
}

/// Serve the pre-serialized `{"pixels": {...}}` body — no map clone, no
/// re-serialization.
pub async fn get_canvas(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    state.observability.record_canvas_request();
    let (etag, json) = {
        let snapshot = state.board.read().await;
        (canvas_etag(snapshot.seq), snapshot.canvas_json.clone())
    };

    if if_none_match_matches(&headers, &etag) {
        return not_modified_response(CANVAS_CACHE_CONTROL, Some(etag.as_str()));
    }

    json_bytes_response((*json).clone(), CANVAS_CACHE_CONTROL, Some(etag.as_str()))
}

/// The dense 3-bytes-per-cell buffer, row-major, all-zero meaning
/// unpainted — the same shape the on-chain canvas read returns.
pub async fn get_canvas_raw(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> impl IntoResponse {
    state.observability.record_canvas_request();
    let (etag, raw) = {
        let snapshot = state.board.read().await;
        (canvas_etag(snapshot.seq), snapshot.canvas_raw.clone())
    };

    if if_none_match_matches(&headers, &etag) {
        return not_modified_response(CANVAS_CACHE_CONTROL, Some(etag.as_str()));
    }

    let mut response = Response::new(Body::from((*raw).clone()));
    let headers_mut = response.headers_mut();
    headers_mut.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/octet-stream"),
    );
    headers_mut.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static(CANVAS_CACHE_CONTROL),
    );
    if let Ok(etag_header) = HeaderValue::from_str(&etag) {
        headers_mut.insert(header::ETAG, etag_header);
    }
    response
}

pub async fn post_pixel(
    State(state): State<AppState>,
    Json(request): Json<SetPixelRequest>,
) -> Response {
    match state
        .apply_pixel(request.x, request.y, &request.color)
        .await
    {
        Ok(BoardAction::Painted { .. }) => {
            state.observability.record_pixel_painted();
            Json(serde_json::json!({ "ok": true })).into_response()
        }
        Ok(BoardAction::Erased { .. }) => {
            state.observability.record_pixel_erased();
            Json(serde_json::json!({ "ok": true })).into_response()
        }
        Err(e) => {
            state.observability.record_pixel_rejection();
            let status = match &e {
                BoardError::InvalidCoordinate { .. } | BoardError::InvalidColor { .. } => {
                    StatusCode::BAD_REQUEST
                }
                BoardError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
                BoardError::StorageUnavailable { .. } | BoardError::RemoteUnavailable { .. } => {
                    StatusCode::SERVICE_UNAVAILABLE
                }
            };
            (status, Json(serde_json::json!({ "error": e.to_string() }))).into_response()
        }
    }
}

pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    let (painted, seq) = {
        let snapshot = state.board.read().await;
        (snapshot.board.len(), snapshot.seq)
    };
    let body = render_prometheus_metrics(painted, seq, state.observability.snapshot());

    (
        [
            (header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE),
            (header::CACHE_CONTROL, "no-store"),
        ],
        body,
    )
}

fn render_prometheus_metrics(
    painted_pixels: usize,
    seq: u64,
    observability: ObservabilitySnapshot,
) -> String {
    let mut body = String::new();
    let _ = writeln!(
        body,
        "# HELP worldboard_painted_pixels Cells currently painted on the canvas."
    );
    let _ = writeln!(body, "# TYPE worldboard_painted_pixels gauge");
    let _ = writeln!(body, "worldboard_painted_pixels {painted_pixels}");

    let _ = writeln!(
        body,
        "# HELP worldboard_board_seq Sequence number of the live canvas."
    );
    let _ = writeln!(body, "# TYPE worldboard_board_seq gauge");
    let _ = writeln!(body, "worldboard_board_seq {seq}");

    let _ = writeln!(
        body,
        "# HELP worldboard_canvas_requests_total Total canvas reads served."
    );
    let _ = writeln!(body, "# TYPE worldboard_canvas_requests_total counter");
    let _ = writeln!(
        body,
        "worldboard_canvas_requests_total {}",
        observability.canvas_requests_total
    );

    let _ = writeln!(
        body,
        "# HELP worldboard_pixels_painted_total Total accepted paint writes."
    );
    let _ = writeln!(body, "# TYPE worldboard_pixels_painted_total counter");
    let _ = writeln!(
        body,
        "worldboard_pixels_painted_total {}",
        observability.pixels_painted_total
    );

    let _ = writeln!(
        body,
        "# HELP worldboard_pixels_erased_total Total accepted erase writes."
    );
    let _ = writeln!(body, "# TYPE worldboard_pixels_erased_total counter");
    let _ = writeln!(
        body,
        "worldboard_pixels_erased_total {}",
        observability.pixels_erased_total
    );

    let _ = writeln!(
        body,
        "# HELP worldboard_pixel_rejections_total Total rejected pixel writes."
    );
    let _ = writeln!(body, "# TYPE worldboard_pixel_rejections_total counter");
    let _ = writeln!(
        body,
        "worldboard_pixel_rejections_total {}",
        observability.pixel_rejections_total
    );

    let _ = writeln!(
        body,
        "# HELP worldboard_snapshots_persisted_total Total canvas snapshots written to the store."
    );
    let _ = writeln!(body, "# TYPE worldboard_snapshots_persisted_total counter");
    let _ = writeln!(
        body,
        "worldboard_snapshots_persisted_total {}",
        observability.snapshots_persisted_total
    );

    let _ = writeln!(
        body,
        "# HELP worldboard_snapshot_persist_failures_total Total failed snapshot writes."
    );
    let _ = writeln!(
        body,
        "# TYPE worldboard_snapshot_persist_failures_total counter"
    );
    let _ = writeln!(
        body,
        "worldboard_snapshot_persist_failures_total {}",
        observability.snapshot_persist_failures_total
    );

    body
}

fn canvas_etag(seq: u64) -> String {
    format!("\"canvas-{seq}\"")
}

fn json_bytes_response(body: Bytes, cache_control: &'static str, etag: Option<&str>) -> Response {
    let mut response = Response::new(Body::from(body));
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static(cache_control),
    );
    if let Some(etag) = etag
        && let Ok(etag_header) = HeaderValue::from_str(etag)
    {
        headers.insert(header::ETAG, etag_header);
    }
    response
}

fn not_modified_response(cache_control: &'static str, etag: Option<&str>) -> Response {
    let mut response = StatusCode::NOT_MODIFIED.into_response();
    let headers = response.headers_mut();
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static(cache_control),
    );
    if let Some(etag) = etag
        && let Ok(etag_header) = HeaderValue::from_str(etag)
    {
        headers.insert(header::ETAG, etag_header);
    }
    response
}

fn normalize_etag(candidate: &str) -> &str {
    candidate.strip_prefix("W/").unwrap_or(candidate).trim()
}

fn if_none_match_matches(headers: &HeaderMap, etag: &str) -> bool {
    let Some(value) = headers.get(header::IF_NONE_MATCH) else {
        return false;
    };
    let Ok(raw) = value.to_str() else {
        return false;
    };

    raw.split(',').any(|candidate| {
        let candidate = candidate.trim();
        candidate == "*" || normalize_etag(candidate) == normalize_etag(etag)
    })
}
