use serde::Deserialize;
use worldboard_shared::board::PixelMap;
use worldboard_shared::codec;
use worldboard_shared::error::BoardError;
use worldboard_shared::grid::WorldGrid;

/// Failure talking to the remote pixel store. `Rejected` carries the
/// server's reason for a refused write; `Unavailable` is transport or
/// server trouble and the caller is expected to refresh, not retry.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientError {
    Rejected { message: String },
    Unavailable { reason: String },
}

impl std::fmt::Display for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rejected { message } => write!(f, "pixel rejected: {message}"),
            Self::Unavailable { reason } => write!(f, "canvas API unavailable: {reason}"),
        }
    }
}

impl std::error::Error for ClientError {}

impl From<ClientError> for BoardError {
    fn from(e: ClientError) -> Self {
        BoardError::RemoteUnavailable {
            reason: e.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CanvasResponse {
    #[serde(default)]
    pixels: PixelMap,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    error: String,
}

/// Client for the remote pixel store's REST surface.
#[derive(Debug, Clone)]
pub struct CanvasApi {
    base_url: String,
    http: reqwest::Client,
}

impl CanvasApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, reqwest::Client::new())
    }

    pub fn with_client(base_url: impl Into<String>, http: reqwest::Client) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { base_url, http }
    }

    /// Fetch the full sparse canvas.
    pub async fn fetch_canvas(&self) -> Result<PixelMap, ClientError> {
        let response = self
            .http
            .get(format!("{}/api/canvas", self.base_url))
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(ClientError::Unavailable {
                reason: format!("canvas fetch returned {}", response.status()),
            });
        }

        let canvas: CanvasResponse = response.json().await.map_err(transport_error)?;
        Ok(canvas.pixels)
    }

    /// Fetch the dense buffer and decode it — the same canvas the chain
    /// read returns, served off-chain.
    pub async fn fetch_canvas_dense(&self, grid: WorldGrid) -> Result<PixelMap, ClientError> {
        let response = self
            .http
            .get(format!("{}/api/canvas/raw", self.base_url))
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(ClientError::Unavailable {
                reason: format!("raw canvas fetch returned {}", response.status()),
            });
        }

        let buf = response.bytes().await.map_err(transport_error)?;
        Ok(codec::decode_canvas(&buf, grid))
    }

    /// Write one pixel. The zero color erases on the server side.
    pub async fn set_pixel(&self, x: i64, y: i64, color: &str) -> Result<(), ClientError> {
        let response = self
            .http
            .post(format!("{}/api/pixel", self.base_url))
            .json(&serde_json::json!({ "x": x, "y": y, "color": color }))
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        if status.is_client_error() {
            let body: ErrorResponse = response.json().await.unwrap_or(ErrorResponse {
                error: String::new(),
            });
            let message = if body.error.is_empty() {
                format!("rejected with {status}")
            } else {
                body.error
            };
            return Err(ClientError::Rejected { message });
        }

        Err(ClientError::Unavailable {
            reason: format!("pixel write returned {status}"),
        })
    }
}

fn transport_error(e: reqwest::Error) -> ClientError {
    ClientError::Unavailable {
        reason: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::{CanvasApi, ClientError};
    use crate::sync;
    use std::net::SocketAddr;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use axum::Json;
    use axum::extract::State;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use worldboard_shared::board::PixelBoard;
    use worldboard_shared::codec;
    use worldboard_shared::error::BoardError;
    use worldboard_shared::grid::WorldGrid;

    type Fixture = Arc<Mutex<PixelBoard>>;

    async fn fixture_canvas(State(board): State<Fixture>) -> Json<serde_json::Value> {
        let board = board.lock().unwrap();
        Json(serde_json::json!({ "pixels": board.pixels() }))
    }

    async fn fixture_canvas_raw(State(board): State<Fixture>) -> impl IntoResponse {
        let board = board.lock().unwrap();
        codec::encode_canvas(board.pixels(), board.grid())
    }

    async fn fixture_pixel(
        State(board): State<Fixture>,
        Json(request): Json<serde_json::Value>,
    ) -> impl IntoResponse {
        let x = request["x"].as_i64().unwrap_or(-1);
        let y = request["y"].as_i64().unwrap_or(-1);
        let color = request["color"].as_str().unwrap_or("");

        let mut board = board.lock().unwrap();
        match board.apply(x, y, color) {
            Ok(_) => (StatusCode::OK, Json(serde_json::json!({ "ok": true }))),
            Err(e) => (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({ "error": e.to_string() })),
            ),
        }
    }

    async fn spawn_fixture() -> (SocketAddr, Fixture, tokio::task::JoinHandle<()>) {
        let board: Fixture = Arc::new(Mutex::new(PixelBoard::new(WorldGrid::canvas())));
        let app = axum::Router::new()
            .route("/api/canvas", axum::routing::get(fixture_canvas))
            .route("/api/canvas/raw", axum::routing::get(fixture_canvas_raw))
            .route("/api/pixel", axum::routing::post(fixture_pixel))
            .with_state(board.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fixture listener");
        let addr = listener.local_addr().expect("fixture address");
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve fixture");
        });
        (addr, board, handle)
    }

    #[tokio::test]
    async fn set_then_fetch_round_trips() {
        let (addr, _board, server) = spawn_fixture().await;
        let api = CanvasApi::new(format!("http://{addr}/"));

        assert!(api.fetch_canvas().await.unwrap().is_empty());

        api.set_pixel(5, 5, "#ff0000").await.unwrap();
        let pixels = api.fetch_canvas().await.unwrap();
        assert_eq!(pixels.get("5:5").map(String::as_str), Some("#ff0000"));

        // Erase through the zero color removes the key remotely too.
        api.set_pixel(5, 5, "#000000").await.unwrap();
        assert!(api.fetch_canvas().await.unwrap().is_empty());

        server.abort();
        let _ = server.await;
    }

    #[tokio::test]
    async fn rejections_carry_the_server_reason() {
        let (addr, _board, server) = spawn_fixture().await;
        let api = CanvasApi::new(format!("http://{addr}"));

        let err = api.set_pixel(64, 0, "#ff0000").await.unwrap_err();
        assert_eq!(
            err,
            ClientError::Rejected {
                message: "cell (64, 0) is outside the grid".to_string()
            }
        );

        let err = api.set_pixel(1, 1, "red").await.unwrap_err();
        assert!(matches!(err, ClientError::Rejected { .. }));

        server.abort();
        let _ = server.await;
    }

    #[tokio::test]
    async fn dense_fetch_decodes_through_the_codec() {
        let (addr, board, server) = spawn_fixture().await;
        let api = CanvasApi::new(format!("http://{addr}"));

        board.lock().unwrap().apply(9, 7, "#22c55e").unwrap();

        let pixels = api.fetch_canvas_dense(WorldGrid::canvas()).await.unwrap();
        assert_eq!(pixels.len(), 1);
        assert_eq!(pixels.get("9:7").map(String::as_str), Some("#22c55e"));

        server.abort();
        let _ = server.await;
    }

    #[tokio::test]
    async fn transport_failures_surface_as_unavailable() {
        let api = CanvasApi::new("http://127.0.0.1:1");
        let err = api.fetch_canvas().await.unwrap_err();
        assert!(matches!(err, ClientError::Unavailable { .. }));

        let board_err: BoardError = err.into();
        assert!(matches!(board_err, BoardError::RemoteUnavailable { .. }));
    }

    #[tokio::test]
    async fn poller_publishes_full_refreshes() {
        let (addr, board, server) = spawn_fixture().await;
        let api = CanvasApi::new(format!("http://{addr}"));

        let (tx, mut rx) = tokio::sync::watch::channel(Default::default());
        let poller = tokio::spawn(sync::run(api, Duration::from_millis(20), tx));

        // First poll delivers the empty canvas.
        tokio::time::timeout(Duration::from_secs(2), rx.changed())
            .await
            .expect("first poll in time")
            .expect("poller alive");
        assert!(rx.borrow().is_empty());

        board.lock().unwrap().apply(3, 4, "#3b82f6").unwrap();

        let painted = tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                rx.changed().await.expect("poller alive");
                let pixels = rx.borrow_and_update().clone();
                if !pixels.is_empty() {
                    break pixels;
                }
            }
        })
        .await
        .expect("refresh in time");
        assert_eq!(painted.get("3:4").map(String::as_str), Some("#3b82f6"));

        poller.abort();
        server.abort();
        let _ = poller.await;
        let _ = server.await;
    }
}
