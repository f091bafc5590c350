use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use chrono::Utc;
use tokio::sync::{RwLock, broadcast};
use tracing::warn;
use worldboard_shared::board::{BoardAction, PixelBoard};
use worldboard_shared::codec;
use worldboard_shared::error::BoardError;
use worldboard_shared::events::{PixelChange, PixelEvent};
use worldboard_shared::grid::WorldGrid;
use worldboard_shared::store::KeyValueStore;

use crate::config::event_broadcast_buffer;

pub type SharedStore = Arc<dyn KeyValueStore + Send + Sync>;

/// Pre-serialized SSE event — serialized once by the writer, shared by all
/// subscribers via Arc.
#[derive(Debug, Clone)]
pub enum PreSerializedEvent {
    Snapshot { seq: u64, json: Arc<Bytes> },
    Update { seq: u64, json: Arc<Bytes> },
}

/// The live canvas plus every payload shape it is served as, so request
/// handlers never re-serialize.
#[derive(Debug, Clone)]
pub struct BoardSnapshot {
    pub seq: u64,
    pub timestamp: String,
    pub board: PixelBoard,
    /// `{"pixels": {...}}` — the GET /api/canvas body.
    pub canvas_json: Arc<Bytes>,
    /// The SSE snapshot event payload.
    pub snapshot_json: Arc<Bytes>,
    /// Dense 3-bytes-per-cell buffer — the GET /api/canvas/raw body.
    pub canvas_raw: Arc<Bytes>,
    pub fingerprint: u32,
}

impl BoardSnapshot {
    pub fn build(seq: u64, timestamp: String, board: PixelBoard) -> Option<Self> {
        let pixels_vec = match serde_json::to_vec(board.pixels()) {
            Ok(json) => json,
            Err(e) => {
                warn!("failed to serialize pixel map: {e}");
                return None;
            }
        };
        let timestamp_json = match serde_json::to_string(&timestamp) {
            Ok(json) => json,
            Err(e) => {
                warn!("failed to serialize snapshot timestamp: {e}");
                return None;
            }
        };
        let seq_json = seq.to_string();

        let mut canvas_buf = Vec::with_capacity(pixels_vec.len() + 16);
        canvas_buf.extend_from_slice(b"{\"pixels\":");
        canvas_buf.extend_from_slice(&pixels_vec);
        canvas_buf.push(b'}');

        let mut snapshot_buf = Vec::with_capacity(pixels_vec.len() + 96);
        snapshot_buf.extend_from_slice(b"{\"type\":\"Snapshot\",\"seq\":");
        snapshot_buf.extend_from_slice(seq_json.as_bytes());
        snapshot_buf.extend_from_slice(b",\"pixels\":");
        snapshot_buf.extend_from_slice(&pixels_vec);
        snapshot_buf.extend_from_slice(b",\"timestamp\":");
        snapshot_buf.extend_from_slice(timestamp_json.as_bytes());
        snapshot_buf.push(b'}');

        let raw = codec::encode_canvas(board.pixels(), board.grid());
        let fingerprint = codec::buffer_fingerprint(&raw);

        Some(Self {
            seq,
            timestamp,
            board,
            canvas_json: Arc::new(Bytes::from(canvas_buf)),
            snapshot_json: Arc::new(Bytes::from(snapshot_buf)),
            canvas_raw: Arc::new(Bytes::from(raw)),
            fingerprint,
        })
    }

    fn empty(grid: WorldGrid) -> Self {
        Self::build(0, Utc::now().to_rfc3339(), PixelBoard::new(grid)).unwrap_or_else(|| {
            // An empty map always serializes; this is unreachable in practice.
            let zeroed = vec![0u8; grid.cell_count() * 3];
            Self {
                seq: 0,
                timestamp: String::new(),
                board: PixelBoard::new(grid),
                canvas_json: Arc::new(Bytes::from_static(b"{\"pixels\":{}}")),
                snapshot_json: Arc::new(Bytes::new()),
                canvas_raw: Arc::new(Bytes::from(zeroed.clone())),
                fingerprint: codec::buffer_fingerprint(&zeroed),
            }
        })
    }
}

#[derive(Clone)]
pub struct AppState {
    pub board: Arc<RwLock<BoardSnapshot>>,
    pub grid: WorldGrid,
    pub next_seq: Arc<AtomicU64>,
    pub event_tx: broadcast::Sender<PreSerializedEvent>,
    pub store: SharedStore,
    pub observability: Arc<ObservabilityCounters>,
}

impl AppState {
    pub fn new(grid: WorldGrid, board: PixelBoard, store: SharedStore) -> Self {
        let (event_tx, _) = broadcast::channel(event_broadcast_buffer());
        let snapshot = BoardSnapshot::build(0, Utc::now().to_rfc3339(), board)
            .unwrap_or_else(|| BoardSnapshot::empty(grid));

        Self {
            board: Arc::new(RwLock::new(snapshot)),
            grid,
            next_seq: Arc::new(AtomicU64::new(0)),
            event_tx,
            store,
            observability: Arc::new(ObservabilityCounters::default()),
        }
    }

    /// Apply one pixel write: validate, mutate the board behind the write
    /// lock, refresh the pre-serialized payloads, broadcast the update.
    /// No-op writes (same color, erase of an unpainted cell) change
    /// nothing and emit nothing.
    pub async fn apply_pixel(&self, x: i64, y: i64, color: &str) -> Result<BoardAction, BoardError> {
        let mut snapshot = self.board.write().await;

        let mut board = snapshot.board.clone();
        let action = board.apply(x, y, color)?;
        if !action.changed() {
            return Ok(action);
        }

        let Some(seq) = self.next_seq.load(Ordering::Relaxed).checked_add(1) else {
            warn!("sequence counter overflow; dropping pixel write");
            return Err(BoardError::RemoteUnavailable {
                reason: "sequence counter exhausted".to_string(),
            });
        };
        let timestamp = Utc::now().to_rfc3339();

        let Some(rebuilt) = BoardSnapshot::build(seq, timestamp.clone(), board) else {
            return Err(BoardError::RemoteUnavailable {
                reason: "failed to serialize canvas".to_string(),
            });
        };
        *snapshot = rebuilt;
        self.next_seq.store(seq, Ordering::Relaxed);
        drop(snapshot);

        match serialize_update_event(seq, &action, &timestamp) {
            Some(json) => {
                let _ = self.event_tx.send(PreSerializedEvent::Update { seq, json });
            }
            None => warn!(seq, "failed to serialize update event; skipping broadcast"),
        }

        Ok(action)
    }
}

fn serialize_update_event(seq: u64, action: &BoardAction, timestamp: &str) -> Option<Arc<Bytes>> {
    let event = PixelEvent::Update {
        seq,
        changes: vec![PixelChange::from(action)],
        timestamp: timestamp.to_string(),
    };
    match serde_json::to_vec(&event) {
        Ok(json) => Some(Arc::new(Bytes::from(json))),
        Err(e) => {
            warn!("failed to serialize pixel update event: {e}");
            None
        }
    }
}

#[derive(Debug, Default)]
pub struct ObservabilityCounters {
    canvas_requests_total: AtomicU64,
    pixels_painted_total: AtomicU64,
    pixels_erased_total: AtomicU64,
    pixel_rejections_total: AtomicU64,
    snapshots_persisted_total: AtomicU64,
    snapshot_persist_failures_total: AtomicU64,
}

#[derive(Debug, Clone, Copy)]
pub struct ObservabilitySnapshot {
    pub canvas_requests_total: u64,
    pub pixels_painted_total: u64,
    pub pixels_erased_total: u64,
    pub pixel_rejections_total: u64,
    pub snapshots_persisted_total: u64,
    pub snapshot_persist_failures_total: u64,
}

impl ObservabilityCounters {
    pub fn snapshot(&self) -> ObservabilitySnapshot {
        ObservabilitySnapshot {
            canvas_requests_total: self.canvas_requests_total.load(Ordering::Relaxed),
            pixels_painted_total: self.pixels_painted_total.load(Ordering::Relaxed),
            pixels_erased_total: self.pixels_erased_total.load(Ordering::Relaxed),
            pixel_rejections_total: self.pixel_rejections_total.load(Ordering::Relaxed),
            snapshots_persisted_total: self.snapshots_persisted_total.load(Ordering::Relaxed),
            snapshot_persist_failures_total: self
                .snapshot_persist_failures_total
                .load(Ordering::Relaxed),
        }
    }

    pub fn record_canvas_request(&self) {
        self.canvas_requests_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_pixel_painted(&self) {
        self.pixels_painted_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_pixel_erased(&self) {
        self.pixels_erased_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_pixel_rejection(&self) {
        self.pixel_rejections_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_snapshot_persisted(&self) {
        self.snapshots_persisted_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_snapshot_persist_failure(&self) {
        self.snapshot_persist_failures_total
            .fetch_add(1, Ordering::Relaxed);
    }
}
