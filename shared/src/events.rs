use serde::{Deserialize, Serialize};

use crate::board::{BoardAction, PixelMap};

/// Wire events for live canvas consumers: a full snapshot on connect (or
/// resync), then one update per applied pixel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PixelEvent {
    Snapshot {
        #[serde(default)]
        seq: u64,
        pixels: PixelMap,
        timestamp: String,
    },
    Update {
        #[serde(default)]
        seq: u64,
        changes: Vec<PixelChange>,
        timestamp: String,
    },
}

/// One applied change. `color: None` means the cell was erased.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PixelChange {
    pub x: u32,
    pub y: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous: Option<String>,
}

impl From<&BoardAction> for PixelChange {
    fn from(action: &BoardAction) -> Self {
        match action {
            BoardAction::Painted {
                cell,
                color,
                previous,
            } => Self {
                x: cell.x,
                y: cell.y,
                color: Some(color.clone()),
                previous: previous.clone(),
            },
            BoardAction::Erased { cell, previous } => Self {
                x: cell.x,
                y: cell.y,
                color: None,
                previous: previous.clone(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{PixelChange, PixelEvent};
    use crate::board::{BoardAction, PixelMap};
    use crate::grid::PixelCell;

    #[test]
    fn events_tag_by_type() {
        let snapshot = PixelEvent::Snapshot {
            seq: 3,
            pixels: PixelMap::new(),
            timestamp: "2026-01-01T00:00:00Z".to_string(),
        };
        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(json.contains("\"type\":\"Snapshot\""));

        let update = PixelEvent::Update {
            seq: 4,
            changes: vec![PixelChange {
                x: 5,
                y: 5,
                color: None,
                previous: Some("#ff0000".to_string()),
            }],
            timestamp: "2026-01-01T00:00:01Z".to_string(),
        };
        let json = serde_json::to_string(&update).unwrap();
        assert!(json.contains("\"type\":\"Update\""));
        assert!(!json.contains("\"color\""));

        let parsed: PixelEvent = serde_json::from_str(&json).unwrap();
        match parsed {
            PixelEvent::Update { changes, .. } => assert_eq!(changes[0].color, None),
            other => panic!("expected update, got {other:?}"),
        }
    }

    #[test]
    fn changes_capture_paints_and_erasures() {
        let painted = BoardAction::Painted {
            cell: PixelCell::new(1, 2),
            color: "#22c55e".to_string(),
            previous: None,
        };
        assert_eq!(
            PixelChange::from(&painted),
            PixelChange {
                x: 1,
                y: 2,
                color: Some("#22c55e".to_string()),
                previous: None,
            }
        );

        let erased = BoardAction::Erased {
            cell: PixelCell::new(3, 4),
            previous: Some("#22c55e".to_string()),
        };
        assert_eq!(
            PixelChange::from(&erased),
            PixelChange {
                x: 3,
                y: 4,
                color: None,
                previous: Some("#22c55e".to_string()),
            }
        );
    }
}
