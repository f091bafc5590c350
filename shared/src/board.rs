use std::collections::HashMap;

use crate::color::{self, ERASE_COLOR};
use crate::error::BoardError;
use crate::grid::{PixelCell, WorldGrid};

/// Sparse canvas: `"x:y"` cell key to lowercase `#rrggbb` color. Absence
/// of a key means the cell is unpainted.
pub type PixelMap = HashMap<String, String>;

/// Outcome of applying one color to one cell.
#[derive(Debug, Clone, PartialEq)]
pub enum BoardAction {
    Painted {
        cell: PixelCell,
        color: String,
        previous: Option<String>,
    },
    Erased {
        cell: PixelCell,
        previous: Option<String>,
    },
}

impl BoardAction {
    pub fn cell(&self) -> PixelCell {
        match self {
            Self::Painted { cell, .. } | Self::Erased { cell, .. } => *cell,
        }
    }

    /// Whether the map actually changed.
    pub fn changed(&self) -> bool {
        match self {
            Self::Painted {
                color, previous, ..
            } => previous.as_deref() != Some(color),
            Self::Erased { previous, .. } => previous.is_some(),
        }
    }
}

/// A pixel map bound to the grid that validates writes into it.
#[derive(Debug, Clone)]
pub struct PixelBoard {
    grid: WorldGrid,
    pixels: PixelMap,
}

impl PixelBoard {
    pub fn new(grid: WorldGrid) -> Self {
        Self {
            grid,
            pixels: PixelMap::new(),
        }
    }

    pub fn from_pixels(grid: WorldGrid, pixels: PixelMap) -> Self {
        Self { grid, pixels }
    }

    pub fn grid(&self) -> WorldGrid {
        self.grid
    }

    pub fn pixels(&self) -> &PixelMap {
        &self.pixels
    }

    pub fn into_pixels(self) -> PixelMap {
        self.pixels
    }

    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    pub fn color_at(&self, cell: PixelCell) -> Option<&str> {
        self.pixels.get(&cell.key()).map(String::as_str)
    }

    /// Apply one color to one cell. The zero color `#000000` erases the
    /// key instead of storing a literal black pixel. Coordinates and color
    /// are validated before anything mutates.
    pub fn apply(&mut self, x: i64, y: i64, value: &str) -> Result<BoardAction, BoardError> {
        if !self.grid.contains(x, y) {
            return Err(BoardError::InvalidCoordinate { x, y });
        }
        let cell = PixelCell::new(x as u32, y as u32);
        let color = color::normalize_hex(value)?;

        if color == ERASE_COLOR {
            Ok(self.erase(cell))
        } else {
            let previous = self.pixels.insert(cell.key(), color.clone());
            Ok(BoardAction::Painted {
                cell,
                color,
                previous,
            })
        }
    }

    /// Remove a cell's color. Erasing an unpainted cell is a no-op.
    pub fn erase(&mut self, cell: PixelCell) -> BoardAction {
        BoardAction::Erased {
            previous: self.pixels.remove(&cell.key()),
            cell,
        }
    }
}

/// JSON-encode the map for whole-value storage.
pub fn encode_stored_pixels(pixels: &PixelMap) -> Result<String, BoardError> {
    serde_json::to_string(pixels).map_err(|e| BoardError::StorageUnavailable {
        reason: format!("encode pixel map: {e}"),
    })
}

/// Parse a persisted pixel map. Anything unparseable degrades to an empty
/// map; non-string entries are dropped. Loading never fails.
pub fn parse_stored_pixels(raw: &str) -> PixelMap {
    let Ok(value) = serde_json::from_str::<HashMap<String, serde_json::Value>>(raw) else {
        return PixelMap::new();
    };

    value
        .into_iter()
        .filter_map(|(key, value)| match value {
            serde_json::Value::String(color) => Some((key, color)),
            _ => None,
        })
        .collect()
}
