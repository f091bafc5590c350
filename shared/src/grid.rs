use serde::{Deserialize, Serialize};

/// Default world board dimensions. 2048x1024 keeps the full board well
/// within browser canvas limits while pixels stay visible at street zoom.
pub const WORLD_PIXEL_WIDTH: u32 = 2048;
pub const WORLD_PIXEL_HEIGHT: u32 = 1024;

/// Latitude band covered by the world board. Web-mercator tiles degrade
/// near the poles, so the board stops at ±82°.
pub const WORLD_MIN_LATITUDE: f64 = -82.0;
pub const WORLD_MAX_LATITUDE: f64 = 82.0;

/// Side length of the small standalone canvas grid.
pub const CANVAS_GRID_SIZE: u32 = 64;

/// A fixed-size pixel grid mapped onto a longitude span of 360° and a
/// configurable latitude band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorldGrid {
    pub width: u32,
    pub height: u32,
    pub min_lat: f64,
    pub max_lat: f64,
}

/// A single addressable grid unit. Serialized as the string key `"x:y"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PixelCell {
    pub x: u32,
    pub y: u32,
}

/// Geographic rectangle covered by one cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoBounds {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl PixelCell {
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// Storage/wire key for this cell.
    pub fn key(&self) -> String {
        format!("{}:{}", self.x, self.y)
    }

    /// Parse an `"x:y"` key. Returns `None` for anything malformed.
    pub fn parse_key(key: &str) -> Option<Self> {
        let (x, y) = key.split_once(':')?;
        Some(Self {
            x: x.parse().ok()?,
            y: y.parse().ok()?,
        })
    }
}

impl GeoBounds {
    /// Center point as `(lat, lng)`.
    pub fn centroid(&self) -> (f64, f64) {
        (
            (self.north + self.south) / 2.0,
            (self.east + self.west) / 2.0,
        )
    }
}

/// Wrap a longitude into [-180, 180). Exactly 180° lands on the wrap
/// boundary and normalizes to -180° so it never produces an out-of-range
/// column index.
pub fn normalize_longitude(longitude: f64) -> f64 {
    let wrapped = (longitude + 180.0).rem_euclid(360.0) - 180.0;
    if wrapped >= 180.0 { -180.0 } else { wrapped }
}

impl WorldGrid {
    pub const fn new(width: u32, height: u32, min_lat: f64, max_lat: f64) -> Self {
        Self {
            width,
            height,
            min_lat,
            max_lat,
        }
    }

    /// The full world board.
    pub const fn world() -> Self {
        Self::new(
            WORLD_PIXEL_WIDTH,
            WORLD_PIXEL_HEIGHT,
            WORLD_MIN_LATITUDE,
            WORLD_MAX_LATITUDE,
        )
    }

    /// The standalone 64x64 canvas.
    pub const fn canvas() -> Self {
        Self::new(
            CANVAS_GRID_SIZE,
            CANVAS_GRID_SIZE,
            WORLD_MIN_LATITUDE,
            WORLD_MAX_LATITUDE,
        )
    }

    pub const fn cell_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Whether signed indices fall inside the grid.
    pub const fn contains(&self, x: i64, y: i64) -> bool {
        x >= 0 && x < self.width as i64 && y >= 0 && y < self.height as i64
    }

    /// Map a geographic point to its grid cell. Longitude wraps, latitude
    /// clamps into the band; total and pure, never fails.
    pub fn cell_at(&self, lat: f64, lng: f64) -> PixelCell {
        let lng = normalize_longitude(lng);
        let lat = lat.clamp(self.min_lat, self.max_lat);

        let x = (((lng + 180.0) / 360.0) * self.width as f64).floor() as i64;
        let y = (((self.max_lat - lat) / (self.max_lat - self.min_lat)) * self.height as f64)
            .floor() as i64;

        PixelCell {
            x: x.clamp(0, self.width as i64 - 1) as u32,
            y: y.clamp(0, self.height as i64 - 1) as u32,
        }
    }

    /// Geographic rectangle a cell covers. Inverse of [`cell_at`]: the
    /// centroid of a cell's bounds maps back to the same cell.
    ///
    /// [`cell_at`]: WorldGrid::cell_at
    pub fn cell_bounds(&self, cell: PixelCell) -> GeoBounds {
        let lat_span = self.max_lat - self.min_lat;
        let h = self.height as f64;
        let w = self.width as f64;

        GeoBounds {
            north: self.max_lat - (cell.y as f64 / h) * lat_span,
            south: self.max_lat - ((cell.y + 1) as f64 / h) * lat_span,
            west: (cell.x as f64 / w) * 360.0 - 180.0,
            east: ((cell.x + 1) as f64 / w) * 360.0 - 180.0,
        }
    }
}
