use crate::board::PixelMap;
use crate::grid::WorldGrid;

/// Token in an artwork row that leaves the cell unpainted.
pub const TRANSPARENT_TOKEN: char = '.';

/// A built-in artwork stamped onto the board around a geographic anchor.
/// Rows are palette tokens; each token becomes a `scale`x`scale` block of
/// cells.
#[derive(Debug, Clone, Copy)]
pub struct SeedArtwork {
    pub name: &'static str,
    /// `(lat, lng)` anchor; the artwork is centered on its cell.
    pub center: (f64, f64),
    pub scale: u32,
    pub palette: &'static [(char, &'static str)],
    pub rows: &'static [&'static str],
}

/// The artworks an empty board starts with.
pub const BUILTIN_ARTWORKS: &[SeedArtwork] = &[
    SeedArtwork {
        name: "heart",
        center: (48.8566, 2.3522),
        scale: 2,
        palette: &[('r', "#fb7185")],
        rows: &[
            "..rr..rr..",
            ".rrrrrrrr.",
            ".rrrrrrrr.",
            "..rrrrrr..",
            "...rrrr...",
            "....rr....",
        ],
    },
    SeedArtwork {
        name: "smile",
        center: (35.6764, 139.65),
        scale: 2,
        palette: &[('y', "#facc15"), ('b', "#0f172a")],
        rows: &[
            "..yyyyyy..",
            ".yyyyyyyy.",
            "yybyyyybyy",
            "yyyyyyyyyy",
            "yybyyyybyy",
            "yyybbbbyyy",
            ".yyyyyyyy.",
            "..yyyyyy..",
        ],
    },
    SeedArtwork {
        name: "diamond",
        center: (40.7128, -74.006),
        scale: 2,
        palette: &[('c', "#06b6d4"), ('w', "#f8fafc")],
        rows: &[
            "....c....",
            "...ccc...",
            "..ccwcc..",
            ".ccwwwcc.",
            "..ccwcc..",
            "...ccc...",
            "....c....",
        ],
    },
];

/// Stamp one artwork into the map. Transparent and unknown tokens are
/// skipped; cells that land outside the grid are dropped.
pub fn stamp_artwork(pixels: &mut PixelMap, artwork: &SeedArtwork, grid: WorldGrid) {
    let color_for = |token: char| {
        artwork
            .palette
            .iter()
            .find(|(t, _)| *t == token)
            .map(|(_, color)| *color)
    };

    let scale = artwork.scale.max(1) as i64;
    let rows = artwork.rows.len() as i64;
    let cols = artwork
        .rows
        .iter()
        .map(|row| row.chars().count())
        .max()
        .unwrap_or(0) as i64;

    let center = grid.cell_at(artwork.center.0, artwork.center.1);
    let top_left_x = center.x as i64 - (cols * scale) / 2;
    let top_left_y = center.y as i64 - (rows * scale) / 2;

    for (row_index, row) in artwork.rows.iter().enumerate() {
        for (col_index, token) in row.chars().enumerate() {
            if token == TRANSPARENT_TOKEN {
                continue;
            }
            let Some(color) = color_for(token) else {
                continue;
            };

            for step_y in 0..scale {
                for step_x in 0..scale {
                    let x = top_left_x + col_index as i64 * scale + step_x;
                    let y = top_left_y + row_index as i64 * scale + step_y;
                    if grid.contains(x, y) {
                        pixels.insert(format!("{x}:{y}"), color.to_string());
                    }
                }
            }
        }
    }
}

/// The full starting board: every built-in artwork stamped onto the grid.
pub fn seeded_pixels(grid: WorldGrid) -> PixelMap {
    let mut pixels = PixelMap::new();
    for artwork in BUILTIN_ARTWORKS {
        stamp_artwork(&mut pixels, artwork, grid);
    }
    pixels
}
