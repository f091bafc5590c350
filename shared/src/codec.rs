use crate::board::PixelMap;
use crate::color::{Rgb, parse_hex};
use crate::grid::{PixelCell, WorldGrid};

/// Encode the sparse map as the dense canvas buffer: 3 bytes per cell in
/// row-major order, the all-zero triplet meaning "unpainted". Entries with
/// malformed keys or colors are skipped, as are cells outside the grid.
pub fn encode_canvas(pixels: &PixelMap, grid: WorldGrid) -> Vec<u8> {
    let mut buf = vec![0u8; grid.cell_count() * 3];

    for (key, color) in pixels {
        let Some(cell) = PixelCell::parse_key(key) else {
            continue;
        };
        if !grid.contains(cell.x as i64, cell.y as i64) {
            continue;
        }
        let Ok(Rgb { r, g, b }) = parse_hex(color) else {
            continue;
        };

        let offset = (cell.y as usize * grid.width as usize + cell.x as usize) * 3;
        buf[offset] = r;
        buf[offset + 1] = g;
        buf[offset + 2] = b;
    }

    buf
}

/// Decode a dense canvas buffer back into the sparse map, skipping
/// all-zero triplets. A buffer shorter than the grid decodes to an empty
/// map; trailing bytes beyond the grid are ignored.
pub fn decode_canvas(buf: &[u8], grid: WorldGrid) -> PixelMap {
    let mut pixels = PixelMap::new();
    if buf.len() < grid.cell_count() * 3 {
        return pixels;
    }

    for y in 0..grid.height {
        for x in 0..grid.width {
            let offset = (y as usize * grid.width as usize + x as usize) * 3;
            let rgb = Rgb::new(buf[offset], buf[offset + 1], buf[offset + 2]);
            if rgb.is_zero() {
                continue;
            }
            pixels.insert(PixelCell::new(x, y).key(), rgb.to_hex());
        }
    }

    pixels
}

/// CRC32 of an already-encoded dense buffer.
pub fn buffer_fingerprint(buf: &[u8]) -> u32 {
    crc32fast::hash(buf)
}

/// CRC32 of the dense buffer. Two boards fingerprint equal exactly when
/// they paint the same cells the same colors.
pub fn canvas_fingerprint(pixels: &PixelMap, grid: WorldGrid) -> u32 {
    buffer_fingerprint(&encode_canvas(pixels, grid))
}
