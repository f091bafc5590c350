use crate::error::BoardError;

/// The zero color. Painting it erases the cell instead of storing a
/// literal black pixel, matching the all-zero "unpainted" triplet of the
/// dense canvas encoding.
pub const ERASE_COLOR: &str = "#000000";

/// An RGB triplet, the dense-canvas form of a color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub const fn is_zero(&self) -> bool {
        self.r == 0 && self.g == 0 && self.b == 0
    }

    /// Lowercase `#rrggbb` form, the canonical stored representation.
    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Parse a `#rrggbb` color. Accepts either case, rejects everything that
/// does not match `^#[0-9A-Fa-f]{6}$`.
pub fn parse_hex(value: &str) -> Result<Rgb, BoardError> {
    let invalid = || BoardError::InvalidColor {
        value: value.to_string(),
    };

    let digits = value.strip_prefix('#').ok_or_else(invalid)?;
    if digits.len() != 6 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(invalid());
    }

    let channel = |range| u8::from_str_radix(&digits[range], 16).map_err(|_| invalid());
    Ok(Rgb {
        r: channel(0..2)?,
        g: channel(2..4)?,
        b: channel(4..6)?,
    })
}

/// Validate and normalize a color to its lowercase stored form.
pub fn normalize_hex(value: &str) -> Result<String, BoardError> {
    parse_hex(value).map(|rgb| rgb.to_hex())
}
