use serde::Serialize;

/// Every recoverable failure the board surfaces. All of these are caught
/// at the boundary where they occur and rendered as a status message for
/// the user; none are fatal.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind")]
pub enum BoardError {
    /// Grid indices outside `[0, width) x [0, height)`.
    InvalidCoordinate { x: i64, y: i64 },
    /// A color string that does not match `#rrggbb`.
    InvalidColor { value: String },
    /// A paint attempt while the session has no charges left.
    RateLimited { retry_after_secs: u64 },
    /// The persistent key-value store failed a read or write.
    StorageUnavailable { reason: String },
    /// The remote pixel store (or payment collaborator) failed.
    RemoteUnavailable { reason: String },
}

impl std::fmt::Display for BoardError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidCoordinate { x, y } => {
                write!(f, "cell ({x}, {y}) is outside the grid")
            }
            Self::InvalidColor { value } => {
                write!(f, "invalid color {value:?} (use #rrggbb)")
            }
            Self::RateLimited { retry_after_secs } => {
                write!(f, "out of charges; next charge in {retry_after_secs}s")
            }
            Self::StorageUnavailable { reason } => {
                write!(f, "storage unavailable: {reason}")
            }
            Self::RemoteUnavailable { reason } => {
                write!(f, "remote store unavailable: {reason}")
            }
        }
    }
}

impl std::error::Error for BoardError {}

#[cfg(test)]
mod tests {
    use super::BoardError;

    #[test]
    fn messages_are_human_readable() {
        assert_eq!(
            BoardError::InvalidCoordinate { x: 64, y: -1 }.to_string(),
            "cell (64, -1) is outside the grid"
        );
        assert_eq!(
            BoardError::InvalidColor {
                value: "red".to_string()
            }
            .to_string(),
            "invalid color \"red\" (use #rrggbb)"
        );
        assert_eq!(
            BoardError::RateLimited {
                retry_after_secs: 12
            }
            .to_string(),
            "out of charges; next charge in 12s"
        );
    }
}
