use worldboard_shared::grid::CANVAS_GRID_SIZE;

pub const SERVER_PORT: u16 = 3001;

pub const CANVAS_WIDTH: u32 = CANVAS_GRID_SIZE;
pub const CANVAS_HEIGHT: u32 = CANVAS_GRID_SIZE;

pub const SSE_KEEPALIVE_SECS: u64 = 15;
pub const DEFAULT_BROADCAST_BUFFER: usize = 256;

/// How often the canvas is written back to the store when it changed.
pub const DEFAULT_SNAPSHOT_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_DATA_DIR: &str = "data";

pub fn server_port() -> u16 {
    std::env::var("PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(SERVER_PORT)
}

pub fn event_broadcast_buffer() -> usize {
    std::env::var("EVENT_BROADCAST_BUFFER")
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(DEFAULT_BROADCAST_BUFFER)
}

pub fn snapshot_interval_secs() -> u64 {
    std::env::var("SNAPSHOT_INTERVAL_SECS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(DEFAULT_SNAPSHOT_INTERVAL_SECS)
}

pub fn data_dir() -> String {
    std::env::var("DATA_DIR")
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_DATA_DIR.to_string())
}

/// Whether an empty canvas is seeded with the built-in artworks.
pub fn seed_enabled() -> bool {
    std::env::var("SEED_CANVAS")
        .map(|value| {
            let normalized = value.trim().to_ascii_lowercase();
            !matches!(normalized.as_str(), "0" | "false" | "no" | "off")
        })
        .unwrap_or(true)
}

#[cfg(test)]
mod tests {
    use super::{
        DEFAULT_BROADCAST_BUFFER, DEFAULT_SNAPSHOT_INTERVAL_SECS, SERVER_PORT,
        event_broadcast_buffer, seed_enabled, server_port, snapshot_interval_secs,
    };

    #[test]
    fn port_falls_back_on_garbage() {
        temp_env::with_var("PORT", Some("not-a-port"), || {
            assert_eq!(server_port(), SERVER_PORT);
        });
        temp_env::with_var("PORT", Some("8088"), || {
            assert_eq!(server_port(), 8088);
        });
        temp_env::with_var("PORT", None::<&str>, || {
            assert_eq!(server_port(), SERVER_PORT);
        });
    }

    #[test]
    fn buffer_and_interval_reject_zero() {
        temp_env::with_var("EVENT_BROADCAST_BUFFER", Some("0"), || {
            assert_eq!(event_broadcast_buffer(), DEFAULT_BROADCAST_BUFFER);
        });
        temp_env::with_var("SNAPSHOT_INTERVAL_SECS", Some("0"), || {
            assert_eq!(snapshot_interval_secs(), DEFAULT_SNAPSHOT_INTERVAL_SECS);
        });
        temp_env::with_var("SNAPSHOT_INTERVAL_SECS", Some("300"), || {
            assert_eq!(snapshot_interval_secs(), 300);
        });
    }

    #[test]
    fn seeding_is_on_unless_disabled() {
        temp_env::with_var("SEED_CANVAS", None::<&str>, || {
            assert!(seed_enabled());
        });
        temp_env::with_var("SEED_CANVAS", Some("off"), || {
            assert!(!seed_enabled());
        });
        temp_env::with_var("SEED_CANVAS", Some("FALSE"), || {
            assert!(!seed_enabled());
        });
        temp_env::with_var("SEED_CANVAS", Some("1"), || {
            assert!(seed_enabled());
        });
    }
}
