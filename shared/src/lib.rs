pub mod board;
pub mod codec;
pub mod color;
pub mod error;
pub mod events;
pub mod grid;
pub mod painter;
pub mod payment;
pub mod seed;
pub mod session;
pub mod store;

pub use board::{BoardAction, PixelBoard, PixelMap};
pub use error::BoardError;
pub use events::{PixelChange, PixelEvent};
pub use grid::{GeoBounds, PixelCell, WorldGrid};
pub use session::{ChargePolicy, SessionCharges, SessionStatus};
