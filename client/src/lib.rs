pub mod http;
pub mod sync;

pub use http::{CanvasApi, ClientError};
