//! Client transport.

mod ws;

pub use ws::{ws_router, AppState};
