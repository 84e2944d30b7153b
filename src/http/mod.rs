//! HTTP control surface
//!
//! Thin start/stop/status wrapper over the recorder for a UI to drive.
//! No recording logic lives here.

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
