//! Recording session management
//!
//! `Recorder` owns the lifecycle of one capture at a time:
//! - `start()` arms the microphone and begins the elapsed-seconds tick
//! - raw chunks are collected in arrival order while capturing
//! - `stop()` drives concatenate -> decode -> downmix -> encode ->
//!   deliver, releases the capture tracks exactly once, and returns
//!   the session to idle on every exit path

mod recorder;
mod status;

pub use recorder::{Recorder, StopOutcome};
pub use status::{RecorderStatus, SessionState};
