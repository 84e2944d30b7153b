use serde::Serialize;

/// Observable lifecycle of the recorder.
///
/// `Idle -> Capturing -> Finalizing -> Idle` on success; error paths
/// return straight to `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Capturing,
    Finalizing,
}

/// Snapshot published to the UI layer on every transition and once per
/// second while capturing. Purely observational; nothing reads it back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RecorderStatus {
    pub state: SessionState,
    pub elapsed_seconds: u64,
}

impl RecorderStatus {
    pub fn idle() -> Self {
        Self {
            state: SessionState::Idle,
            elapsed_seconds: 0,
        }
    }
}
