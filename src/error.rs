use thiserror::Error;

/// Failures acquiring the capture device. Both leave the recorder in
/// `Idle` without entering any visual or timer state.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// The user (or platform policy) denied microphone access.
    #[error("microphone permission denied: {0}")]
    Permission(String),

    /// No usable capture device, or the device failed to open.
    #[error("capture device unavailable: {0}")]
    Device(String),
}

/// Errors produced while finalizing a recording. Every variant still
/// releases the capture tracks and returns the session to `Idle`; only
/// `Upload` and `Publish` are reported to the observability sink.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Capture(#[from] CaptureError),

    /// The captured container could not be decoded into PCM.
    #[error("could not decode captured audio: {0}")]
    Decode(String),

    /// The MP3 encoder could not be built or fed.
    #[error("mp3 encoding failed: {0}")]
    Encode(String),

    /// The artifact upload was rejected or returned no file reference.
    #[error("attachment upload failed: {0}")]
    Upload(String),

    /// The message referencing the uploaded artifact was rejected.
    #[error("message publish failed: {0}")]
    Publish(String),
}
