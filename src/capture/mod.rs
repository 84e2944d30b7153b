//! Capture source abstraction
//!
//! The microphone is an external collaborator: something that, when
//! asked, hands over a stream of raw container chunks plus a handle to
//! the underlying tracks. The recorder only ever sees this interface;
//! platform capture, test fakes, and the file-backed demo source all
//! implement it.

pub mod file;

pub use file::FileMicrophone;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::debug;

use crate::error::CaptureError;

/// A capture capability that can arm the microphone.
#[async_trait]
pub trait Microphone: Send + Sync {
    /// Request an active audio stream. May fail with
    /// [`CaptureError::Permission`] or [`CaptureError::Device`], in
    /// which case nothing was armed.
    async fn request_stream(&self) -> Result<CaptureStream, CaptureError>;
}

/// Control over the live tracks backing a [`CaptureStream`].
pub trait TrackHandle: Send {
    /// Halt capture and free the device.
    fn stop_all_tracks(&mut self);
}

/// An armed capture: raw chunks arrive on `chunks` while the tracks
/// stay open.
///
/// Track release is exactly-once by construction: `release` consumes
/// the stream, and `Drop` covers abandonment (panic or early return)
/// without ever double-releasing.
pub struct CaptureStream {
    chunks: mpsc::Receiver<Vec<u8>>,
    tracks: Option<Box<dyn TrackHandle>>,
}

impl CaptureStream {
    pub fn new(chunks: mpsc::Receiver<Vec<u8>>, tracks: Box<dyn TrackHandle>) -> Self {
        Self {
            chunks,
            tracks: Some(tracks),
        }
    }

    /// Next raw chunk, or `None` once the source has drained.
    pub async fn next_chunk(&mut self) -> Option<Vec<u8>> {
        self.chunks.recv().await
    }

    /// Stop all tracks and free the device.
    pub fn release(mut self) {
        self.release_tracks();
    }

    fn release_tracks(&mut self) {
        if let Some(mut tracks) = self.tracks.take() {
            tracks.stop_all_tracks();
            debug!("capture tracks released");
        }
    }
}

impl Drop for CaptureStream {
    fn drop(&mut self) {
        self.release_tracks();
    }
}
