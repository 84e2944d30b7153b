use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;

use super::{CaptureStream, Microphone, TrackHandle};
use crate::config::CaptureConfig;
use crate::error::CaptureError;

/// Microphone stand-in that replays an audio file from disk.
///
/// The file's bytes are streamed as fixed-size chunks on a timer, the
/// same shape a live capture source produces. Used by the demo binary
/// and anywhere a real device is unavailable.
pub struct FileMicrophone {
    path: PathBuf,
    chunk_bytes: usize,
    chunk_interval: Duration,
}

impl FileMicrophone {
    pub fn new(path: impl Into<PathBuf>, chunk_bytes: usize, chunk_interval: Duration) -> Self {
        Self {
            path: path.into(),
            chunk_bytes: chunk_bytes.max(1),
            chunk_interval,
        }
    }

    pub fn from_config(cfg: &CaptureConfig) -> Self {
        Self::new(
            &cfg.input_path,
            cfg.chunk_bytes,
            Duration::from_millis(cfg.chunk_interval_ms),
        )
    }
}

struct FileTracks {
    feeder: JoinHandle<()>,
}

impl TrackHandle for FileTracks {
    fn stop_all_tracks(&mut self) {
        self.feeder.abort();
    }
}

#[async_trait]
impl Microphone for FileMicrophone {
    async fn request_stream(&self) -> Result<CaptureStream, CaptureError> {
        let bytes = tokio::fs::read(&self.path).await.map_err(|e| {
            CaptureError::Device(format!("cannot open capture source {}: {e}", self.path.display()))
        })?;

        info!(
            path = %self.path.display(),
            bytes = bytes.len(),
            "file capture armed"
        );

        let (tx, rx) = mpsc::channel(16);
        let chunk_bytes = self.chunk_bytes;
        let interval = self.chunk_interval;
        let feeder = tokio::spawn(async move {
            for chunk in bytes.chunks(chunk_bytes) {
                if tx.send(chunk.to_vec()).await.is_err() {
                    break;
                }
                tokio::time::sleep(interval).await;
            }
        });

        Ok(CaptureStream::new(rx, Box::new(FileTracks { feeder })))
    }
}
