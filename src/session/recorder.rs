use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{oneshot, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::status::{RecorderStatus, SessionState};
use crate::audio::{decode_capture, downmix, Mp3Encoder};
use crate::capture::{CaptureStream, Microphone};
use crate::delivery::{DeliveryOutcome, DeliveryPipeline, DeliveryResult, SkipReason};
use crate::error::{CaptureError, PipelineError};

/// Result of a `stop()` call.
#[derive(Debug, Clone)]
pub enum StopOutcome {
    /// `stop()` outside `Capturing`; nothing happened.
    Ignored,
    /// Pipeline ran but skipped delivery (no recipient resolvable).
    Skipped(SkipReason),
    /// Artifact uploaded and message published.
    Delivered(DeliveryResult),
}

enum Phase {
    Idle,
    Capturing(Active),
    Finalizing,
}

struct Active {
    cycle: Uuid,
    stop_tx: oneshot::Sender<()>,
    collector: JoinHandle<(CaptureStream, Vec<Vec<u8>>)>,
    ticker: JoinHandle<()>,
}

/// The control surface's recording session owner.
///
/// Exactly one capture may be active at a time; duplicate `start` and
/// `stop` calls are inert, which tolerates double-fired UI triggers.
pub struct Recorder {
    microphone: Arc<dyn Microphone>,
    delivery: DeliveryPipeline,
    status_tx: watch::Sender<RecorderStatus>,
    phase: Mutex<Phase>,
}

impl Recorder {
    pub fn new(microphone: Arc<dyn Microphone>, delivery: DeliveryPipeline) -> Self {
        let (status_tx, _) = watch::channel(RecorderStatus::idle());
        Self {
            microphone,
            delivery,
            status_tx,
            phase: Mutex::new(Phase::Idle),
        }
    }

    /// Current status snapshot.
    pub fn status(&self) -> RecorderStatus {
        *self.status_tx.borrow()
    }

    /// Subscribe to status transitions, for a UI to render.
    pub fn subscribe(&self) -> watch::Receiver<RecorderStatus> {
        self.status_tx.subscribe()
    }

    /// Arm the microphone and begin capturing.
    ///
    /// No-op unless idle. On capture failure the state never leaves
    /// `Idle` and no timer is started.
    pub async fn start(&self) -> Result<(), CaptureError> {
        let mut phase = self.phase.lock().await;
        if !matches!(*phase, Phase::Idle) {
            warn!("start ignored: recorder is not idle");
            return Ok(());
        }

        let stream = self.microphone.request_stream().await?;

        let cycle = Uuid::new_v4();
        let (stop_tx, stop_rx) = oneshot::channel();
        let collector = tokio::spawn(collect_chunks(stream, stop_rx));
        let ticker = tokio::spawn(run_ticker(self.status_tx.clone()));

        self.status_tx.send_replace(RecorderStatus {
            state: SessionState::Capturing,
            elapsed_seconds: 0,
        });
        *phase = Phase::Capturing(Active {
            cycle,
            stop_tx,
            collector,
            ticker,
        });

        info!(%cycle, "recording started");
        Ok(())
    }

    /// Halt capture and run the finalize pipeline.
    ///
    /// No-op unless capturing (a second `stop` during finalization is
    /// inert). Whatever the pipeline does, the capture tracks are
    /// released exactly once and the recorder returns to `Idle`.
    pub async fn stop(&self) -> Result<StopOutcome, PipelineError> {
        let active = {
            let mut phase = self.phase.lock().await;
            match std::mem::replace(&mut *phase, Phase::Finalizing) {
                Phase::Capturing(active) => active,
                other => {
                    *phase = other;
                    debug!("stop ignored: no active capture");
                    return Ok(StopOutcome::Ignored);
                }
            }
        };

        let cycle = active.cycle;
        active.ticker.abort();
        let _ = active.stop_tx.send(());

        self.status_tx.send_modify(|s| s.state = SessionState::Finalizing);

        // If the collector panicked the stream was dropped with it, and
        // Drop already released the tracks.
        let result = match active.collector.await {
            Ok((stream, chunks)) => {
                info!(%cycle, chunks = chunks.len(), "capture stopped, finalizing");
                let result = self.finalize(chunks).await;
                stream.release();
                result
            }
            Err(e) => Err(PipelineError::Decode(format!("chunk collector failed: {e}"))),
        };

        {
            let mut phase = self.phase.lock().await;
            *phase = Phase::Idle;
        }
        self.status_tx.send_replace(RecorderStatus::idle());

        match result {
            Ok(DeliveryOutcome::Delivered(delivered)) => Ok(StopOutcome::Delivered(delivered)),
            Ok(DeliveryOutcome::Skipped(reason)) => {
                debug!(%cycle, ?reason, "delivery skipped");
                Ok(StopOutcome::Skipped(reason))
            }
            Err(e) => Err(e),
        }
    }

    async fn finalize(&self, chunks: Vec<Vec<u8>>) -> Result<DeliveryOutcome, PipelineError> {
        let blob = chunks.concat();
        debug!(bytes = blob.len(), "assembled capture blob");

        let buffer = decode_capture(&blob)?;
        let pcm = downmix(&buffer);
        let artifact = Mp3Encoder::new(pcm.sample_rate)?.encode(&pcm)?;

        self.delivery.deliver(&artifact).await
    }
}

/// Collect raw chunks in arrival order until told to stop.
///
/// A drained source (sender gone) is not a stop: the session stays in
/// `Capturing` until `stop()` fires, matching a microphone that has
/// simply gone quiet.
async fn collect_chunks(
    mut stream: CaptureStream,
    mut stop_rx: oneshot::Receiver<()>,
) -> (CaptureStream, Vec<Vec<u8>>) {
    let mut chunks: Vec<Vec<u8>> = Vec::new();
    loop {
        tokio::select! {
            _ = &mut stop_rx => break,
            chunk = stream.next_chunk() => match chunk {
                Some(chunk) => chunks.push(chunk),
                None => {
                    let _ = (&mut stop_rx).await;
                    break;
                }
            },
        }
    }
    (stream, chunks)
}

/// Republish elapsed seconds once per second. Cosmetic only; aborted
/// exactly once when the session leaves `Capturing`.
async fn run_ticker(status_tx: watch::Sender<RecorderStatus>) {
    let mut interval = tokio::time::interval(Duration::from_secs(1));
    interval.tick().await; // first tick completes immediately
    loop {
        interval.tick().await;
        status_tx.send_modify(|s| s.elapsed_seconds += 1);
    }
}
