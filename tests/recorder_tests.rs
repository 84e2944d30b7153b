// End-to-end recorder tests: scripted microphone, fake messaging
// service, real decode/downmix/encode in between.

use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};

use voicedrop::delivery::{
    AttachmentUpload, MessageRecord, MessagingApi, OutboundMessage, StaticAddress,
};
use voicedrop::{
    CaptureError, CaptureStream, DeliveryPipeline, Microphone, PipelineError, Recorder,
    SessionState, SkipReason, StopOutcome, TrackHandle,
};

// ============================================================================
// Fixtures
// ============================================================================

/// A short mono WAV blob, the shape a capture source hands over.
fn wav_blob() -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 8000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for i in 0..4000 {
            let sample = ((i as f32 * 0.02).sin() * 9000.0) as i16;
            writer.write_sample(sample).unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

/// Split a blob into three arrival-ordered chunks.
fn chunked(blob: &[u8]) -> Vec<Vec<u8>> {
    let size = blob.len() / 3 + 1;
    blob.chunks(size).map(<[u8]>::to_vec).collect()
}

struct CountingTracks(Arc<AtomicUsize>);

impl TrackHandle for CountingTracks {
    fn stop_all_tracks(&mut self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

struct MockMicrophone {
    chunks: Vec<Vec<u8>>,
    released: Arc<AtomicUsize>,
    requests: Arc<AtomicUsize>,
    deny_permission: bool,
}

impl MockMicrophone {
    fn new(chunks: Vec<Vec<u8>>) -> Self {
        Self {
            chunks,
            released: Arc::new(AtomicUsize::new(0)),
            requests: Arc::new(AtomicUsize::new(0)),
            deny_permission: false,
        }
    }

    fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Microphone for MockMicrophone {
    async fn request_stream(&self) -> Result<CaptureStream, CaptureError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        if self.deny_permission {
            return Err(CaptureError::Permission("denied by test".into()));
        }
        let (tx, rx) = mpsc::channel(self.chunks.len().max(1));
        for chunk in &self.chunks {
            tx.try_send(chunk.clone()).unwrap();
        }
        // Sender dropped here: the source drains, but the session must
        // stay capturing until stop().
        Ok(CaptureStream::new(
            rx,
            Box::new(CountingTracks(self.released.clone())),
        ))
    }
}

#[derive(Default)]
struct FakeMessaging {
    calls: Mutex<Vec<&'static str>>,
    fail_upload: bool,
    /// When set, the upload blocks until the test fires this gate,
    /// holding the recorder in its finalizing phase.
    upload_gate: Mutex<Option<oneshot::Receiver<()>>>,
}

impl FakeMessaging {
    fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessagingApi for FakeMessaging {
    async fn conversation_messages(
        &self,
        _conversation_id: &str,
    ) -> anyhow::Result<Vec<MessageRecord>> {
        self.calls.lock().unwrap().push("history");
        Ok(vec![MessageRecord {
            contact_id: Some("u1".into()),
        }])
    }

    async fn upload_attachment(&self, upload: &AttachmentUpload<'_>) -> anyhow::Result<String> {
        self.calls.lock().unwrap().push("upload");
        assert!(!upload.artifact.bytes.is_empty());
        assert_eq!(upload.artifact.mime_type, "audio/mpeg");
        let gate = self.upload_gate.lock().unwrap().take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        if self.fail_upload {
            anyhow::bail!("upload rejected by test");
        }
        Ok("https://x/audio.mp3".to_string())
    }

    async fn publish_message(&self, message: &OutboundMessage<'_>) -> anyhow::Result<()> {
        self.calls.lock().unwrap().push("publish");
        assert_eq!(message.contact_id, "u1");
        assert_eq!(message.attachment_url, "https://x/audio.mp3");
        Ok(())
    }
}

fn recorder(
    mic: Arc<MockMicrophone>,
    api: Arc<FakeMessaging>,
    path: Option<&str>,
) -> Recorder {
    let delivery = DeliveryPipeline::new(
        api,
        Arc::new(StaticAddress::new(path.map(String::from))),
    );
    Recorder::new(mic, delivery)
}

async fn drain_capture() {
    // Give the collector time to pull all pre-buffered chunks.
    tokio::time::sleep(Duration::from_millis(50)).await;
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn records_and_delivers_end_to_end() {
    let mic = Arc::new(MockMicrophone::new(chunked(&wav_blob())));
    let api = Arc::new(FakeMessaging::default());
    let rec = recorder(mic.clone(), api.clone(), Some("/location/l1/conversations/c1"));

    rec.start().await.unwrap();
    assert_eq!(rec.status().state, SessionState::Capturing);
    drain_capture().await;

    let outcome = rec.stop().await.unwrap();
    match outcome {
        StopOutcome::Delivered(result) => {
            assert_eq!(result.uploaded_url, "https://x/audio.mp3");
            assert!(result.message_published);
        }
        other => panic!("expected delivery, got {other:?}"),
    }

    assert_eq!(api.calls(), vec!["history", "upload", "publish"]);
    assert_eq!(mic.released(), 1);
    assert_eq!(rec.status().state, SessionState::Idle);
    assert_eq!(rec.status().elapsed_seconds, 0);
}

#[tokio::test]
async fn stop_while_idle_is_a_noop() {
    let mic = Arc::new(MockMicrophone::new(vec![]));
    let api = Arc::new(FakeMessaging::default());
    let rec = recorder(mic.clone(), api.clone(), Some("/location/l1/conversations/c1"));

    let outcome = rec.stop().await.unwrap();
    assert!(matches!(outcome, StopOutcome::Ignored));
    assert!(api.calls().is_empty());
    assert_eq!(mic.released(), 0);
    assert_eq!(rec.status().state, SessionState::Idle);
}

#[tokio::test]
async fn duplicate_start_is_inert() {
    let mic = Arc::new(MockMicrophone::new(chunked(&wav_blob())));
    let api = Arc::new(FakeMessaging::default());
    let rec = recorder(mic.clone(), api.clone(), Some("/location/l1/conversations/c1"));

    rec.start().await.unwrap();
    rec.start().await.unwrap();
    assert_eq!(mic.requests(), 1);

    drain_capture().await;
    rec.stop().await.unwrap();
    assert_eq!(mic.released(), 1);
}

#[tokio::test]
async fn permission_failure_stays_idle() {
    let mut mic = MockMicrophone::new(vec![]);
    mic.deny_permission = true;
    let mic = Arc::new(mic);
    let api = Arc::new(FakeMessaging::default());
    let rec = recorder(mic.clone(), api.clone(), Some("/location/l1/conversations/c1"));

    let err = rec.start().await.unwrap_err();
    assert!(matches!(err, CaptureError::Permission(_)));
    assert_eq!(rec.status().state, SessionState::Idle);

    // Still re-armable: stop is a no-op, nothing was leaked.
    assert!(matches!(rec.stop().await.unwrap(), StopOutcome::Ignored));
    assert_eq!(mic.released(), 0);
}

#[tokio::test]
async fn resolution_miss_skips_silently_and_releases() {
    let mic = Arc::new(MockMicrophone::new(chunked(&wav_blob())));
    let api = Arc::new(FakeMessaging::default());
    // Addressing context without a conversation id
    let rec = recorder(mic.clone(), api.clone(), None);

    rec.start().await.unwrap();
    drain_capture().await;

    let outcome = rec.stop().await.unwrap();
    assert!(matches!(
        outcome,
        StopOutcome::Skipped(SkipReason::NoConversation)
    ));
    assert!(api.calls().is_empty(), "no upload or publish may run");
    assert_eq!(mic.released(), 1);
    assert_eq!(rec.status().state, SessionState::Idle);
}

#[tokio::test]
async fn upload_failure_releases_and_skips_publish() {
    let mic = Arc::new(MockMicrophone::new(chunked(&wav_blob())));
    let api = Arc::new(FakeMessaging {
        fail_upload: true,
        ..Default::default()
    });
    let rec = recorder(mic.clone(), api.clone(), Some("/location/l1/conversations/c1"));

    rec.start().await.unwrap();
    drain_capture().await;

    let err = rec.stop().await.unwrap_err();
    assert!(matches!(err, PipelineError::Upload(_)));
    assert_eq!(api.calls(), vec!["history", "upload"]);
    assert_eq!(mic.released(), 1);
    assert_eq!(rec.status().state, SessionState::Idle);

    // The control surface stays usable after a hard failure.
    rec.start().await.unwrap();
    assert_eq!(mic.requests(), 2);
    assert_eq!(rec.status().state, SessionState::Capturing);
}

#[tokio::test]
async fn undecodable_capture_is_a_decode_error() {
    let mic = Arc::new(MockMicrophone::new(vec![vec![0x42; 256], vec![0x43; 256]]));
    let api = Arc::new(FakeMessaging::default());
    let rec = recorder(mic.clone(), api.clone(), Some("/location/l1/conversations/c1"));

    rec.start().await.unwrap();
    drain_capture().await;

    let err = rec.stop().await.unwrap_err();
    assert!(matches!(err, PipelineError::Decode(_)));
    assert!(api.calls().is_empty());
    assert_eq!(mic.released(), 1);
    assert_eq!(rec.status().state, SessionState::Idle);
}

#[tokio::test]
async fn stop_and_start_during_finalize_are_inert() {
    let mic = Arc::new(MockMicrophone::new(chunked(&wav_blob())));
    let (gate_tx, gate_rx) = oneshot::channel();
    let api = Arc::new(FakeMessaging {
        upload_gate: Mutex::new(Some(gate_rx)),
        ..Default::default()
    });
    let rec = Arc::new(recorder(
        mic.clone(),
        api.clone(),
        Some("/location/l1/conversations/c1"),
    ));

    rec.start().await.unwrap();
    drain_capture().await;

    let first_stop = tokio::spawn({
        let rec = rec.clone();
        async move { rec.stop().await }
    });

    // Wait until the first stop is parked inside the upload step.
    for _ in 0..200 {
        if api.calls().contains(&"upload") {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert!(api.calls().contains(&"upload"), "first stop never reached upload");
    assert_eq!(rec.status().state, SessionState::Finalizing);

    // A second stop mid-finalize is a no-op, not a re-entry.
    let second = rec.stop().await.unwrap();
    assert!(matches!(second, StopOutcome::Ignored));

    // And start is inert: the microphone is not re-armed.
    rec.start().await.unwrap();
    assert_eq!(mic.requests(), 1);
    assert_eq!(rec.status().state, SessionState::Finalizing);

    gate_tx.send(()).unwrap();
    let outcome = first_stop.await.unwrap().unwrap();
    assert!(matches!(outcome, StopOutcome::Delivered(_)));

    assert_eq!(api.calls(), vec!["history", "upload", "publish"]);
    assert_eq!(mic.released(), 1);
    assert_eq!(rec.status().state, SessionState::Idle);
}

#[tokio::test]
async fn status_stream_reports_transitions() {
    let mic = Arc::new(MockMicrophone::new(chunked(&wav_blob())));
    let api = Arc::new(FakeMessaging::default());
    let rec = recorder(mic.clone(), api.clone(), Some("/location/l1/conversations/c1"));

    let mut status_rx = rec.subscribe();
    assert_eq!(status_rx.borrow().state, SessionState::Idle);

    rec.start().await.unwrap();
    status_rx.changed().await.unwrap();
    let after_start = *status_rx.borrow_and_update();
    assert_eq!(after_start.state, SessionState::Capturing);
    assert_eq!(after_start.elapsed_seconds, 0);

    drain_capture().await;
    rec.stop().await.unwrap();
    assert_eq!(rec.status().state, SessionState::Idle);
    assert_eq!(rec.status().elapsed_seconds, 0);
}

#[tokio::test]
async fn elapsed_seconds_tick_while_capturing() {
    let mic = Arc::new(MockMicrophone::new(chunked(&wav_blob())));
    let api = Arc::new(FakeMessaging::default());
    let rec = recorder(mic.clone(), api.clone(), Some("/location/l1/conversations/c1"));

    rec.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(1100)).await;
    assert!(rec.status().elapsed_seconds >= 1);

    rec.stop().await.unwrap();
    assert_eq!(rec.status().elapsed_seconds, 0);
}
