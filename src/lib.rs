pub mod audio;
pub mod capture;
pub mod config;
pub mod delivery;
pub mod error;
pub mod http;
pub mod session;

pub use audio::{decode_capture, downmix, AudioBuffer, EncodedArtifact, MonoPcm, Mp3Encoder};
pub use capture::{CaptureStream, FileMicrophone, Microphone, TrackHandle};
pub use config::Config;
pub use delivery::{
    AddressSource, DeliveryOutcome, DeliveryPipeline, DeliveryResult, HttpMessagingClient,
    MessagingApi, SkipReason, StaticAddress,
};
pub use error::{CaptureError, PipelineError};
pub use http::{create_router, AppState};
pub use session::{Recorder, RecorderStatus, SessionState, StopOutcome};
