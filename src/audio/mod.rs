//! Audio processing for captured voice memos
//!
//! This module covers the offline half of the recording pipeline:
//! - Decoding a captured container blob into per-channel PCM
//! - Downmixing N channels to a single mono 16-bit stream
//! - Block-encoding the mono stream to MP3

pub mod decode;
pub mod downmix;
pub mod mp3;

pub use decode::decode_capture;
pub use downmix::downmix;
pub use mp3::Mp3Encoder;

/// Decoded capture: one sample vector per channel, all equal length.
#[derive(Debug, Clone)]
pub struct AudioBuffer {
    /// Per-channel samples, nominal range [-1.0, 1.0].
    pub channels: Vec<Vec<f32>>,
    /// Sample rate in Hz.
    pub sample_rate: u32,
}

impl AudioBuffer {
    /// Number of samples per channel.
    pub fn len(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Mono 16-bit PCM, produced by the downmixer.
#[derive(Debug, Clone)]
pub struct MonoPcm {
    pub samples: Vec<i16>,
    pub sample_rate: u32,
}

/// Compressed audio ready for delivery. Transient and single-use.
#[derive(Debug, Clone)]
pub struct EncodedArtifact {
    pub bytes: Vec<u8>,
    pub mime_type: &'static str,
}
