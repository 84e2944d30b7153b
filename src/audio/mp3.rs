use mp3lame_encoder::{max_required_buffer_size, Birtate, Builder, FlushNoGap, Quality};
use tracing::debug;

use super::{EncodedArtifact, MonoPcm};
use crate::error::PipelineError;

/// Samples per encoded block, the MP3 frame granularity.
pub const BLOCK_SAMPLES: usize = 1152;

/// Fixed output bitrate. Voice memos get exactly one quality level.
const BITRATE: Birtate = Birtate::Kbps128;

pub const MP3_MIME_TYPE: &str = "audio/mpeg";

/// Streaming MP3 encoder for one artifact.
///
/// Single-use: `encode` consumes the instance, so encoder state can
/// never leak across recording cycles.
pub struct Mp3Encoder {
    encoder: mp3lame_encoder::Encoder,
}

fn lame_err<E: std::fmt::Debug>(e: E) -> PipelineError {
    PipelineError::Encode(format!("{e:?}"))
}

impl Mp3Encoder {
    /// Build a fresh mono encoder for the given input sample rate.
    pub fn new(sample_rate: u32) -> Result<Self, PipelineError> {
        let mut builder = Builder::new()
            .ok_or_else(|| PipelineError::Encode("lame context allocation failed".into()))?;
        builder.set_num_channels(1).map_err(lame_err)?;
        builder.set_sample_rate(sample_rate).map_err(lame_err)?;
        builder.set_brate(BITRATE).map_err(lame_err)?;
        builder.set_quality(Quality::Best).map_err(lame_err)?;
        let encoder = builder.build().map_err(lame_err)?;
        Ok(Self { encoder })
    }

    /// Encode the full mono stream, block by block, then flush once.
    ///
    /// Each block may emit zero or more bytes (LAME buffers internally);
    /// outputs are appended strictly in block order, and the final flush
    /// emits whatever the encoder still holds. The concatenation is a
    /// single decodable MP3 stream.
    pub fn encode(mut self, pcm: &MonoPcm) -> Result<EncodedArtifact, PipelineError> {
        let mut bytes: Vec<u8> = Vec::new();

        for block in pcm.samples.chunks(BLOCK_SAMPLES) {
            bytes.reserve(max_required_buffer_size(block.len()));
            let written = self
                .encoder
                .encode(mp3lame_encoder::MonoPcm(block), bytes.spare_capacity_mut())
                .map_err(lame_err)?;
            // Safety: `encode` initialized exactly `written` bytes of the
            // reserved spare capacity.
            unsafe { bytes.set_len(bytes.len() + written) };
        }

        bytes.reserve(max_required_buffer_size(BLOCK_SAMPLES));
        let written = self
            .encoder
            .flush::<FlushNoGap>(bytes.spare_capacity_mut())
            .map_err(lame_err)?;
        // Safety: as above, `flush` initialized `written` bytes.
        unsafe { bytes.set_len(bytes.len() + written) };

        debug!(
            samples = pcm.samples.len(),
            sample_rate = pcm.sample_rate,
            bytes = bytes.len(),
            "encoded mp3 artifact"
        );

        Ok(EncodedArtifact {
            bytes,
            mime_type: MP3_MIME_TYPE,
        })
    }
}
