use std::io::Cursor;

use symphonia::core::audio::{AudioBufferRef, Signal};
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::conv::FromSample;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::debug;

use super::AudioBuffer;
use crate::error::PipelineError;

fn append_packet<T>(
    channels: &mut Vec<Vec<f32>>,
    data: std::borrow::Cow<symphonia::core::audio::AudioBuffer<T>>,
) where
    T: symphonia::core::sample::Sample,
    f32: FromSample<T>,
{
    if channels.is_empty() {
        channels.resize(data.spec().channels.count(), Vec::new());
    }
    for (ch, out) in channels.iter_mut().enumerate() {
        out.extend(data.chan(ch).iter().map(|v| f32::from_sample(*v)));
    }
}

/// Decode a captured container blob into per-channel floating-point PCM.
///
/// Probes the container format, picks the first decodeable audio track,
/// and drains it. All decoder state is scoped to this call, so resources
/// are released whether or not the decode succeeds.
pub fn decode_capture(blob: &[u8]) -> Result<AudioBuffer, PipelineError> {
    if blob.is_empty() {
        return Err(PipelineError::Decode("captured blob is empty".into()));
    }

    let mss = MediaSourceStream::new(
        Box::new(Cursor::new(blob.to_vec())),
        Default::default(),
    );

    let probed = symphonia::default::get_probe()
        .format(
            &Hint::new(),
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| PipelineError::Decode(format!("unrecognized container: {e}")))?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| PipelineError::Decode("no decodeable audio track".into()))?;
    let track_id = track.id;
    let params_rate = track.codec_params.sample_rate;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| PipelineError::Decode(format!("unsupported codec: {e}")))?;

    let mut channels: Vec<Vec<f32>> = Vec::new();
    let mut sample_rate = params_rate.unwrap_or(0);

    while let Ok(packet) = format.next_packet() {
        if packet.track_id() != track_id {
            continue;
        }
        let decoded = decoder
            .decode(&packet)
            .map_err(|e| PipelineError::Decode(format!("corrupt audio packet: {e}")))?;
        if sample_rate == 0 {
            sample_rate = decoded.spec().rate;
        }
        match decoded {
            AudioBufferRef::F32(data) => append_packet(&mut channels, data),
            AudioBufferRef::F64(data) => append_packet(&mut channels, data),
            AudioBufferRef::S8(data) => append_packet(&mut channels, data),
            AudioBufferRef::S16(data) => append_packet(&mut channels, data),
            AudioBufferRef::S24(data) => append_packet(&mut channels, data),
            AudioBufferRef::S32(data) => append_packet(&mut channels, data),
            AudioBufferRef::U8(data) => append_packet(&mut channels, data),
            AudioBufferRef::U16(data) => append_packet(&mut channels, data),
            AudioBufferRef::U24(data) => append_packet(&mut channels, data),
            AudioBufferRef::U32(data) => append_packet(&mut channels, data),
        }
    }

    if channels.is_empty() || channels[0].is_empty() {
        return Err(PipelineError::Decode("container holds no samples".into()));
    }
    if sample_rate == 0 {
        return Err(PipelineError::Decode("container reports no sample rate".into()));
    }

    debug!(
        channels = channels.len(),
        samples = channels[0].len(),
        sample_rate,
        "decoded capture blob"
    );

    Ok(AudioBuffer {
        channels,
        sample_rate,
    })
}
