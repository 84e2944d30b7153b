use super::{AudioBuffer, MonoPcm};

/// Fold N channels into one mono 16-bit stream.
///
/// Each output sample is the average of the channel samples at that
/// index, scaled asymmetrically into the signed 16-bit range: negative
/// averages scale by 32768, non-negative by 32767, rounded to nearest.
/// The asymmetry matches the signed-range bounds exactly, so -1.0 maps
/// to -32768 and 1.0 to 32767 with no off-by-one at either extreme.
/// Halfway values round away from zero (`f32::round`).
///
/// Inputs are assumed normalized to [-1.0, 1.0]; no clamping is applied,
/// so out-of-range input wraps through the float-to-int cast. That is a
/// documented limitation of the capture path, not something this
/// function papers over.
pub fn downmix(buffer: &AudioBuffer) -> MonoPcm {
    let channel_count = buffer.channels.len().max(1) as f32;
    let len = buffer.len();

    let mut samples = Vec::with_capacity(len);
    for i in 0..len {
        let sum: f32 = buffer.channels.iter().map(|ch| ch[i]).sum();
        let avg = sum / channel_count;
        let scaled = if avg < 0.0 { avg * 32768.0 } else { avg * 32767.0 };
        samples.push(scaled.round() as i16);
    }

    MonoPcm {
        samples,
        sample_rate: buffer.sample_rate,
    }
}
