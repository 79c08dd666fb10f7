//! Float <-> 16-bit fixed-point PCM conversion.
//!
//! Fixed-point data is interleaved (`dst[frame * channels + channel]`),
//! float data is planar.

use super::planar_buffer::PlanarBuffer;

const SCALE: f32 = i16::MAX as f32;

/// Clamp to [-1, 1], scale by 32767 and truncate.
#[inline]
pub fn to_fixed(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * SCALE) as i16
}

/// [`to_fixed`] every sample of `src` into interleaved `dst`.
///
/// Frames that do not fit into `dst` are dropped.
pub fn float_to_fixed(src: &PlanarBuffer, dst: &mut [i16]) {
    let channels = src.channels();
    if channels == 0 {
        return;
    }
    let frames = src.frames().min(dst.len() / channels);

    for c in 0..channels {
        let samples = src.channel(c);
        for (i, &sample) in samples.iter().take(frames).enumerate() {
            dst[i * channels + c] = to_fixed(sample);
        }
    }
}

/// Scale interleaved `src` by 1/32767 into planar `dst`.
///
/// Copies `min(frames, dst.frames(), src frames)` frames and returns that
/// count. Destination samples past the copied range are left as they are.
pub fn fixed_to_float(src: &[i16], dst: &mut PlanarBuffer, frames: usize) -> usize {
    let channels = dst.channels();
    if channels == 0 {
        return 0;
    }
    let count = frames.min(dst.frames()).min(src.len() / channels);
    let scale = 1.0 / SCALE;

    for c in 0..channels {
        let out = dst.channel_mut(c);
        for (i, slot) in out.iter_mut().take(count).enumerate() {
            *slot = src[i * channels + c] as f32 * scale;
        }
    }
    count
}
