//! Gaussian noise generation and mixing

use rand::Rng;
use std::f64::consts::PI;

use super::filter::bandpass_filter;
use crate::types::{FrameBuffer, Sample};

/// Two approximately normal values from two uniform draws
///
/// Box-Muller shape, but scaled by `log10` of the first draw rather than the
/// natural log, which yields a narrower spread than N(0, 1).
pub fn gauss_pair<R: Rng + ?Sized>(rng: &mut R) -> (f64, f64) {
    // a in (0, 1] so the log is finite
    let a = 1.0 - rng.gen::<f64>();
    let b = rng.gen::<f64>();
    let r = (-2.0 * a.log10()).sqrt();
    let theta = 2.0 * PI * b;
    (r * theta.sin(), r * theta.cos())
}

/// `len` samples of Gaussian noise scaled by `volume`
pub fn noise<R: Rng + ?Sized>(len: usize, volume: f64, rng: &mut R) -> Vec<Sample> {
    let mut out = Vec::with_capacity(len);
    while out.len() < len {
        let (x, y) = gauss_pair(rng);
        out.push((volume * x) as Sample);
        if out.len() < len {
            out.push((volume * y) as Sample);
        }
    }
    out
}

fn noise_buffer<R: Rng + ?Sized>(like: &FrameBuffer, volume: f64, rng: &mut R) -> FrameBuffer {
    let frames = like.frame_count();
    let channels = (0..like.channel_count())
        .map(|_| noise(frames, volume, rng))
        .collect();
    FrameBuffer::from_channels(like.sample_rate(), frames, channels)
}

/// Add independent white noise to every channel
pub fn noise_mix<R: Rng + ?Sized>(buffer: &FrameBuffer, volume: f64, rng: &mut R) -> FrameBuffer {
    let n = noise_buffer(buffer, volume, rng);
    buffer.modify(|c, f, v| v.saturating_add(n.get(c, f)))
}

/// Add band-passed white noise centred on `freq` to every channel
pub fn banded_noise_mix<R: Rng + ?Sized>(
    buffer: &FrameBuffer,
    volume: f64,
    freq: f64,
    q: f64,
    rng: &mut R,
) -> FrameBuffer {
    let n = bandpass_filter(&noise_buffer(buffer, volume, rng), freq, q);
    buffer.modify(|c, f, v| v.saturating_add(n.get(c, f)))
}
