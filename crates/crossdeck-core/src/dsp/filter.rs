//! Biquad filtering and simple smoothing
//!
//! The recurrence keeps raw (unnormalized) coefficients and divides by `a0`
//! per term, with history before the first sample treated as zero.

use std::f64::consts::PI;

use crate::types::{FrameBuffer, Sample};

/// Biquad filter coefficients (not normalized by `a0`)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiquadCoeffs {
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
    pub a0: f64,
    pub a1: f64,
    pub a2: f64,
}

impl BiquadCoeffs {
    /// Create peaking EQ filter coefficients
    /// gain_db: boost/cut in dB (about ±15), q: selectivity, higher is narrower
    pub fn peaking(freq: f64, q: f64, gain_db: f64, sample_rate: f64) -> Self {
        let a = 10.0_f64.powf(gain_db / 40.0);
        let w0 = 2.0 * PI * freq / sample_rate;
        let cos_w0 = w0.cos();
        let alpha = w0.sin() / (2.0 * q);

        Self {
            b0: 1.0 + alpha * a,
            b1: -2.0 * cos_w0,
            b2: 1.0 - alpha * a,
            a0: 1.0 + alpha / a,
            a1: -2.0 * cos_w0,
            a2: 1.0 - alpha / a,
        }
    }

    /// Create band-pass filter coefficients (0 dB peak gain)
    pub fn bandpass(freq: f64, q: f64, sample_rate: f64) -> Self {
        let w0 = 2.0 * PI * freq / sample_rate;
        let cos_w0 = w0.cos();
        let alpha = w0.sin() / (2.0 * q);

        Self {
            b0: alpha,
            b1: 0.0,
            b2: -alpha,
            a0: 1.0 + alpha,
            a1: -2.0 * cos_w0,
            a2: 1.0 - alpha,
        }
    }

    /// Passthrough (unity gain, no filtering)
    pub fn passthrough() -> Self {
        Self {
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a0: 1.0,
            a1: 0.0,
            a2: 0.0,
        }
    }
}

/// Run the biquad recurrence over `src`; output has the same length
///
/// Every output is truncated to an integer before it feeds back.
pub fn biquad(src: &[Sample], c: &BiquadCoeffs) -> Vec<Sample> {
    let mut out: Vec<Sample> = Vec::with_capacity(src.len());
    let (mut x1, mut x2, mut y1, mut y2) = (0.0, 0.0, 0.0, 0.0);
    for &x in src {
        let x0 = x as f64;
        let y = c.b0 / c.a0 * x0 + c.b1 / c.a0 * x1 + c.b2 / c.a0 * x2
            - c.a1 / c.a0 * y1
            - c.a2 / c.a0 * y2;
        let y = y as Sample;
        out.push(y);
        x2 = x1;
        x1 = x0;
        y2 = y1;
        y1 = y as f64;
    }
    out
}

/// Peaking EQ over every channel of `buffer`
pub fn peaking_filter(buffer: &FrameBuffer, freq: f64, q: f64, gain_db: f64) -> FrameBuffer {
    let coeffs = BiquadCoeffs::peaking(freq, q, gain_db, buffer.sample_rate() as f64);
    buffer.modify_by_channel(|_, ch| biquad(ch, &coeffs))
}

/// Band-pass over every channel of `buffer`
pub fn bandpass_filter(buffer: &FrameBuffer, freq: f64, q: f64) -> FrameBuffer {
    let coeffs = BiquadCoeffs::bandpass(freq, q, buffer.sample_rate() as f64);
    buffer.modify_by_channel(|_, ch| biquad(ch, &coeffs))
}

/// Two-tap moving average (gentle low-pass)
///
/// `range < 2` returns the buffer unchanged.
pub fn mean_filter(buffer: &FrameBuffer, range: usize) -> FrameBuffer {
    if range < 2 {
        return buffer.clone();
    }
    buffer.modify(|c, f, v| {
        let prev = buffer.get_or_zero(c, f as i64 - 1);
        ((v as i64 + prev as i64) / 2) as Sample
    })
}
