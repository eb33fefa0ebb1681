//! Linear-interpolation resampling
//!
//! Both directions share one formula. For output index `i` the source index
//! is `n = floor(i / rate)` and the weight of `src[n + 1]` is
//! `(i mod rate) / rate`. Positions within [`CORE_TOLERANCE`] of an exact
//! source frame copy it verbatim.

use crate::types::Sample;

/// Distance from an exact source frame below which no interpolation happens
const CORE_TOLERANCE: f64 = 0.01;

/// Stretch `src` by `rate` (> 1), producing `floor(len * rate)` samples
///
/// Returns `src` unchanged for `rate <= 1`.
pub fn upsample(src: &[Sample], rate: f64) -> Vec<Sample> {
    if rate <= 1.0 {
        return src.to_vec();
    }
    resample(src, rate)
}

/// Shrink `src` by `rate` (< 1), producing `floor(len * rate)` samples
///
/// Source frames past the end read as zero. Returns `src` unchanged for
/// `rate >= 1`.
pub fn downsample(src: &[Sample], rate: f64) -> Vec<Sample> {
    if rate >= 1.0 {
        return src.to_vec();
    }
    resample(src, rate)
}

fn resample(src: &[Sample], rate: f64) -> Vec<Sample> {
    let out_len = (src.len() as f64 * rate) as usize;
    let at = |n: usize| src.get(n).copied().unwrap_or(0);

    (0..out_len)
        .map(|i| {
            let pos = i as f64;
            let n = (pos / rate) as usize;
            let phase = pos % rate;
            if phase.abs() < CORE_TOLERANCE {
                at(n)
            } else if n + 1 < src.len() {
                let w = phase / rate;
                (src[n] as f64 * (1.0 - w) + src[n + 1] as f64 * w) as Sample
            } else {
                at(n)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn saw(len: usize) -> Vec<Sample> {
        (0..len).map(|i| ((i * 37) % 200) as Sample - 100).collect()
    }

    #[test]
    fn test_upsample_length() {
        let src = saw(101);
        for rate in [1.5, 2.0, 3.0, 4.25] {
            assert_eq!(upsample(&src, rate).len(), (101.0 * rate) as usize);
        }
    }

    #[test]
    fn test_upsample_keeps_exact_frames() {
        let src = saw(50);
        for m in [2usize, 3, 4] {
            let up = upsample(&src, m as f64);
            for (n, &s) in src.iter().enumerate() {
                assert_eq!(up[n * m], s, "rate {} frame {}", m, n);
            }
        }
    }

    #[test]
    fn test_upsample_interpolates_midpoint() {
        let up = upsample(&[0, 100, 200], 2.0);
        assert_eq!(up, vec![0, 50, 100, 150, 200, 200]);
    }

    #[test]
    fn test_rate_guards() {
        let src = saw(10);
        assert_eq!(upsample(&src, 1.0), src);
        assert_eq!(upsample(&src, 0.5), src);
        assert_eq!(downsample(&src, 1.0), src);
        assert_eq!(downsample(&src, 2.0), src);
    }

    #[test]
    fn test_downsample_length() {
        let src = saw(100);
        assert_eq!(downsample(&src, 0.5).len(), 50);
        assert_eq!(downsample(&src, 0.3).len(), 30);
    }

    #[test]
    fn test_round_trip_reconstructs() {
        let src = saw(64);
        for m in [2usize, 3, 4] {
            let back = downsample(&upsample(&src, m as f64), 1.0 / m as f64);
            assert_eq!(back.len(), src.len());
            for (a, b) in src.iter().zip(&back) {
                assert!((a - b).abs() <= 1, "rate {}: {} vs {}", m, a, b);
            }
        }
    }
}
