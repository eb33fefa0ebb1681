//! Recursive radix-2 decimation-in-time FFT
//!
//! Inputs are truncated (never padded) to the largest power of two that fits.

use realfft::num_complex::Complex;
use std::f64::consts::PI;

use super::stretch::time_stretch;
use crate::types::Sample;

/// Largest power of two not exceeding `resolution` (1 for 0 or 1)
pub fn fft_size(resolution: usize) -> usize {
    let mut length = 1;
    while length * 2 <= resolution {
        length *= 2;
    }
    length
}

/// Complex spectrum of the leading power-of-two frames of `samples`
pub fn fft(samples: &[Sample]) -> Vec<Complex<f64>> {
    if samples.is_empty() {
        return Vec::new();
    }
    let input: Vec<f64> = samples[..fft_size(samples.len())]
        .iter()
        .map(|&s| s as f64)
        .collect();
    radix2(&input)
}

/// Real parts of [`fft`]
pub fn fft_real(samples: &[Sample]) -> Vec<f64> {
    fft(samples).into_iter().map(|c| c.re).collect()
}

/// Time-stretch `samples` to `fft_size(resolution)` frames, then transform
///
/// Lets a tick of arbitrary length be analysed at a fixed resolution.
pub fn stretch_fft(samples: &[Sample], resolution: usize) -> Vec<f64> {
    let stretched = time_stretch(samples, fft_size(resolution));
    fft_real(&stretched)
}

fn radix2(input: &[f64]) -> Vec<Complex<f64>> {
    match input.len() {
        0 => Vec::new(),
        1 => vec![Complex::new(input[0], 0.0)],
        2 => vec![
            Complex::new(input[0] + input[1], 0.0),
            Complex::new(input[0] - input[1], 0.0),
        ],
        n => {
            let even: Vec<f64> = input.iter().step_by(2).copied().collect();
            let odd: Vec<f64> = input.iter().skip(1).step_by(2).copied().collect();
            let even = radix2(&even);
            let odd = radix2(&odd);

            let half = n / 2;
            let mut out = vec![Complex::new(0.0, 0.0); n];
            for k in 0..half {
                let angle = 2.0 * PI * k as f64 / n as f64;
                let twiddle = Complex::new(angle.cos(), -angle.sin());
                let t = twiddle * odd[k];
                out[k] = even[k] + t;
                out[k + half] = even[k] - t;
            }
            out
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use realfft::RealFftPlanner;

    #[test]
    fn test_fft_size() {
        assert_eq!(fft_size(0), 1);
        assert_eq!(fft_size(1), 1);
        assert_eq!(fft_size(2), 2);
        assert_eq!(fft_size(3), 2);
        assert_eq!(fft_size(1023), 512);
        assert_eq!(fft_size(1024), 1024);
    }

    #[test]
    fn test_output_length_truncates() {
        assert_eq!(fft(&[1; 7]).len(), 4);
        assert_eq!(fft(&[1; 735]).len(), 512);
        assert!(fft(&[]).is_empty());
    }

    #[test]
    fn test_base_cases() {
        assert_eq!(fft(&[42]), vec![Complex::new(42.0, 0.0)]);
        assert_eq!(
            fft(&[5, 3]),
            vec![Complex::new(8.0, 0.0), Complex::new(2.0, 0.0)]
        );
        assert_eq!(fft_real(&[5, 3, 99]), vec![8.0, 2.0]);
    }

    #[test]
    fn test_matches_reference_fft() {
        let n = 256;
        let samples: Vec<Sample> = (0..n)
            .map(|i| ((i as f64 * 0.3).sin() * 1000.0 + (i as f64 * 1.7).cos() * 250.0) as Sample)
            .collect();

        let ours = fft(&samples);

        let mut planner = RealFftPlanner::<f64>::new();
        let plan = planner.plan_fft_forward(n);
        let mut input: Vec<f64> = samples.iter().map(|&s| s as f64).collect();
        let mut reference = plan.make_output_vec();
        plan.process(&mut input, &mut reference).unwrap();

        for (k, r) in reference.iter().enumerate() {
            assert!((ours[k].re - r.re).abs() < 1e-4, "bin {} re", k);
            assert!((ours[k].im - r.im).abs() < 1e-4, "bin {} im", k);
        }
        // Upper half mirrors the lower half for real input
        for k in 1..n / 2 {
            assert!((ours[n - k] - ours[k].conj()).norm() < 1e-4);
        }
    }

    #[test]
    fn test_stretch_fft_length() {
        let samples = vec![100; 735];
        assert_eq!(stretch_fft(&samples, 1000).len(), 512);
        // DC bin holds the (faded) sum
        assert!(stretch_fft(&samples, 1000)[0] > 0.0);
    }
}
