//! Signal processing primitives
//!
//! Pure functions over integer sample slices and [`FrameBuffer`]s. Nothing in
//! here holds state between calls, so every routine can be used from a script
//! while the manager's write lock is held without further synchronization.
//!
//! - [`resample`]: linear up/down sampling
//! - [`stretch`]: block overlap-add time stretch
//! - [`fft`]: recursive radix-2 FFT
//! - [`filter`]: biquad recurrence, cookbook coefficients, mean filter
//! - [`spectrum`]: log-frequency leveling of magnitude spectra
//! - [`noise`]: Gaussian noise generation and mixing
//!
//! [`FrameBuffer`]: crate::types::FrameBuffer

pub mod fft;
pub mod filter;
pub mod noise;
pub mod resample;
pub mod spectrum;
pub mod stretch;

pub use fft::{fft, fft_real, fft_size, stretch_fft};
pub use filter::{bandpass_filter, biquad, mean_filter, peaking_filter, BiquadCoeffs};
pub use noise::{banded_noise_mix, gauss_pair, noise, noise_mix};
pub use resample::{downsample, upsample};
pub use spectrum::log10_leveling;
pub use stretch::{time_stretch, STRETCH_BLOCK_SIZE, STRETCH_FADE_SIZE};

use crate::types::Sample;

/// Fit a sample vector to `len`, truncating or zero-padding the tail
pub fn fit_len(mut samples: Vec<Sample>, len: usize) -> Vec<Sample> {
    samples.resize(len, 0);
    samples
}
