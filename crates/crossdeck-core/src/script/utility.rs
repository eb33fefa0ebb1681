//! Per-source processing helpers
//!
//! These rewrite a source's process buffer from the end of the margin-before
//! region onward and move its seek target by however much of the stream the
//! rewritten tick consumed. The margin-before region is left untouched.

pub use crate::dsp::{banded_noise_mix, noise_mix};

use crate::dsp::{downsample, fit_len, time_stretch, upsample};
use crate::source::AudioSource;
use crate::types::Sample;

/// Rebuild every channel's post-margin region with `f`
fn map_after_margin<F>(source: &mut AudioSource, mut f: F)
where
    F: FnMut(&[Sample]) -> Vec<Sample>,
{
    let split = source.margin_before();
    let keep = source.buffer_size() + source.margin_after();
    source.map_process_buffer(|buffer| {
        buffer.modify_by_channel(|_, ch| {
            let split = split.min(ch.len());
            let mut out = ch[..split].to_vec();
            out.extend(fit_len(f(&ch[split..]), keep));
            out
        })
    });
}

/// Play the source `v` times faster (pitch kept) from its head onward
///
/// Speeding up reads past the margin-after region; frames that are not
/// available there become silence. Size margins for the largest `v` used.
pub fn time_stretch_source(source: &mut AudioSource, v: f64) {
    if v <= 0.0 {
        return;
    }
    map_after_margin(source, |d| time_stretch(d, (d.len() as f64 / v) as usize));
    let head = source.head();
    source.seek(head + ((source.seek_target() - head) as f64 * v) as i64);
}

/// Resample from the head onward by `mag` (> 1 stretches, < 1 shrinks)
///
/// Changes pitch and speed together.
pub fn resample_source(source: &mut AudioSource, mag: f64) {
    if mag > 1.0 {
        map_after_margin(source, |d| upsample(d, mag));
    } else if mag > 0.0 && mag < 1.0 {
        map_after_margin(source, |d| downsample(d, mag));
    } else {
        return;
    }
    let head = source.head();
    source.seek(head + ((source.seek_target() - head) as f64 / mag) as i64);
}

/// Play `v` times faster at `p` times the pitch
pub fn change_speed(source: &mut AudioSource, v: f64, p: f64) {
    if p <= 0.0 {
        return;
    }
    time_stretch_source(source, v / p);
    if p != 1.0 {
        resample_source(source, 1.0 / p);
    }
}
