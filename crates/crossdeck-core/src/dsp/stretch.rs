//! Block overlap-add time stretch
//!
//! The source is cut into fixed blocks that are written back to back at the
//! output rate while the read cursor advances at the stretch rate. Each block
//! fades in over its first [`STRETCH_FADE_SIZE`] frames and spills a fade-out
//! of the same length into the start of the next block.

use crate::types::Sample;

/// Analysis block length in frames
///
/// About half the period of a 20 Hz tone at 44.1 kHz, so bass content is not
/// chopped into pieces shorter than one cycle.
pub const STRETCH_BLOCK_SIZE: usize = 1100;

/// Length of the linear cross-fade between blocks
pub const STRETCH_FADE_SIZE: usize = 100;

#[inline]
fn fade_in(i: usize) -> f32 {
    i as f32 / STRETCH_FADE_SIZE as f32
}

#[inline]
fn fade_out(i: usize) -> f32 {
    (STRETCH_FADE_SIZE - i) as f32 / STRETCH_FADE_SIZE as f32
}

/// Stretch `src` to exactly `target_len` frames
///
/// The playback rate is `src.len() / target_len`: a shorter target plays
/// faster. Reads that run past the end of `src` stop the current segment and
/// leave zeros behind.
pub fn time_stretch(src: &[Sample], target_len: usize) -> Vec<Sample> {
    // Overlapping fades can sum past the sample range; saturate at the end
    let mut out = vec![0i64; target_len];
    if target_len == 0 {
        return Vec::new();
    }
    let rate = src.len() as f64 / target_len as f64;
    let advance = (STRETCH_BLOCK_SIZE as f64 * rate) as usize;

    // Leading fade-out, so the first block's fade-in sums to unity
    for i in 0..STRETCH_FADE_SIZE.min(target_len).min(src.len()) {
        out[i] = (src[i] as f64 * fade_out(i) as f64) as i64;
    }

    let mut read = 0usize;
    let mut write = 0usize;
    while write + 1 < target_len {
        add_segment(&mut out, src, write, read, 0, STRETCH_FADE_SIZE, fade_in);
        add_segment(
            &mut out,
            src,
            write,
            read,
            STRETCH_FADE_SIZE,
            STRETCH_BLOCK_SIZE - STRETCH_FADE_SIZE,
            |_| 1.0,
        );
        add_segment(
            &mut out,
            src,
            write,
            read,
            STRETCH_BLOCK_SIZE,
            STRETCH_FADE_SIZE,
            fade_out,
        );
        write += STRETCH_BLOCK_SIZE;
        read += advance;
    }
    out.into_iter()
        .map(|v| v.clamp(Sample::MIN as i64, Sample::MAX as i64) as Sample)
        .collect()
}

/// Accumulate `len` gained frames starting `offset` into the current block
fn add_segment<G>(
    out: &mut [i64],
    src: &[Sample],
    write: usize,
    read: usize,
    offset: usize,
    len: usize,
    gain: G,
) where
    G: Fn(usize) -> f32,
{
    for i in 0..len {
        let (dst, from) = (write + offset + i, read + offset + i);
        if dst >= out.len() || from >= src.len() {
            break;
        }
        out[dst] += (src[from] as f64 * gain(i) as f64) as i64;
    }
}
