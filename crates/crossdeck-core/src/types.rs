//! Common types for Crossdeck
//!
//! This module contains the fundamental audio types passed between every
//! part of the engine: the immutable multi-channel [`FrameBuffer`], the PCM
//! stream description [`PcmFormat`], and source identifiers.

use std::fmt;
use std::hash::{Hash, Hasher};

/// Default output sample rate (CD quality)
pub const SAMPLE_RATE: u32 = 44100;

/// Default tick length in frames (735 frames = 60 ticks/s at 44.1kHz)
pub const DEFAULT_BUFFER_SIZE: usize = 735;

/// Integer PCM sample, wide enough for every supported bit depth
pub type Sample = i32;

/// Identifier of a source in the manager's registry
///
/// Ids come from a monotonic counter starting at 1 and are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceId(pub u64);

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Description of an interleaved integer PCM stream
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PcmFormat {
    pub sample_rate: f32,
    pub channels: u16,
    pub bits_per_sample: u16,
    pub big_endian: bool,
}

impl PcmFormat {
    /// Signed 16-bit little-endian PCM, the format every decoder produces
    pub fn pcm16(sample_rate: f32, channels: u16) -> Self {
        Self {
            sample_rate,
            channels,
            bits_per_sample: 16,
            big_endian: false,
        }
    }

    /// Bytes occupied by one sample of one channel
    #[inline]
    pub fn bytes_per_sample(&self) -> usize {
        (self.bits_per_sample / 8) as usize
    }

    /// Bytes occupied by one interleaved frame
    #[inline]
    pub fn frame_size(&self) -> usize {
        self.bytes_per_sample() * self.channels as usize
    }
}

impl Default for PcmFormat {
    fn default() -> Self {
        Self::pcm16(SAMPLE_RATE as f32, 2)
    }
}

/// Immutable multi-channel sample array
///
/// Samples are stored channel-major: `data[channel][frame]`. Every channel
/// holds exactly [`frame_count`](Self::frame_count) samples. Operations that
/// look like mutation (`modify`, `modify_between`, `take`) build a new buffer.
///
/// Strict access ([`get`](Self::get)) panics out of range; the lenient
/// accessors ([`try_get`](Self::try_get), [`get_or_zero`](Self::get_or_zero))
/// accept any index, including negative frames.
#[derive(Debug, Clone)]
pub struct FrameBuffer {
    sample_rate: f32,
    frame_count: usize,
    data: Vec<Vec<Sample>>,
}

impl FrameBuffer {
    /// Buffer with no channels and no frames
    pub fn empty(sample_rate: f32) -> Self {
        Self {
            sample_rate,
            frame_count: 0,
            data: Vec::new(),
        }
    }

    /// Zero-filled buffer
    pub fn silence(sample_rate: f32, channels: usize, frame_count: usize) -> Self {
        Self {
            sample_rate,
            frame_count,
            data: vec![vec![0; frame_count]; channels],
        }
    }

    /// Build a buffer by evaluating `f(channel, frame)` for every cell
    pub fn from_fn<F>(sample_rate: f32, channels: usize, frame_count: usize, mut f: F) -> Self
    where
        F: FnMut(usize, usize) -> Sample,
    {
        let data = (0..channels)
            .map(|c| (0..frame_count).map(|i| f(c, i)).collect())
            .collect();
        Self {
            sample_rate,
            frame_count,
            data,
        }
    }

    /// Build a buffer from per-channel sample vectors
    ///
    /// Every channel is fitted to `frame_count`: short channels are padded
    /// with zero, long ones are truncated.
    pub fn from_channels(sample_rate: f32, frame_count: usize, channels: Vec<Vec<Sample>>) -> Self {
        let data = channels
            .into_iter()
            .map(|mut ch| {
                ch.resize(frame_count, 0);
                ch
            })
            .collect();
        Self {
            sample_rate,
            frame_count,
            data,
        }
    }

    #[inline]
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    #[inline]
    pub fn channel_count(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.frame_count == 0 || self.data.is_empty()
    }

    /// Strict accessor; panics when either index is out of range
    #[inline]
    pub fn get(&self, channel: usize, frame: usize) -> Sample {
        self.data[channel][frame]
    }

    /// Lenient accessor; `None` when either index is out of range
    #[inline]
    pub fn try_get(&self, channel: usize, frame: i64) -> Option<Sample> {
        if frame < 0 {
            return None;
        }
        self.data
            .get(channel)
            .and_then(|ch| ch.get(frame as usize))
            .copied()
    }

    /// Lenient accessor; zero when either index is out of range
    #[inline]
    pub fn get_or_zero(&self, channel: usize, frame: i64) -> Sample {
        self.try_get(channel, frame).unwrap_or(0)
    }

    /// All samples of one channel
    pub fn channel(&self, channel: usize) -> &[Sample] {
        &self.data[channel]
    }

    /// One sample per channel at `frame`
    pub fn frame(&self, frame: usize) -> Vec<Sample> {
        self.data.iter().map(|ch| ch[frame]).collect()
    }

    /// Materialize frames `[begin, end)` as a new buffer
    ///
    /// `end` is clamped to the frame count. An empty range yields a buffer
    /// with no channels and no frames at the same sample rate.
    pub fn take(&self, begin: usize, end: usize) -> Self {
        let end = end.min(self.frame_count);
        if end <= begin {
            return Self::empty(self.sample_rate);
        }
        Self {
            sample_rate: self.sample_rate,
            frame_count: end - begin,
            data: self.data.iter().map(|ch| ch[begin..end].to_vec()).collect(),
        }
    }

    /// New buffer with every cell replaced by `f(channel, frame, old)`
    pub fn modify<F>(&self, mut f: F) -> Self
    where
        F: FnMut(usize, usize, Sample) -> Sample,
    {
        let data = self
            .data
            .iter()
            .enumerate()
            .map(|(c, ch)| ch.iter().enumerate().map(|(i, &old)| f(c, i, old)).collect())
            .collect();
        Self {
            sample_rate: self.sample_rate,
            frame_count: self.frame_count,
            data,
        }
    }

    /// Like [`modify`](Self::modify), restricted to frames in `[begin, end)`
    ///
    /// `f` receives the frame index relative to `begin`. The range may start
    /// before zero or end past the frame count; frames outside the buffer are
    /// never produced, and an empty range returns an identical buffer.
    pub fn modify_between<F>(&self, begin: i64, end: i64, mut f: F) -> Self
    where
        F: FnMut(usize, usize, Sample) -> Sample,
    {
        let lo = begin.max(0);
        let hi = end.min(self.frame_count as i64);
        if hi <= lo {
            return self.clone();
        }
        let mut data = self.data.clone();
        for (c, ch) in data.iter_mut().enumerate() {
            for i in lo..hi {
                let idx = i as usize;
                ch[idx] = f(c, (i - begin) as usize, ch[idx]);
            }
        }
        Self {
            sample_rate: self.sample_rate,
            frame_count: self.frame_count,
            data,
        }
    }

    /// Rebuild every channel with `f(channel, samples)`
    ///
    /// Results are fitted back to the current frame count.
    pub fn modify_by_channel<F>(&self, mut f: F) -> Self
    where
        F: FnMut(usize, &[Sample]) -> Vec<Sample>,
    {
        let channels = self
            .data
            .iter()
            .enumerate()
            .map(|(c, ch)| f(c, ch))
            .collect();
        Self::from_channels(self.sample_rate, self.frame_count, channels)
    }

    /// Same samples, different nominal sample rate
    pub fn with_sample_rate(mut self, sample_rate: f32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    /// Consume the buffer, returning its channel vectors
    pub fn into_channels(self) -> Vec<Vec<Sample>> {
        self.data
    }
}

impl PartialEq for FrameBuffer {
    fn eq(&self, other: &Self) -> bool {
        self.sample_rate.to_bits() == other.sample_rate.to_bits()
            && self.frame_count == other.frame_count
            && self.data == other.data
    }
}

impl Eq for FrameBuffer {}

impl Hash for FrameBuffer {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.sample_rate.to_bits().hash(state);
        self.frame_count.hash(state);
        self.data.len().hash(state);
        self.data.first().and_then(|ch| ch.first()).hash(state);
        self.data.last().and_then(|ch| ch.last()).hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(channels: usize, frames: usize) -> FrameBuffer {
        FrameBuffer::from_fn(44100.0, channels, frames, |c, f| (c * 1000 + f) as Sample)
    }

    #[test]
    fn test_take_empty_range() {
        let b = ramp(2, 16);
        for x in [0, 5, 16, 20] {
            assert_eq!(b.take(x, x).frame_count(), 0);
        }
        let t = b.take(9, 3);
        assert_eq!(t.frame_count(), 0);
        assert_eq!(t.sample_rate(), 44100.0);
    }

    #[test]
    fn test_take_whole_is_identity() {
        let b = ramp(2, 16);
        assert_eq!(b.take(0, b.frame_count()), b);
    }

    #[test]
    fn test_take_sub_range() {
        let b = ramp(2, 16);
        let t = b.take(4, 8);
        assert_eq!(t.frame_count(), 4);
        assert_eq!(t.channel(1), &[1004, 1005, 1006, 1007]);
    }

    #[test]
    fn test_modify_between_empty_range_is_identity() {
        let b = ramp(2, 8);
        assert_eq!(b.modify_between(5, 5, |_, _, _| 99), b);
        assert_eq!(b.modify_between(6, 2, |_, _, _| 99), b);
        assert_eq!(b.modify_between(-10, -3, |_, _, _| 99), b);
        assert_eq!(b.modify_between(20, 30, |_, _, _| 99), b);
    }

    #[test]
    fn test_modify_between_local_index() {
        let b = FrameBuffer::silence(8000.0, 1, 6);
        // Range starts before the buffer: frame 0 is local index 2
        let m = b.modify_between(-2, 3, |_, local, _| local as Sample);
        assert_eq!(m.channel(0), &[2, 3, 4, 0, 0, 0]);

        let m = b.modify_between(4, 100, |_, local, _| 10 + local as Sample);
        assert_eq!(m.channel(0), &[0, 0, 0, 0, 10, 11]);
    }

    #[test]
    fn test_lenient_accessors() {
        let b = ramp(1, 4);
        assert_eq!(b.try_get(0, -1), None);
        assert_eq!(b.try_get(0, 4), None);
        assert_eq!(b.try_get(1, 0), None);
        assert_eq!(b.try_get(0, 3), Some(3));
        assert_eq!(b.get_or_zero(3, 2), 0);
        assert_eq!(b.get_or_zero(0, 2), 2);
    }

    #[test]
    #[should_panic]
    fn test_strict_get_out_of_range() {
        let b = ramp(1, 4);
        b.get(0, 4);
    }

    #[test]
    fn test_modify_by_channel_fits_length() {
        let b = ramp(2, 4);
        let m = b.modify_by_channel(|c, _| if c == 0 { vec![1, 2] } else { vec![9; 10] });
        assert_eq!(m.frame_count(), 4);
        assert_eq!(m.channel(0), &[1, 2, 0, 0]);
        assert_eq!(m.channel(1), &[9, 9, 9, 9]);
    }

    #[test]
    fn test_structural_equality() {
        let a = ramp(2, 8);
        let b = ramp(2, 8);
        assert_eq!(a, b);
        assert_ne!(a, b.clone().with_sample_rate(48000.0));
        assert_ne!(a, a.modify(|_, _, v| v + 1));

        let mut set = std::collections::HashSet::new();
        set.insert(a.clone());
        assert!(set.contains(&b));
    }

    #[test]
    fn test_frame_and_channel() {
        let b = ramp(3, 4);
        assert_eq!(b.frame(2), vec![2, 1002, 2002]);
        assert_eq!(b.channel(2).len(), 4);
    }

    #[test]
    fn test_pcm_format_sizes() {
        let f = PcmFormat::pcm16(44100.0, 2);
        assert_eq!(f.bytes_per_sample(), 2);
        assert_eq!(f.frame_size(), 4);
    }
}
