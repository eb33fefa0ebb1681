//! Streaming WAV reader with a bounded history window
//!
//! Decodes forward through the file and keeps the most recent
//! `window_frames` frames. Reads that land inside the window are served from
//! memory (this covers margins and small backward seeks). Short forward gaps
//! are decoded through; anything further away re-positions the decoder and
//! drops the window.

use std::collections::VecDeque;
use std::fs::File;
use std::io::BufReader;

use hound::{SampleFormat, WavReader};

use super::error::{ReaderError, ReaderResult};
use super::{read_window, ReadOutcome, ReaderFactory, SeekableReader};
use crate::types::{PcmFormat, Sample};

/// Default history window (about 3 s at 44.1 kHz)
pub const DEFAULT_WINDOW_FRAMES: usize = 131_072;

/// Factory for [`StreamingReader`]; accepts only WAV files
#[derive(Debug, Clone, Copy)]
pub struct StreamingWavFactory {
    window_frames: usize,
}

impl StreamingWavFactory {
    /// `window_frames` should cover a source's margins plus expected seek jitter
    pub fn new(window_frames: usize) -> Self {
        Self {
            window_frames: window_frames.max(1),
        }
    }
}

impl Default for StreamingWavFactory {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_FRAMES)
    }
}

impl ReaderFactory for StreamingWavFactory {
    fn name(&self) -> &'static str {
        "streaming-wav"
    }

    fn open(&self, file: File, extension: &str) -> ReaderResult<Box<dyn SeekableReader>> {
        if !extension.eq_ignore_ascii_case("wav") {
            return Err(ReaderError::UnsupportedFormat(format!(
                "streaming reader needs a .wav file, got .{}",
                extension
            )));
        }
        Ok(Box::new(StreamingReader::open(file, self.window_frames)?))
    }
}

/// Forward WAV decoder plus a rolling per-channel history
pub struct StreamingReader {
    reader: WavReader<BufReader<File>>,
    format: PcmFormat,
    total: i64,
    window_frames: usize,
    /// Next frame the decoder will produce
    stream_pos: i64,
    /// Recently decoded frames, ending at `stream_pos`
    history: Vec<VecDeque<Sample>>,
    /// Set when a decode failed mid-frame; the decoder must be re-positioned
    desynced: bool,
    head: i64,
}

impl StreamingReader {
    pub fn open(file: File, window_frames: usize) -> ReaderResult<Self> {
        let reader = WavReader::new(BufReader::new(file))?;
        let spec = reader.spec();
        if spec.sample_format != SampleFormat::Int {
            return Err(ReaderError::UnsupportedFormat("floating point WAV".to_string()));
        }
        let format = PcmFormat {
            sample_rate: spec.sample_rate as f32,
            channels: spec.channels,
            bits_per_sample: spec.bits_per_sample,
            big_endian: false,
        };
        let total = reader.duration() as i64;
        log::info!(
            "Streaming {} frames ({} ch, {}Hz, {} bit), window {} frames",
            total,
            spec.channels,
            spec.sample_rate,
            spec.bits_per_sample,
            window_frames
        );

        Ok(Self {
            reader,
            format,
            total,
            window_frames: window_frames.max(1),
            stream_pos: 0,
            history: vec![VecDeque::new(); spec.channels as usize],
            desynced: false,
            head: 0,
        })
    }

    pub fn total_frames(&self) -> i64 {
        self.total
    }

    fn history_len(&self) -> i64 {
        self.history.first().map_or(0, |h| h.len()) as i64
    }

    /// First frame still held in the window
    fn history_start(&self) -> i64 {
        self.stream_pos - self.history_len()
    }

    /// Jump the decoder to `frame` and forget the window
    fn reposition(&mut self, frame: i64) -> ReaderResult<()> {
        log::debug!("StreamingReader: reposition {} -> {}", self.stream_pos, frame);
        self.reader.seek(frame as u32)?;
        self.stream_pos = frame;
        for h in &mut self.history {
            h.clear();
        }
        self.desynced = false;
        Ok(())
    }

    /// Decode forward until `stream_pos` reaches `until`
    ///
    /// Frames enter the history whole. On failure the history is dropped
    /// and the next fill re-positions the decoder.
    fn decode_to(&mut self, until: i64) -> ReaderResult<()> {
        let result = self.decode_frames(until);
        if result.is_err() {
            for h in &mut self.history {
                h.clear();
            }
            self.desynced = true;
        }
        result
    }

    fn decode_frames(&mut self, until: i64) -> ReaderResult<()> {
        let mut frame = vec![0 as Sample; self.history.len()];
        let mut samples = self.reader.samples::<i32>();
        while self.stream_pos < until {
            for slot in frame.iter_mut() {
                *slot = samples
                    .next()
                    .ok_or_else(|| ReaderError::Decode("unexpected end of WAV data".to_string()))??;
            }
            for (h, &sample) in self.history.iter_mut().zip(&frame) {
                h.push_back(sample);
            }
            self.stream_pos += 1;
        }
        Ok(())
    }

    /// Drop history beyond the window
    fn trim(&mut self) {
        for h in &mut self.history {
            let excess = h.len().saturating_sub(self.window_frames);
            h.drain(..excess);
        }
    }

    /// Make frames `[lo, hi)` resident in the history
    fn fill(&mut self, lo: i64, hi: i64) -> ReaderResult<()> {
        let start = self.history_start();
        let behind = lo < start;
        let far_ahead = lo > self.stream_pos + self.window_frames as i64;
        if behind || far_ahead || self.desynced {
            self.reposition(lo)?;
        }
        self.decode_to(hi)
    }
}

impl SeekableReader for StreamingReader {
    fn format(&self) -> PcmFormat {
        self.format
    }

    fn seek(&mut self, frame: i64) {
        self.head = frame;
    }

    fn read(&mut self, frames: usize) -> ReaderResult<ReadOutcome> {
        let head = self.head;
        self.head += frames as i64;

        let lo = head.max(0);
        let hi = (head + frames as i64).min(self.total);
        if lo < hi {
            self.fill(lo, hi)?;
        }

        let start = self.history_start();
        let history = &self.history;
        let outcome = read_window(&self.format, head, frames, self.total, |c, pos| {
            history[c][(pos - start) as usize]
        });
        self.trim();
        Ok(outcome)
    }
}
