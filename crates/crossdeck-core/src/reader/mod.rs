//! Seekable PCM readers
//!
//! A [`SeekableReader`] turns an opened file into integer PCM frames and can
//! seek anywhere, including before the start or past the end of the stream.
//! Frames outside the stream read as silence. Reads report how much of the
//! returned buffer is real audio through [`ReadLength`].
//!
//! Readers are built by a [`ReaderFactory`] chosen when a source is created:
//!
//! - [`ExpandAllFactory`]: decodes the whole file up front (any container
//!   symphonia understands); seeks are index arithmetic
//! - [`StreamingWavFactory`]: streams a WAV file with a bounded history
//!   window, re-positioning the decoder for long jumps

mod error;
mod expand_all;
mod streaming;

use std::fs::File;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub use error::{ReaderError, ReaderResult};
pub use expand_all::{ExpandAllFactory, ExpandAllReader};
pub use streaming::{StreamingReader, StreamingWavFactory, DEFAULT_WINDOW_FRAMES};

use crate::types::{FrameBuffer, PcmFormat};

/// How much of a read is backed by the stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadLength {
    /// Frames from the read position up to end-of-stream (capped at the
    /// request). Frames before position 0 count as available.
    Filled(usize),
    /// The read started at or past end-of-stream
    Exhausted,
}

impl ReadLength {
    /// Leading frames of a `requested`-frame read that hold real data
    pub fn valid_frames(self, requested: usize) -> usize {
        match self {
            ReadLength::Filled(n) => n.min(requested),
            ReadLength::Exhausted => 0,
        }
    }

    pub fn is_exhausted(self) -> bool {
        matches!(self, ReadLength::Exhausted)
    }
}

/// Result of [`SeekableReader::read`]
#[derive(Debug, Clone)]
pub struct ReadOutcome {
    pub buffer: FrameBuffer,
    pub length: ReadLength,
}

/// Decoder positioned at an arbitrary frame
pub trait SeekableReader: Send + Sync {
    /// Stream format (samples are always delivered as integers)
    fn format(&self) -> PcmFormat;

    /// Move the read position; any value is accepted
    fn seek(&mut self, frame: i64);

    /// Read `frames` frames from the current position and advance past them
    fn read(&mut self, frames: usize) -> ReaderResult<ReadOutcome>;
}

/// Strategy that builds a reader from an opened file
pub trait ReaderFactory: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Build a reader; `extension` (without dot) hints the container
    fn open(&self, file: File, extension: &str) -> ReaderResult<Box<dyn SeekableReader>>;
}

/// Serializable reader selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReaderChoice {
    ExpandAll,
    Streaming { window_frames: usize },
}

impl Default for ReaderChoice {
    fn default() -> Self {
        ReaderChoice::ExpandAll
    }
}

impl ReaderChoice {
    pub fn factory(self) -> Arc<dyn ReaderFactory> {
        match self {
            ReaderChoice::ExpandAll => Arc::new(ExpandAllFactory),
            ReaderChoice::Streaming { window_frames } => {
                Arc::new(StreamingWavFactory::new(window_frames))
            }
        }
    }
}

/// Build the zero-padded output buffer shared by both strategies
///
/// `sample_at(channel, frame)` is only called for frames in `[0, total)`.
pub(crate) fn read_window<F>(
    format: &PcmFormat,
    head: i64,
    frames: usize,
    total: i64,
    mut sample_at: F,
) -> ReadOutcome
where
    F: FnMut(usize, i64) -> crate::types::Sample,
{
    let buffer = FrameBuffer::from_fn(format.sample_rate, format.channels as usize, frames, |c, f| {
        let pos = head + f as i64;
        if (0..total).contains(&pos) {
            sample_at(c, pos)
        } else {
            0
        }
    });
    ReadOutcome {
        buffer,
        length: read_length(head, frames, total),
    }
}

/// Valid length of a read of `frames` starting at `head`
pub(crate) fn read_length(head: i64, frames: usize, total: i64) -> ReadLength {
    if head >= total {
        ReadLength::Exhausted
    } else {
        ReadLength::Filled(((total - head) as usize).min(frames))
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_length() {
        assert_eq!(read_length(0, 10, 100), ReadLength::Filled(10));
        assert_eq!(read_length(95, 10, 100), ReadLength::Filled(5));
        assert_eq!(read_length(-20, 10, 100), ReadLength::Filled(10));
        assert_eq!(read_length(100, 10, 100), ReadLength::Exhausted);
        assert_eq!(read_length(150, 10, 100), ReadLength::Exhausted);
    }

    #[test]
    fn test_valid_frames() {
        assert_eq!(ReadLength::Filled(7).valid_frames(10), 7);
        assert_eq!(ReadLength::Filled(70).valid_frames(10), 10);
        assert_eq!(ReadLength::Exhausted.valid_frames(10), 0);
    }

    #[test]
    fn test_reader_choice_yaml() {
        let choice: ReaderChoice =
            serde_yaml::from_str("streaming:\n  window_frames: 4096\n").unwrap();
        assert_eq!(choice, ReaderChoice::Streaming { window_frames: 4096 });
        assert_eq!(choice.factory().name(), "streaming-wav");
        assert_eq!(ReaderChoice::default().factory().name(), "expand-all");
    }
}
