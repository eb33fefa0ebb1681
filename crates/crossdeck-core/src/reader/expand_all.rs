//! Fully-buffered reader
//!
//! Decodes the entire file into memory when opened. Best for short clips and
//! compressed formats where random access in the container is expensive.

use std::fs::File;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use super::error::{ReaderError, ReaderResult};
use super::{read_window, ReadOutcome, ReaderFactory, SeekableReader};
use crate::types::PcmFormat;

/// Factory for [`ExpandAllReader`]
#[derive(Debug, Clone, Copy, Default)]
pub struct ExpandAllFactory;

impl ReaderFactory for ExpandAllFactory {
    fn name(&self) -> &'static str {
        "expand-all"
    }

    fn open(&self, file: File, extension: &str) -> ReaderResult<Box<dyn SeekableReader>> {
        Ok(Box::new(ExpandAllReader::decode(file, extension)?))
    }
}

/// In-memory 16-bit PCM with a free-moving read head
#[derive(Debug, Clone)]
pub struct ExpandAllReader {
    format: PcmFormat,
    /// Interleaved samples
    samples: Vec<i16>,
    /// Frame count
    total: i64,
    head: i64,
}

impl ExpandAllReader {
    /// Wrap already decoded interleaved samples
    pub fn from_samples(sample_rate: f32, channels: u16, samples: Vec<i16>) -> Self {
        let channels = channels.max(1);
        let total = (samples.len() / channels as usize) as i64;
        Self {
            format: PcmFormat::pcm16(sample_rate, channels),
            samples,
            total,
            head: 0,
        }
    }

    /// Decode the whole stream with symphonia
    pub fn decode(file: File, extension: &str) -> ReaderResult<Self> {
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if !extension.is_empty() {
            hint.with_extension(extension);
        }

        let probed = symphonia::default::get_probe()
            .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
            .map_err(|e| ReaderError::UnsupportedFormat(e.to_string()))?;
        let mut container = probed.format;

        let track = container
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or(ReaderError::NoAudioTrack)?;
        let track_id = track.id;
        let sample_rate = track
            .codec_params
            .sample_rate
            .ok_or_else(|| ReaderError::UnsupportedFormat("Unknown sample rate".to_string()))?;
        let mut channels = track
            .codec_params
            .channels
            .map(|c| c.count() as u16)
            .unwrap_or(2);

        let mut decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| ReaderError::UnsupportedFormat(e.to_string()))?;

        let mut samples: Vec<i16> = Vec::new();
        let mut sample_buf: Option<SampleBuffer<i16>> = None;

        loop {
            let packet = match container.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break;
                }
                Err(SymphoniaError::ResetRequired) => break,
                Err(e) => return Err(ReaderError::Decode(e.to_string())),
            };
            if packet.track_id() != track_id {
                continue;
            }

            let decoded = match decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(SymphoniaError::DecodeError(e)) => {
                    log::warn!("Skipping undecodable packet: {}", e);
                    continue;
                }
                Err(e) => return Err(ReaderError::Decode(e.to_string())),
            };

            if sample_buf.is_none() {
                let spec = *decoded.spec();
                channels = spec.channels.count() as u16;
                sample_buf = Some(SampleBuffer::new(decoded.capacity() as u64, spec));
            }
            if let Some(buf) = sample_buf.as_mut() {
                buf.copy_interleaved_ref(decoded);
                samples.extend_from_slice(buf.samples());
            }
        }

        let reader = Self::from_samples(sample_rate as f32, channels, samples);
        log::info!(
            "Decoded {} frames ({} ch, {}Hz) into memory",
            reader.total,
            reader.format.channels,
            sample_rate
        );
        Ok(reader)
    }

    /// Length of the stream in frames
    pub fn total_frames(&self) -> i64 {
        self.total
    }
}

impl SeekableReader for ExpandAllReader {
    fn format(&self) -> PcmFormat {
        self.format
    }

    fn seek(&mut self, frame: i64) {
        self.head = frame;
    }

    fn read(&mut self, frames: usize) -> ReaderResult<ReadOutcome> {
        let channels = self.format.channels as usize;
        let samples = &self.samples;
        let outcome = read_window(&self.format, self.head, frames, self.total, |c, pos| {
            samples[pos as usize * channels + c] as i32
        });
        self.head += frames as i64;
        Ok(outcome)
    }
}
