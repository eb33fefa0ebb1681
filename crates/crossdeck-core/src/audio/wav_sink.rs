//! WAV recording sink
//!
//! Records the mixed output to disk instead of (or alongside, via a second
//! engine) a device. Byte chunks are decoded back to samples with the codec,
//! so a write that ends mid-sample is carried over to the next one.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use hound::{SampleFormat, WavSpec, WavWriter};

use super::codec::{decode_sample, sample_bytes};
use super::error::{AudioError, AudioResult};
use super::sink::OutputSink;
use crate::types::PcmFormat;

/// Sink writing integer PCM to a WAV file
pub struct WavRecorderSink {
    path: PathBuf,
    format: Option<PcmFormat>,
    writer: Option<WavWriter<BufWriter<File>>>,
    /// Trailing bytes of an incomplete sample
    pending: Vec<u8>,
}

impl WavRecorderSink {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            format: None,
            writer: None,
            pending: Vec::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl OutputSink for WavRecorderSink {
    fn open(&mut self, format: &PcmFormat, _buffer_bytes: usize) -> AudioResult<()> {
        sample_bytes(format.bits_per_sample)?;
        let spec = WavSpec {
            channels: format.channels,
            sample_rate: format.sample_rate as u32,
            bits_per_sample: format.bits_per_sample,
            sample_format: SampleFormat::Int,
        };
        let writer = WavWriter::create(&self.path, spec)
            .map_err(|e| AudioError::SinkFailed(format!("{}: {}", self.path.display(), e)))?;
        log::info!("Recording output to {:?}", self.path);

        self.writer = Some(writer);
        self.format = Some(*format);
        self.pending.clear();
        Ok(())
    }

    fn available(&self) -> usize {
        usize::MAX
    }

    fn write(&mut self, bytes: &[u8]) -> AudioResult<usize> {
        let (Some(writer), Some(format)) = (self.writer.as_mut(), self.format) else {
            return Err(AudioError::SinkClosed);
        };
        let width = format.bytes_per_sample();
        self.pending.extend_from_slice(bytes);

        let whole = self.pending.len() / width * width;
        for raw in self.pending[..whole].chunks_exact(width) {
            let sample = decode_sample(raw, format.bits_per_sample, format.big_endian)?;
            writer
                .write_sample(sample)
                .map_err(|e| AudioError::SinkFailed(e.to_string()))?;
        }
        self.pending.drain(..whole);
        Ok(bytes.len())
    }

    fn close(&mut self) {
        if let Some(writer) = self.writer.take() {
            match writer.finalize() {
                Ok(()) => log::info!("Recording finalized: {:?}", self.path),
                Err(e) => log::error!("Failed to finalize recording {:?}: {}", self.path, e),
            }
        }
        self.format = None;
    }
}

impl Drop for WavRecorderSink {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_split_samples() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("set.wav");
        let format = PcmFormat::pcm16(8000.0, 2);

        let mut sink = WavRecorderSink::new(&path);
        sink.open(&format, 16).unwrap();
        // 100, -100, 3000, -3000 little endian, split mid-sample
        let bytes: Vec<u8> = [100i16, -100, 3000, -3000]
            .iter()
            .flat_map(|s| s.to_le_bytes())
            .collect();
        assert_eq!(sink.write(&bytes[..3]).unwrap(), 3);
        assert_eq!(sink.write(&bytes[3..]).unwrap(), 5);
        sink.close();

        let mut reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().channels, 2);
        let samples: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(samples, vec![100, -100, 3000, -3000]);
    }

    #[test]
    fn test_rejects_unsupported_depth() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = WavRecorderSink::new(dir.path().join("x.wav"));
        let format = PcmFormat {
            bits_per_sample: 24,
            ..PcmFormat::default()
        };
        assert!(matches!(sink.open(&format, 16), Err(AudioError::UnsupportedBitDepth(24))));
        assert!(matches!(sink.write(&[0, 0]), Err(AudioError::SinkClosed)));
    }
}
