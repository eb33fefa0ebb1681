//! Engine configuration

use serde::{Deserialize, Serialize};

use crate::audio::{AudioResult, CpalSink, OutputSink, SinkFactory};
use crate::cue::CueFormat;
use crate::reader::ReaderChoice;
use crate::types::{PcmFormat, DEFAULT_BUFFER_SIZE, SAMPLE_RATE};

/// Rendered output format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputFormatConfig {
    /// Default: 44100
    pub sample_rate: u32,
    /// Default: 2
    pub channels: u16,
    /// 8, 16 or 32. Default: 16
    pub bits_per_sample: u16,
    /// Default: false (little-endian)
    pub big_endian: bool,
}

impl Default for OutputFormatConfig {
    fn default() -> Self {
        Self {
            sample_rate: SAMPLE_RATE,
            channels: 2,
            bits_per_sample: 16,
            big_endian: false,
        }
    }
}

impl OutputFormatConfig {
    pub fn pcm_format(&self) -> PcmFormat {
        PcmFormat {
            sample_rate: self.sample_rate as f32,
            channels: self.channels,
            bits_per_sample: self.bits_per_sample,
            big_endian: self.big_endian,
        }
    }
}

/// Everything needed to build a manager and start rendering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub output: OutputFormatConfig,

    /// Frames rendered per tick
    /// Default: 735 (60 ticks/s at 44.1kHz)
    pub buffer_size: usize,

    /// Look-behind frames around each tick
    /// Default: one tick
    pub margin_before: usize,

    /// Look-ahead frames around each tick. Speeding a source up by `v`
    /// reads `buffer_size * (v - 1)` frames into this margin.
    /// Default: one tick
    pub margin_after: usize,

    /// How sources open their files
    pub reader: ReaderChoice,

    /// Cue category and tag names
    pub cue_format: CueFormat,

    /// Output device name; `None` uses the system default
    pub device: Option<String>,

    /// Device ring buffer length in ticks
    /// Default: 4
    pub sink_capacity_ticks: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            output: OutputFormatConfig::default(),
            buffer_size: DEFAULT_BUFFER_SIZE,
            margin_before: DEFAULT_BUFFER_SIZE,
            margin_after: DEFAULT_BUFFER_SIZE,
            reader: ReaderChoice::default(),
            cue_format: CueFormat::default(),
            device: None,
            sink_capacity_ticks: 4,
        }
    }
}

impl EngineConfig {
    pub fn output_format(&self) -> PcmFormat {
        self.output.pcm_format()
    }

    /// Factory for a device sink on the configured output device
    pub fn device_sink_factory(&self) -> SinkFactory {
        let device = self.device.clone();
        let capacity = self.sink_capacity_ticks;
        Box::new(move || -> AudioResult<Box<dyn OutputSink>> {
            Ok(Box::new(CpalSink::new(device, capacity)))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.buffer_size, 735);
        assert_eq!(config.margin_before, config.buffer_size);
        assert_eq!(config.output_format(), PcmFormat::default());
        assert_eq!(config.reader, ReaderChoice::ExpandAll);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = "
buffer_size: 1024
output:
  bits_per_sample: 32
  big_endian: true
reader: !streaming
  window_frames: 65536
cue_format:
  category_bpm: tempo
";
        let config: EngineConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.buffer_size, 1024);
        assert_eq!(config.margin_after, 735);
        assert_eq!(config.output.sample_rate, 44100);
        assert_eq!(config.output_format().bits_per_sample, 32);
        assert!(config.output_format().big_endian);
        assert_eq!(config.reader, ReaderChoice::Streaming { window_frames: 65536 });
        assert_eq!(config.cue_format.category_bpm, "tempo");
        assert_eq!(config.cue_format.category_play, "play");
    }
}
