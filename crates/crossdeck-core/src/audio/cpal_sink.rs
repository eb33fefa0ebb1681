//! CPAL device sink
//!
//! The render thread produces integer PCM bytes; the cpal callback runs on
//! the device's own thread and wants `f32` frames. A lock-free byte ring
//! (rtrb SPSC) sits between them:
//!
//! ```text
//! ┌──────────────────┐  write()   ┌──────────────────┐  pop()   ┌────────────────┐
//! │  Render Thread   │──────────► │  Byte Ring (SPSC)│────────► │ CPAL Callback  │
//! │ (AudioRoutine)   │  blocks    │  N ticks deep    │ decode   │ (device thread)│
//! └──────────────────┘  when full └──────────────────┘ to f32   └────────────────┘
//! ```
//!
//! The callback plays silence when the ring runs dry. `write` blocks until
//! the callback has drained at least one byte.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{SampleFormat, Stream, StreamConfig};

use super::codec::{decode_sample, full_scale, sample_bytes};
use super::device::resolve_output_device;
use super::error::{AudioError, AudioResult};
use super::sink::OutputSink;
use crate::types::PcmFormat;

/// Poll interval while waiting for the ring to drain
const DRAIN_POLL: Duration = Duration::from_millis(1);

/// Output sink backed by a cpal stream
pub struct CpalSink {
    /// Device name; `None` picks the default output
    device_name: Option<String>,
    /// Ring depth in ticks
    capacity_ticks: usize,
    stream: Option<Stream>,
    producer: Option<rtrb::Producer<u8>>,
    /// Set by the stream error callback
    failed: Arc<AtomicBool>,
}

impl CpalSink {
    pub fn new(device_name: Option<String>, capacity_ticks: usize) -> Self {
        Self {
            device_name,
            capacity_ticks: capacity_ticks.max(2),
            stream: None,
            producer: None,
            failed: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl OutputSink for CpalSink {
    fn open(&mut self, format: &PcmFormat, buffer_bytes: usize) -> AudioResult<()> {
        sample_bytes(format.bits_per_sample)?;

        let device = resolve_output_device(self.device_name.as_deref())?;
        let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        log::info!("Using audio device: {}", device_name);

        let stream_config = get_output_config(&device, format)?;
        let capacity = buffer_bytes * self.capacity_ticks;
        let (producer, consumer) = rtrb::RingBuffer::<u8>::new(capacity);
        log::debug!(
            "Output ring buffer created with capacity {} bytes ({} ticks)",
            capacity,
            self.capacity_ticks
        );

        self.failed.store(false, Ordering::Release);
        let failed = self.failed.clone();
        let stream = build_output_stream(&device, &stream_config, *format, consumer, failed)?;
        stream
            .play()
            .map_err(|e| AudioError::StreamPlayError(e.to_string()))?;

        log::info!(
            "Audio stream started: {} channels, {}Hz, {} bit source",
            stream_config.channels,
            stream_config.sample_rate.0,
            format.bits_per_sample
        );

        self.stream = Some(stream);
        self.producer = Some(producer);
        Ok(())
    }

    fn available(&self) -> usize {
        self.producer.as_ref().map_or(0, |p| p.slots())
    }

    fn write(&mut self, bytes: &[u8]) -> AudioResult<usize> {
        let producer = self.producer.as_mut().ok_or(AudioError::SinkClosed)?;
        if bytes.is_empty() {
            return Ok(0);
        }
        while producer.slots() == 0 {
            if self.failed.load(Ordering::Acquire) {
                return Err(AudioError::StreamError("stream stopped".to_string()));
            }
            std::thread::sleep(DRAIN_POLL);
        }
        let mut written = 0;
        for &b in bytes {
            if producer.push(b).is_err() {
                break;
            }
            written += 1;
        }
        Ok(written)
    }

    fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            if let Err(e) = stream.pause() {
                log::warn!("Failed to pause audio stream: {}", e);
            }
        }
        self.producer = None;
        log::info!("Audio stream closed");
    }
}

/// Pick a device config matching the source format as closely as possible
fn get_output_config(device: &cpal::Device, format: &PcmFormat) -> AudioResult<StreamConfig> {
    let supported_configs: Vec<_> = device
        .supported_output_configs()
        .map_err(|e| AudioError::ConfigError(e.to_string()))?
        .collect();

    let target_rate = format.sample_rate as u32;
    let in_range = |c: &cpal::SupportedStreamConfigRange| {
        target_rate >= c.min_sample_rate().0 && target_rate <= c.max_sample_rate().0
    };

    let best = supported_configs
        .iter()
        .filter(|c| c.sample_format() == SampleFormat::F32)
        .filter(|c| c.channels() == format.channels)
        .find(|c| in_range(c))
        .or_else(|| {
            supported_configs
                .iter()
                .filter(|c| c.sample_format() == SampleFormat::F32)
                .find(|c| in_range(c))
        })
        .ok_or_else(|| {
            AudioError::ConfigError(format!(
                "No f32 output configuration at {}Hz",
                target_rate
            ))
        })?;

    if best.channels() != format.channels {
        log::warn!(
            "Device has {} channels, source has {}; channels will be remapped",
            best.channels(),
            format.channels
        );
    }

    Ok(StreamConfig {
        channels: best.channels(),
        sample_rate: cpal::SampleRate(target_rate),
        buffer_size: cpal::BufferSize::Default,
    })
}

/// Build the output stream draining `consumer`
fn build_output_stream(
    device: &cpal::Device,
    config: &StreamConfig,
    format: PcmFormat,
    mut consumer: rtrb::Consumer<u8>,
    failed: Arc<AtomicBool>,
) -> AudioResult<Stream> {
    let device_channels = config.channels as usize;
    let source_channels = format.channels.max(1) as usize;
    let bytes = format.bytes_per_sample();
    let frame_size = bytes * source_channels;
    let scale = full_scale(format.bits_per_sample);
    let mut frame_bytes = vec![0u8; frame_size];
    let mut frame = vec![0.0f32; source_channels];

    let stream = device
        .build_output_stream(
            config,
            move |data: &mut [f32], _info: &cpal::OutputCallbackInfo| {
                for out in data.chunks_mut(device_channels) {
                    if consumer.slots() < frame_size {
                        // Ring ran dry: play silence
                        out.fill(0.0);
                        continue;
                    }
                    for b in frame_bytes.iter_mut() {
                        *b = consumer.pop().unwrap_or(0);
                    }
                    for (c, value) in frame.iter_mut().enumerate() {
                        let raw = &frame_bytes[c * bytes..(c + 1) * bytes];
                        *value = decode_sample(raw, format.bits_per_sample, format.big_endian)
                            .map_or(0.0, |s| s as f32 / scale);
                    }
                    for (c, ch) in out.iter_mut().enumerate() {
                        *ch = frame[c.min(source_channels - 1)];
                    }
                }
            },
            move |err| {
                log::error!("Audio output stream error: {}", err);
                failed.store(true, Ordering::Release);
            },
            None,
        )
        .map_err(|e| AudioError::StreamBuildError(e.to_string()))?;

    Ok(stream)
}
