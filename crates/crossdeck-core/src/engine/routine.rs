//! One render tick: refresh, apply scripts, mix, write

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use super::AudioManager;
use crate::audio::codec::{clamp_sample, encode_sample, sample_bytes};
use crate::audio::{AudioError, AudioResult, OutputSink};
use crate::types::{FrameBuffer, PcmFormat};

/// Drives the manager and pushes mixed ticks into a sink
///
/// Sources are mixed by plain integer addition with saturation at the output
/// bit depth; there is no gain compensation. Sources are not resampled to
/// the output rate.
pub struct AudioRoutine {
    manager: Arc<AudioManager>,
    format: PcmFormat,
    buffer_size: usize,
    snapshot: Vec<FrameBuffer>,
    master: Vec<u8>,
    partial_write_pause: Duration,
}

impl AudioRoutine {
    pub fn new(manager: Arc<AudioManager>, format: PcmFormat) -> Self {
        let buffer_size = manager.buffer_size();
        let tick_secs = buffer_size as f64 / format.sample_rate.max(1.0) as f64;
        Self {
            manager,
            format,
            buffer_size,
            snapshot: Vec::new(),
            master: vec![0; buffer_size * format.frame_size()],
            partial_write_pause: Duration::from_secs_f64(tick_secs / 3.0),
        }
    }

    /// Pause taken once per tick after the sink first accepts less than a
    /// full tick (default: a third of a tick)
    pub fn with_partial_write_pause(mut self, pause: Duration) -> Self {
        self.partial_write_pause = pause;
        self
    }

    pub fn format(&self) -> &PcmFormat {
        &self.format
    }

    pub fn manager(&self) -> &Arc<AudioManager> {
        &self.manager
    }

    /// Bytes in one mixed tick
    pub fn buffer_bytes(&self) -> usize {
        self.master.len()
    }

    /// Refresh sources and run scripts, keeping the playable snapshot
    pub fn update(&mut self) {
        self.snapshot = self.manager.tick();
    }

    /// Mix the last snapshot and write it to `sink`
    ///
    /// On error nothing more is written this tick.
    pub fn render(&mut self, sink: &mut dyn OutputSink) -> AudioResult<()> {
        mix(&self.snapshot, &self.format, self.buffer_size, &mut self.master)?;
        self.write_all(sink)
    }

    fn write_all(&self, sink: &mut dyn OutputSink) -> AudioResult<()> {
        let total = self.master.len();
        let mut offset = 0;
        let mut paused = false;
        while offset < total {
            let remaining = total - offset;
            let request = match sink.available() {
                0 => remaining,
                available => available.min(remaining),
            };
            let written = sink.write(&self.master[offset..offset + request])?;
            if written == 0 {
                return Err(AudioError::SinkFailed("sink accepted no bytes".to_string()));
            }
            offset += written;
            if offset < total && !paused {
                paused = true;
                thread::sleep(self.partial_write_pause);
            }
        }
        Ok(())
    }
}

/// Sum `frames` frames of every snapshot into interleaved bytes in `out`
///
/// Output channels a snapshot lacks take its channel 0. `out` must hold
/// `frames * format.frame_size()` bytes; it is overwritten entirely.
pub fn mix(
    snapshots: &[FrameBuffer],
    format: &PcmFormat,
    frames: usize,
    out: &mut [u8],
) -> AudioResult<()> {
    let bits = format.bits_per_sample;
    let bytes = sample_bytes(bits)?;
    let channels = format.channels as usize;
    out.fill(0);

    for f in 0..frames {
        for c in 0..channels {
            let sum: i64 = snapshots
                .iter()
                .filter(|s| s.channel_count() > 0)
                .map(|s| {
                    let channel = if c < s.channel_count() { c } else { 0 };
                    s.get_or_zero(channel, f as i64) as i64
                })
                .sum();
            let at = (f * channels + c) * bytes;
            let value = clamp_sample(sum, bits)?;
            encode_sample(value, bits, format.big_endian, &mut out[at..at + bytes])?;
        }
    }
    Ok(())
}
