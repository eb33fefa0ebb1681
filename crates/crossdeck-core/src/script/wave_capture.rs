//! Waveform snapshots for visualizers

use parking_lot::Mutex;

use super::Script;
use crate::source::Sources;
use crate::types::{Sample, SourceId};

/// One channel of a source's playable region, as of the last tick
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WaveSnapshot {
    pub samples: Vec<Sample>,
    pub sample_rate: f32,
    pub bits_per_sample: u16,
}

/// Copies one channel of a source's playable region every tick
///
/// Register it after any script whose output should be visible. Samples
/// reflect the source's own rate and depth, not the output format.
#[derive(Debug)]
pub struct WaveCapture {
    source: SourceId,
    channel: usize,
    snapshot: Mutex<WaveSnapshot>,
}

impl WaveCapture {
    pub fn new(source: SourceId, channel: usize) -> Self {
        Self {
            source,
            channel,
            snapshot: Mutex::new(WaveSnapshot::default()),
        }
    }

    /// Latest snapshot; empty until the source has played
    pub fn snapshot(&self) -> WaveSnapshot {
        self.snapshot.lock().clone()
    }
}

impl Script for WaveCapture {
    fn name(&self) -> &'static str {
        "wave-capture"
    }

    fn apply(&self, sources: &mut Sources) {
        let Some(source) = sources.get(self.source) else {
            return;
        };
        let (Some(format), Some(playable)) = (source.format(), source.playable()) else {
            return;
        };
        if self.channel >= playable.channel_count() {
            return;
        }
        *self.snapshot.lock() = WaveSnapshot {
            samples: playable.channel(self.channel).to_vec(),
            sample_rate: format.sample_rate,
            bits_per_sample: format.bits_per_sample,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::test_support::ramp_value;
    use crate::source::test_support::{ramp_track, source};

    #[test]
    fn test_captures_playable_channel() {
        let dir = tempfile::tempdir().unwrap();
        let base = ramp_track(dir.path(), "a", 5000);
        let mut sources = Sources::new();
        sources.insert(source(&base, 100, 10));

        let capture = WaveCapture::new(SourceId(1), 1);
        capture.apply(&mut sources);
        assert!(capture.snapshot().samples.is_empty());

        let s = sources.get_mut(SourceId(1)).unwrap();
        s.play();
        s.seek(200);
        s.on_play_update();
        capture.apply(&mut sources);

        let snap = capture.snapshot();
        assert_eq!(snap.samples.len(), 100);
        assert_eq!(snap.samples[0], ramp_value(1, 200));
        assert_eq!(snap.sample_rate, 44100.0);
        assert_eq!(snap.bits_per_sample, 16);
    }

    #[test]
    fn test_out_of_range_channel_keeps_empty() {
        let dir = tempfile::tempdir().unwrap();
        let base = ramp_track(dir.path(), "a", 500);
        let mut sources = Sources::new();
        let mut s = source(&base, 100, 10);
        s.play();
        s.on_play_update();
        sources.insert(s);

        let capture = WaveCapture::new(SourceId(1), 2);
        capture.apply(&mut sources);
        assert_eq!(capture.snapshot(), WaveSnapshot::default());
    }
}
