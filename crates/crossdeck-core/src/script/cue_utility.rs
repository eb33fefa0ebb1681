//! Cue-driven source helpers
//!
//! Every helper takes the [`CueFormat`] naming the categories it reads, and
//! does nothing when the source has no cue map (not loaded).

use crate::cue::CueFormat;
use crate::source::AudioSource;
use crate::types::Sample;

use super::utility::time_stretch_source;

/// Seek to the first frame tagged as the start marker, or frame 0
pub fn seek_to_start(source: &mut AudioSource, format: &CueFormat) {
    let start = source
        .cue_map()
        .and_then(|cues| cues.first_tagged(&format.category_play, &format.tag_start))
        .unwrap_or(0);
    source.seek(start);
}

/// Scale the process buffer by the volume cues active at each frame
///
/// A volume tag is a percentage. Each cue applies from its frame until the
/// next volume cue. Frames before the first cue are left as they are.
pub fn adjust_volume(source: &mut AudioSource, format: &CueFormat) {
    let Some(cues) = source.cue_map().cloned() else {
        return;
    };
    let category = format.category_volume.as_str();
    let origin = source.head() - source.margin_before() as i64;
    let end = source.head() + (source.buffer_size() + source.margin_after()) as i64;

    let mut this = origin.max(0);
    let mut spans = Vec::new();
    while this < end {
        let next = cues.frame_at_next(category, this).unwrap_or(end);
        if let Some(just) = cues.frame_at_just(category, this) {
            match cues.tag(category, just).and_then(|t| t.trim().parse::<f64>().ok()) {
                Some(percent) => spans.push((this - origin, next.min(end) - origin, percent)),
                None => {
                    log::warn!("Source {}: volume cue at {} is not a number", source.id(), just)
                }
            }
        }
        this = next;
    }

    source.map_process_buffer(|buffer| {
        spans.iter().fold(buffer.clone(), |b, &(from, to, percent)| {
            b.modify_between(from, to, |_, _, v| (v as f64 * percent / 100.0) as Sample)
        })
    });
}

/// Tempo in effect `offset` frames into the process buffer
pub fn bpm_at(source: &AudioSource, format: &CueFormat, offset: i64) -> Option<f64> {
    let cues = source.cue_map()?;
    let at = (source.head() - source.margin_before() as i64 + offset).max(0);
    let just = cues.frame_at_just(&format.category_bpm, at)?;
    cues.tag(&format.category_bpm, just)?.trim().parse().ok()
}

/// `target` tempo over `source` tempo, both at their buffer start
///
/// Stretching `source` by this ratio matches its tempo to `target`.
pub fn bpm_ratio(target: &AudioSource, source: &AudioSource, format: &CueFormat) -> Option<f64> {
    let to = bpm_at(target, format, 0)?;
    let from = bpm_at(source, format, 0)?;
    (from > 0.0).then(|| to / from)
}

/// Time-stretch the source so it plays at `to_bpm`
///
/// Returns whether a tempo cue was found and the stretch applied.
pub fn adjust_bpm(source: &mut AudioSource, format: &CueFormat, to_bpm: f64) -> bool {
    match bpm_at(source, format, 0) {
        Some(bpm) if bpm > 0.0 && to_bpm > 0.0 => {
            time_stretch_source(source, to_bpm / bpm);
            true
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::test_support::ramp_value;
    use crate::script::{Script, SpeedControl};
    use crate::source::test_support::{ramp_track, source};
    use crate::source::Sources;
    use std::path::Path;

    fn cued(dir: &Path, name: &str, cues: &str, buffer: usize, margin: usize) -> AudioSource {
        let base = ramp_track(dir, name, 20_000);
        std::fs::write(dir.join(format!("{name}.yml")), cues).unwrap();
        let mut s = source(&base, buffer, margin);
        s.load();
        s
    }

    #[test]
    fn test_seek_to_start() {
        let dir = tempfile::tempdir().unwrap();
        let format = CueFormat::default();
        let mut s = cued(dir.path(), "a", "play:\n  700: start\n  300: start\n", 100, 10);
        seek_to_start(&mut s, &format);
        assert_eq!(s.seek_target(), 300);

        let mut s = cued(dir.path(), "b", "play:\n  700: stop\n", 100, 10);
        s.seek(55);
        seek_to_start(&mut s, &format);
        assert_eq!(s.seek_target(), 0);
    }

    #[test]
    fn test_adjust_volume_spans() {
        let dir = tempfile::tempdir().unwrap();
        let format = CueFormat::default();
        let mut s = cued(dir.path(), "a", "volume:\n  1000: 50\n  1050: 0\n", 100, 20);
        s.play();
        s.seek(1000);
        s.on_play_update();
        adjust_volume(&mut s, &format);

        // process buffer starts at stream frame 980
        let b = s.process_buffer().unwrap();
        assert_eq!(b.get(0, 19), ramp_value(0, 999));
        assert_eq!(b.get(0, 20), ramp_value(0, 1000) / 2);
        assert_eq!(b.get(1, 69), ramp_value(1, 1049) / 2);
        assert!(b.channel(0)[70..].iter().all(|&v| v == 0));
    }

    #[test]
    fn test_adjust_volume_without_cues() {
        let dir = tempfile::tempdir().unwrap();
        let format = CueFormat::default();
        let mut s = cued(dir.path(), "a", "bpm:\n  0: 120\n", 100, 20);
        s.play();
        s.on_play_update();
        let before = s.process_buffer().cloned();
        adjust_volume(&mut s, &format);
        assert_eq!(s.process_buffer().cloned(), before);
    }

    #[test]
    fn test_bpm_lookup_uses_buffer_origin() {
        let dir = tempfile::tempdir().unwrap();
        let format = CueFormat::default();
        let mut s = cued(dir.path(), "a", "bpm:\n  0: 120\n  995: 128\n", 100, 10);
        s.play();
        s.seek(1000);
        s.on_play_update();
        // origin is frame 990
        assert_eq!(bpm_at(&s, &format, 0), Some(120.0));
        assert_eq!(bpm_at(&s, &format, 5), Some(128.0));
    }

    #[test]
    fn test_bpm_ratio_and_adjust() {
        let dir = tempfile::tempdir().unwrap();
        let format = CueFormat::default();
        let target = cued(dir.path(), "fast", "bpm:\n  0: 120\n", 1000, 1000);
        let mut slow = cued(dir.path(), "slow", "bpm:\n  0: 90\n", 1000, 1000);

        let ratio = bpm_ratio(&target, &slow, &format).unwrap();
        assert!((ratio - 4.0 / 3.0).abs() < 1e-9);

        slow.play();
        slow.on_play_update();
        assert!(adjust_bpm(&mut slow, &format, 120.0));
        assert_eq!(slow.seek_target(), 1333);
    }

    #[test]
    fn test_bpm_match_through_speed_control() {
        let dir = tempfile::tempdir().unwrap();
        let format = CueFormat::default();
        let target = cued(dir.path(), "fast", "bpm:\n  0: 120\n", 1000, 1000);
        let mut slow = cued(dir.path(), "slow", "bpm:\n  0: 90\n", 1000, 1000);
        let mut expected = cued(dir.path(), "slow", "bpm:\n  0: 90\n", 1000, 1000);
        for s in [&mut slow, &mut expected] {
            s.play();
            s.on_play_update();
        }

        let ratio = bpm_ratio(&target, &slow, &format).unwrap();
        let control = SpeedControl::new();
        control.set(slow.id(), ratio);
        assert_eq!(control.speed(slow.id()), Some(ratio));

        let id = slow.id();
        let mut sources = Sources::new();
        sources.insert(slow);
        control.apply(&mut sources);
        time_stretch_source(&mut expected, ratio);

        let matched = sources.get(id).unwrap();
        assert_eq!(matched.seek_target(), 1333);
        let got = matched.process_buffer().unwrap();
        let want = expected.process_buffer().unwrap();
        assert_eq!(got.frame_count(), want.frame_count());
        for c in 0..2 {
            for f in 0..want.frame_count() {
                assert_eq!(got.get(c, f), want.get(c, f), "channel {c} frame {f}");
            }
        }
    }

    #[test]
    fn test_adjust_bpm_without_tempo() {
        let dir = tempfile::tempdir().unwrap();
        let format = CueFormat::default();
        let mut s = cued(dir.path(), "a", "volume:\n  0: 100\n", 100, 100);
        s.play();
        s.on_play_update();
        assert!(!adjust_bpm(&mut s, &format, 120.0));
        assert_eq!(s.seek_target(), 100);
    }
}
