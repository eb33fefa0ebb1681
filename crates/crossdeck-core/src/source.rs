//! Audio sources
//!
//! A source owns one reader, one cue map and a margin-augmented process
//! buffer that scripts edit every tick:
//!
//! ```text
//! file          [..........|..............|.................................]
//! process buffer      [prev|   playable   |next]
//!                          ^ head         ^ seek target
//! ```
//!
//! State machine: `Unloaded → Loaded → Playing`, `Playing → Loaded` via
//! [`stop`](AudioSource::stop), anything `→ Unloaded` via
//! [`flush`](AudioSource::flush). Sources are not thread-safe on their own;
//! the [`AudioManager`](crate::engine::AudioManager) guards them.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

use crate::cue::CueMap;
use crate::reader::{ReaderError, ReaderFactory, SeekableReader};
use crate::types::{FrameBuffer, PcmFormat, SourceId};

/// Why a source failed to load
#[derive(Error, Debug)]
pub enum SourceError {
    /// The audio file could not be opened
    #[error("Failed to open {path:?}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The reader could not decode the file
    #[error("Failed to read {path:?}: {source}")]
    Reader {
        path: PathBuf,
        #[source]
        source: ReaderError,
    },
}

/// One playable track with its buffering state
pub struct AudioSource {
    id: SourceId,
    /// Path without extension; the audio file is `<base>.<ext>`
    base: PathBuf,
    extension: String,
    factory: Arc<dyn ReaderFactory>,

    buffer_size: usize,
    margin_before: usize,
    margin_after: usize,

    reader: Option<Box<dyn SeekableReader>>,
    cue_map: Option<Arc<CueMap>>,

    head: i64,
    seek_target: i64,
    is_loaded: bool,
    is_playing: bool,
    is_past_end: bool,

    process_buffer: Option<FrameBuffer>,
}

impl AudioSource {
    pub fn new(
        id: SourceId,
        base: impl Into<PathBuf>,
        extension: impl Into<String>,
        buffer_size: usize,
        margin_before: usize,
        margin_after: usize,
        factory: Arc<dyn ReaderFactory>,
    ) -> Self {
        Self {
            id,
            base: base.into(),
            extension: extension.into(),
            factory,
            buffer_size,
            margin_before,
            margin_after,
            reader: None,
            cue_map: None,
            head: 0,
            seek_target: 0,
            is_loaded: false,
            is_playing: false,
            is_past_end: false,
            process_buffer: None,
        }
    }

    pub fn id(&self) -> SourceId {
        self.id
    }

    /// `<base>.<ext>`
    pub fn audio_path(&self) -> PathBuf {
        with_suffix(&self.base, &self.extension)
    }

    /// `<base>.yml`
    pub fn cue_path(&self) -> PathBuf {
        with_suffix(&self.base, "yml")
    }

    /// Open the reader and cue map; no-op when already loaded
    ///
    /// Failures are logged and leave the source unloaded. Returns whether
    /// the source is loaded afterwards.
    pub fn load(&mut self) -> bool {
        if self.is_loaded {
            return true;
        }
        match self.try_load() {
            Ok(()) => true,
            Err(e) => {
                log::error!("Source {}: load failed: {}", self.id, e);
                false
            }
        }
    }

    fn try_load(&mut self) -> Result<(), SourceError> {
        let path = self.audio_path();
        log::info!("Source {}: loading {:?} via {}", self.id, path, self.factory.name());

        let file = File::open(&path).map_err(|source| SourceError::Open {
            path: path.clone(),
            source,
        })?;
        let reader = self
            .factory
            .open(file, &self.extension)
            .map_err(|source| SourceError::Reader { path, source })?;

        let format = reader.format();
        self.process_buffer = Some(FrameBuffer::silence(
            format.sample_rate,
            format.channels as usize,
            self.procsize(),
        ));
        self.reader = Some(reader);
        self.cue_map = Some(Arc::new(CueMap::load(&self.cue_path())));
        self.head = 0;
        self.seek_target = 0;
        self.is_past_end = false;
        self.is_loaded = true;
        Ok(())
    }

    /// Load if needed, then start playing; stays stopped if loading fails
    pub fn play(&mut self) -> bool {
        if !self.is_playing && self.load() {
            self.is_playing = true;
        }
        self.is_playing
    }

    /// Pause without unloading
    pub fn stop(&mut self) {
        self.is_playing = false;
    }

    /// Set the frame the next refresh reads from
    pub fn seek(&mut self, frame: i64) {
        self.seek_target = frame;
    }

    /// Refresh the process buffer for the coming tick (playing sources only)
    ///
    /// Frames at or past the reader's valid length are zeroed.
    pub fn on_play_update(&mut self) {
        if !self.is_playing {
            return;
        }
        let procsize = self.procsize();
        let Some(reader) = self.reader.as_mut() else {
            return;
        };

        reader.seek(self.seek_target - self.margin_before as i64);
        self.head = self.seek_target;
        self.seek_target = self.head + self.buffer_size as i64;

        match reader.read(procsize) {
            Ok(outcome) => {
                self.is_past_end = outcome.length.is_exhausted();
                let valid = outcome.length.valid_frames(procsize) as i64;
                let buffer = outcome.buffer.modify_between(valid, procsize as i64, |_, _, _| 0);
                self.process_buffer = Some(buffer);
            }
            Err(e) => {
                log::error!("Source {}: read failed at frame {}: {}", self.id, self.head, e);
                self.process_buffer = self.process_buffer.take().map(|b| b.modify(|_, _, _| 0));
            }
        }
    }

    /// Drop the reader and cue map and return to the unloaded state
    pub fn flush(&mut self) {
        if self.is_loaded {
            log::debug!("Source {}: flushed", self.id);
        }
        self.reader = None;
        self.cue_map = None;
        self.process_buffer = None;
        self.head = 0;
        self.seek_target = 0;
        self.is_playing = false;
        self.is_loaded = false;
        self.is_past_end = false;
    }

    pub fn is_loaded(&self) -> bool {
        self.is_loaded
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    /// Whether the last refresh started at or past end-of-stream
    pub fn is_past_end(&self) -> bool {
        self.is_past_end
    }

    /// Frame most recently placed at the start of the playable region
    pub fn head(&self) -> i64 {
        self.head
    }

    /// Frame the next refresh reads from
    pub fn seek_target(&self) -> i64 {
        self.seek_target
    }

    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    pub fn margin_before(&self) -> usize {
        self.margin_before
    }

    pub fn margin_after(&self) -> usize {
        self.margin_after
    }

    /// Process buffer length: margins plus the playable region
    pub fn procsize(&self) -> usize {
        self.buffer_size + self.margin_before + self.margin_after
    }

    pub fn format(&self) -> Option<PcmFormat> {
        self.reader.as_ref().map(|r| r.format())
    }

    pub fn channels(&self) -> Option<usize> {
        self.format().map(|f| f.channels as usize)
    }

    pub fn sample_rate(&self) -> Option<f32> {
        self.format().map(|f| f.sample_rate)
    }

    pub fn cue_map(&self) -> Option<&Arc<CueMap>> {
        self.cue_map.as_ref()
    }

    pub fn process_buffer(&self) -> Option<&FrameBuffer> {
        self.process_buffer.as_ref()
    }

    /// The playable region (margins excluded) as a new buffer
    pub fn playable(&self) -> Option<FrameBuffer> {
        self.process_buffer
            .as_ref()
            .map(|b| b.take(self.margin_before, self.margin_before + self.buffer_size))
    }

    /// Replace the process buffer with `f(current)`
    ///
    /// The result must keep the process buffer length.
    pub fn map_process_buffer<F>(&mut self, f: F)
    where
        F: FnOnce(&FrameBuffer) -> FrameBuffer,
    {
        if let Some(current) = self.process_buffer.as_ref() {
            let next = f(current);
            debug_assert_eq!(next.frame_count(), current.frame_count());
            self.process_buffer = Some(next);
        }
    }
}

impl std::fmt::Debug for AudioSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioSource")
            .field("id", &self.id)
            .field("path", &self.audio_path())
            .field("head", &self.head)
            .field("seek_target", &self.seek_target)
            .field("is_loaded", &self.is_loaded)
            .field("is_playing", &self.is_playing)
            .finish()
    }
}

/// The registry's sources, keyed by id in ascending order
///
/// This is the view scripts receive each tick.
#[derive(Debug, Default)]
pub struct Sources {
    map: BTreeMap<SourceId, AudioSource>,
}

impl Sources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, source: AudioSource) {
        self.map.insert(source.id(), source);
    }

    pub fn remove(&mut self, id: SourceId) -> Option<AudioSource> {
        self.map.remove(&id)
    }

    pub fn get(&self, id: SourceId) -> Option<&AudioSource> {
        self.map.get(&id)
    }

    pub fn get_mut(&mut self, id: SourceId) -> Option<&mut AudioSource> {
        self.map.get_mut(&id)
    }

    /// Mutable access to two distinct sources at once
    pub fn pair_mut(
        &mut self,
        a: SourceId,
        b: SourceId,
    ) -> Option<(&mut AudioSource, &mut AudioSource)> {
        if a == b {
            return None;
        }
        let mut first = None;
        let mut second = None;
        for (id, source) in self.map.iter_mut() {
            if *id == a {
                first = Some(source);
            } else if *id == b {
                second = Some(source);
            }
        }
        Some((first?, second?))
    }

    pub fn contains(&self, id: SourceId) -> bool {
        self.map.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = SourceId> + '_ {
        self.map.keys().copied()
    }

    pub fn values(&self) -> impl Iterator<Item = &AudioSource> {
        self.map.values()
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut AudioSource> {
        self.map.values_mut()
    }
}

fn with_suffix(base: &Path, extension: &str) -> PathBuf {
    let mut name = OsString::from(base.as_os_str());
    name.push(".");
    name.push(extension);
    PathBuf::from(name)
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::reader::test_support::ramp_value;

    #[test]
    fn test_play_without_load() {
        let dir = tempfile::tempdir().unwrap();
        let base = ramp_track(dir.path(), "a", 2000);
        let mut s = source(&base, 100, 10);
        assert!(!s.is_loaded());
        assert!(s.play());
        assert!(s.is_loaded());
        assert!(s.is_playing());
        assert!(s.cue_map().unwrap().is_empty());
        assert_eq!(s.process_buffer().unwrap().frame_count(), 120);
    }

    #[test]
    fn test_missing_file_stays_unloaded() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = source(&dir.path().join("nope"), 100, 10);
        assert!(!s.load());
        assert!(!s.play());
        assert!(!s.is_loaded());
        assert!(!s.is_playing());
        assert!(s.format().is_none());
    }

    #[test]
    fn test_refresh_reads_with_margins() {
        let dir = tempfile::tempdir().unwrap();
        let base = ramp_track(dir.path(), "a", 2000);
        let mut s = source(&base, 100, 10);
        s.play();

        s.on_play_update();
        assert_eq!(s.head(), 0);
        assert_eq!(s.seek_target(), 100);
        let b = s.process_buffer().unwrap();
        // margin before frame 0 is silence
        assert_eq!(b.get(0, 9), 0);
        assert_eq!(b.get(0, 10), ramp_value(0, 0));
        assert_eq!(b.get(1, 119), ramp_value(1, 109));

        s.on_play_update();
        assert_eq!(s.head(), 100);
        let playable = s.playable().unwrap();
        assert_eq!(playable.frame_count(), 100);
        assert_eq!(playable.get(0, 0), ramp_value(0, 100));
    }

    #[test]
    fn test_seek_is_deferred() {
        let dir = tempfile::tempdir().unwrap();
        let base = ramp_track(dir.path(), "a", 2000);
        let mut s = source(&base, 100, 10);
        s.play();
        s.on_play_update();
        s.seek(1000);
        assert_eq!(s.head(), 0);
        s.on_play_update();
        assert_eq!(s.head(), 1000);
        assert_eq!(s.playable().unwrap().get(0, 0), ramp_value(0, 1000));
    }

    #[test]
    fn test_end_of_stream_zero_fill() {
        let dir = tempfile::tempdir().unwrap();
        let base = ramp_track(dir.path(), "a", 1050);
        let mut s = source(&base, 100, 10);
        s.play();
        s.seek(1000);
        s.on_play_update();
        let b = s.process_buffer().unwrap();
        // buffer starts at 990: 60 valid frames
        assert_eq!(b.get(0, 59), ramp_value(0, 1049));
        assert!(b.channel(0)[60..].iter().all(|&v| v == 0));
        assert!(!s.is_past_end());

        s.seek(5000);
        s.on_play_update();
        assert!(s.is_past_end());
        assert!(s.process_buffer().unwrap().channel(1).iter().all(|&v| v == 0));
    }

    #[test]
    fn test_stopped_source_does_not_refresh() {
        let dir = tempfile::tempdir().unwrap();
        let base = ramp_track(dir.path(), "a", 2000);
        let mut s = source(&base, 100, 10);
        s.load();
        s.on_play_update();
        assert_eq!(s.seek_target(), 0);
        s.play();
        s.on_play_update();
        s.stop();
        s.on_play_update();
        assert_eq!(s.seek_target(), 100);
        assert!(s.is_loaded());
    }

    #[test]
    fn test_flush_resets() {
        let dir = tempfile::tempdir().unwrap();
        let base = ramp_track(dir.path(), "a", 2000);
        let mut s = source(&base, 100, 10);
        s.play();
        s.on_play_update();
        s.flush();
        assert!(!s.is_loaded());
        assert!(!s.is_playing());
        assert_eq!(s.head(), 0);
        assert_eq!(s.seek_target(), 0);
        assert!(s.process_buffer().is_none());
        assert!(s.cue_map().is_none());
        // can be loaded again
        assert!(s.play());
    }

    #[test]
    fn test_cue_file_loaded_next_to_audio() {
        let dir = tempfile::tempdir().unwrap();
        let base = ramp_track(dir.path(), "cued", 500);
        std::fs::write(dir.path().join("cued.yml"), "play:\n  42: start\n").unwrap();
        let mut s = source(&base, 100, 10);
        s.load();
        assert_eq!(s.cue_map().unwrap().first_tagged("play", "start"), Some(42));
    }

    #[test]
    fn test_sources_pair_mut() {
        let factory: Arc<dyn ReaderFactory> = Arc::new(crate::reader::ExpandAllFactory);
        let mut sources = Sources::new();
        for id in 1..=3 {
            sources.insert(AudioSource::new(SourceId(id), "x", "wav", 10, 0, 0, factory.clone()));
        }
        let (a, b) = sources.pair_mut(SourceId(3), SourceId(1)).unwrap();
        assert_eq!((a.id(), b.id()), (SourceId(3), SourceId(1)));
        assert!(sources.pair_mut(SourceId(2), SourceId(2)).is_none());
        assert!(sources.pair_mut(SourceId(2), SourceId(9)).is_none());
        assert_eq!(sources.ids().collect::<Vec<_>>(), vec![SourceId(1), SourceId(2), SourceId(3)]);
    }

    #[test]
    fn test_dotted_base_name() {
        let s = source(Path::new("/music/artist - 1.5 mix"), 10, 0);
        assert_eq!(s.audio_path(), PathBuf::from("/music/artist - 1.5 mix.wav"));
        assert_eq!(s.cue_path(), PathBuf::from("/music/artist - 1.5 mix.yml"));
    }
}
