//! Shared source and script registry
//!
//! [`AudioManager`] is the only way control threads reach sources and
//! scripts. Every method takes the registry lock for its own duration:
//! queries share a read lock, mutations and the render tick take the write
//! lock. Nothing borrowed from the registry escapes a method; queries return
//! owned values (`Arc<CueMap>`, script handles, ids).

use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::config::EngineConfig;
use crate::cue::{CueFormat, CueMap};
use crate::reader::ReaderFactory;
use crate::script::{cue_utility, ScriptHandle};
use crate::source::{AudioSource, Sources};
use crate::types::{FrameBuffer, PcmFormat, SourceId};

/// Everything the lock guards
struct Registry {
    sources: Sources,
    scripts: Vec<ScriptHandle>,
    next_id: u64,
}

impl Registry {
    fn new() -> Self {
        Self {
            sources: Sources::new(),
            scripts: Vec::new(),
            next_id: 1,
        }
    }

    fn allocate_id(&mut self) -> SourceId {
        let id = SourceId(self.next_id);
        self.next_id += 1;
        id
    }
}

/// Thread-safe owner of every source and script
pub struct AudioManager {
    registry: RwLock<Registry>,
    buffer_size: usize,
    margin_before: usize,
    margin_after: usize,
    reader: Arc<dyn ReaderFactory>,
    cue_format: CueFormat,
}

impl AudioManager {
    /// Manager whose sources use `buffer_size` frames per tick, margins of
    /// the same length, and `reader` to open files
    pub fn new(buffer_size: usize, reader: Arc<dyn ReaderFactory>) -> Self {
        Self {
            registry: RwLock::new(Registry::new()),
            buffer_size,
            margin_before: buffer_size,
            margin_after: buffer_size,
            reader,
            cue_format: CueFormat::default(),
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            margin_before: config.margin_before,
            margin_after: config.margin_after,
            cue_format: config.cue_format.clone(),
            ..Self::new(config.buffer_size, config.reader.factory())
        }
    }

    /// Frames rendered per tick
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    pub fn cue_format(&self) -> &CueFormat {
        &self.cue_format
    }

    // ---- sources ----

    /// Register an unloaded source for `<base>.<extension>` with the default
    /// margins
    pub fn create_source(&self, base: impl Into<PathBuf>, extension: &str) -> SourceId {
        self.create_source_with_margin(base, extension, self.margin_before, self.margin_after)
    }

    /// Register an unloaded source with explicit margins
    pub fn create_source_with_margin(
        &self,
        base: impl Into<PathBuf>,
        extension: &str,
        margin_before: usize,
        margin_after: usize,
    ) -> SourceId {
        let reader = self.reader.clone();
        self.create_source_with(base, extension, reader, margin_before, margin_after)
    }

    /// Register an unloaded source opened by `reader` instead of the
    /// manager's default
    pub fn create_source_with(
        &self,
        base: impl Into<PathBuf>,
        extension: &str,
        reader: Arc<dyn ReaderFactory>,
        margin_before: usize,
        margin_after: usize,
    ) -> SourceId {
        let base = base.into();
        let mut registry = self.registry.write();
        let id = registry.allocate_id();
        log::debug!(
            "AudioManager: created source {} for {:?} ({})",
            id,
            base,
            reader.name()
        );
        registry.sources.insert(AudioSource::new(
            id,
            base,
            extension,
            self.buffer_size,
            margin_before,
            margin_after,
            reader,
        ));
        id
    }

    /// Flush and drop a source; returns whether it existed
    pub fn remove_source(&self, id: SourceId) -> bool {
        match self.registry.write().sources.remove(id) {
            Some(mut source) => {
                source.flush();
                log::debug!("AudioManager: removed source {}", id);
                true
            }
            None => false,
        }
    }

    /// Load a source; false if it is unknown or failed to load
    pub fn load(&self, id: SourceId) -> bool {
        self.with_source(id, |s| s.load()).unwrap_or(false)
    }

    /// Start a source, loading it first if needed
    pub fn play(&self, id: SourceId) -> bool {
        self.with_source(id, |s| s.play()).unwrap_or(false)
    }

    pub fn stop(&self, id: SourceId) -> bool {
        self.with_source(id, |s| s.stop()).is_some()
    }

    /// Set the frame the source's next tick starts from
    pub fn seek(&self, id: SourceId, frame: i64) -> bool {
        self.with_source(id, |s| s.seek(frame)).is_some()
    }

    /// Seek to the first frame tagged `tag` in `category`, or frame 0 when
    /// there is no such tag
    ///
    /// Returns whether the tag was found. Unknown or unloaded sources are
    /// left alone.
    pub fn seek_to_tag(&self, id: SourceId, category: &str, tag: &str) -> bool {
        self.with_source(id, |s| {
            let cues = s.cue_map()?;
            let frame = cues.first_tagged(category, tag);
            s.seek(frame.unwrap_or(0));
            frame
        })
        .flatten()
        .is_some()
    }

    /// Seek to the start marker, or frame 0 when there is none
    pub fn seek_to_start(&self, id: SourceId) -> bool {
        let format = &self.cue_format;
        self.with_source(id, |s| cue_utility::seek_to_start(s, format)).is_some()
    }

    fn with_source<R>(&self, id: SourceId, f: impl FnOnce(&mut AudioSource) -> R) -> Option<R> {
        self.registry.write().sources.get_mut(id).map(f)
    }

    fn read_source<R>(&self, id: SourceId, f: impl FnOnce(&AudioSource) -> R) -> Option<R> {
        self.registry.read().sources.get(id).map(f)
    }

    pub fn contains(&self, id: SourceId) -> bool {
        self.registry.read().sources.contains(id)
    }

    pub fn source_count(&self) -> usize {
        self.registry.read().sources.len()
    }

    /// Format of a loaded source
    pub fn format(&self, id: SourceId) -> Option<PcmFormat> {
        self.read_source(id, |s| s.format()).flatten()
    }

    /// Cue map of a loaded source
    pub fn cue_map(&self, id: SourceId) -> Option<Arc<CueMap>> {
        self.read_source(id, |s| s.cue_map().cloned()).flatten()
    }

    pub fn is_playing(&self, id: SourceId) -> bool {
        self.read_source(id, |s| s.is_playing()).unwrap_or(false)
    }

    pub fn is_loaded(&self, id: SourceId) -> bool {
        self.read_source(id, |s| s.is_loaded()).unwrap_or(false)
    }

    /// Frame at the start of the source's last rendered tick
    pub fn head(&self, id: SourceId) -> Option<i64> {
        self.read_source(id, |s| s.head())
    }

    /// Ids of every playing source, ascending
    pub fn playing_sources(&self) -> Vec<SourceId> {
        let registry = self.registry.read();
        registry
            .sources
            .values()
            .filter(|s| s.is_playing())
            .map(|s| s.id())
            .collect()
    }

    // ---- scripts ----

    pub fn script_count(&self) -> usize {
        self.registry.read().scripts.len()
    }

    /// Registered scripts in execution order
    pub fn scripts(&self) -> Vec<ScriptHandle> {
        self.registry.read().scripts.clone()
    }

    /// Append a script; it runs after every script already registered
    pub fn add_script(&self, script: ScriptHandle) {
        self.add_script_last(script);
    }

    pub fn add_script_last(&self, script: ScriptHandle) {
        log::debug!("AudioManager: added script {}", script.name());
        self.registry.write().scripts.push(script);
    }

    pub fn add_script_first(&self, script: ScriptHandle) {
        log::debug!("AudioManager: added script {} first", script.name());
        self.registry.write().scripts.insert(0, script);
    }

    /// Insert at `index` (0 ..= count); false when out of range
    pub fn insert_script(&self, index: usize, script: ScriptHandle) -> bool {
        let mut registry = self.registry.write();
        if index > registry.scripts.len() {
            return false;
        }
        registry.scripts.insert(index, script);
        true
    }

    pub fn remove_script_at(&self, index: usize) -> Option<ScriptHandle> {
        let mut registry = self.registry.write();
        (index < registry.scripts.len()).then(|| registry.scripts.remove(index))
    }

    /// Remove a script by identity; false when it is not registered
    pub fn remove_script(&self, script: &ScriptHandle) -> bool {
        let mut registry = self.registry.write();
        match registry.scripts.iter().position(|s| same_script(s, script)) {
            Some(index) => {
                registry.scripts.remove(index);
                true
            }
            None => false,
        }
    }

    /// Drop every script reporting completion; returns how many were removed
    pub fn remove_completed_scripts(&self) -> usize {
        let mut registry = self.registry.write();
        let before = registry.scripts.len();
        registry.scripts.retain(|s| {
            let done = s.is_completed();
            if done {
                log::debug!("AudioManager: dropping completed script {}", s.name());
            }
            !done
        });
        before - registry.scripts.len()
    }

    // ---- render ----

    /// Refresh every source, run every script, and snapshot the playable
    /// region of every playing source, all under one write lock
    pub(crate) fn tick(&self) -> Vec<FrameBuffer> {
        let mut guard = self.registry.write();
        let registry = &mut *guard;

        for source in registry.sources.values_mut() {
            source.on_play_update();
        }
        for script in &registry.scripts {
            script.apply(&mut registry.sources);
        }
        registry
            .sources
            .values()
            .filter(|s| s.is_playing())
            .filter_map(|s| s.playable())
            .collect()
    }
}

impl std::fmt::Debug for AudioManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioManager")
            .field("buffer_size", &self.buffer_size)
            .field("reader", &self.reader.name())
            .finish_non_exhaustive()
    }
}

/// Handle identity, ignoring vtable differences between codegen units
fn same_script(a: &ScriptHandle, b: &ScriptHandle) -> bool {
    std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
}
