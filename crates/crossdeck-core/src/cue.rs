//! Cue maps: per-source metadata timelines
//!
//! A cue map is read from a YAML document next to the audio file
//! (`track.wav` → `track.yml`). Top-level keys are category names; each
//! category maps integer frame indices to tag strings:
//!
//! ```yaml
//! bpm:
//!   0: 128
//!   441000: 130
//! volume:
//!   0: 100
//!   88200: 60
//! play:
//!   22050: start
//! ```
//!
//! Scalar tags that are not strings (numbers, booleans) are kept in their
//! textual form. Frames carry no order at rest; every query sorts.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_yaml::Value;

/// Category and tag names that scripts interpret
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CueFormat {
    /// Category whose tags are tempo values
    pub category_bpm: String,
    /// Category whose tags are volume percentages
    pub category_volume: String,
    /// Category holding playback markers
    pub category_play: String,
    /// Marker in the play category where playback should begin
    pub tag_start: String,
}

impl Default for CueFormat {
    fn default() -> Self {
        Self {
            category_bpm: "bpm".to_string(),
            category_volume: "volume".to_string(),
            category_play: "play".to_string(),
            tag_start: "start".to_string(),
        }
    }
}

/// Immutable `category → (frame → tag)` map
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CueMap {
    tags: HashMap<String, HashMap<i64, String>>,
}

impl CueMap {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build from explicit entries
    pub fn from_entries<I, C, T>(entries: I) -> Self
    where
        I: IntoIterator<Item = (C, i64, T)>,
        C: Into<String>,
        T: Into<String>,
    {
        let mut tags: HashMap<String, HashMap<i64, String>> = HashMap::new();
        for (category, frame, tag) in entries {
            tags.entry(category.into()).or_default().insert(frame, tag.into());
        }
        Self { tags }
    }

    /// Parse a YAML cue document
    ///
    /// Entries whose frame is not an integer, and categories that are not
    /// mappings, are skipped.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, serde_yaml::Error> {
        let root: Value = serde_yaml::from_str(yaml)?;
        let mut tags = HashMap::new();

        let Value::Mapping(categories) = root else {
            return Ok(Self { tags });
        };
        for (name, entries) in categories {
            let (Some(name), Value::Mapping(entries)) = (scalar_text(&name), entries) else {
                continue;
            };
            let category: HashMap<i64, String> = entries
                .iter()
                .filter_map(|(frame, tag)| Some((frame_index(frame)?, scalar_text(tag)?)))
                .collect();
            tags.insert(name, category);
        }
        Ok(Self { tags })
    }

    /// Load the cue file at `path`
    ///
    /// A missing file gives an empty map; so does a malformed one (logged).
    pub fn load(path: &Path) -> Self {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("No cue file at {:?}", path);
                return Self::empty();
            }
            Err(e) => {
                log::warn!("Failed to read cue file {:?}: {}, using empty cue map", path, e);
                return Self::empty();
            }
        };
        match Self::from_yaml_str(&contents) {
            Ok(map) => {
                log::info!("Loaded cue file {:?} ({} categories)", path, map.tags.len());
                map
            }
            Err(e) => {
                log::warn!("Failed to parse cue file {:?}: {}, using empty cue map", path, e);
                Self::empty()
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tags.values().all(|c| c.is_empty())
    }

    /// Names of all categories present
    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.tags.keys().map(String::as_str)
    }

    /// Tag at exactly `frame`
    pub fn tag(&self, category: &str, frame: i64) -> Option<&str> {
        self.tags.get(category)?.get(&frame).map(String::as_str)
    }

    /// Sorted frames in `category` whose entry satisfies `predicate`
    pub fn frames<P>(&self, category: &str, mut predicate: P) -> Vec<i64>
    where
        P: FnMut(i64, &str) -> bool,
    {
        let mut frames: Vec<i64> = self
            .tags
            .get(category)
            .map(|c| {
                c.iter()
                    .filter(|(&f, t)| predicate(f, t))
                    .map(|(&f, _)| f)
                    .collect()
            })
            .unwrap_or_default();
        frames.sort_unstable();
        frames
    }

    /// Sorted frames in `category` tagged `tag`
    pub fn frames_tagged(&self, category: &str, tag: &str) -> Vec<i64> {
        self.frames(category, |_, t| t == tag)
    }

    /// Latest tagged frame at or before `now`
    pub fn frame_at_just(&self, category: &str, now: i64) -> Option<i64> {
        self.frames(category, |f, _| f <= now).last().copied()
    }

    /// Earliest tagged frame strictly after `now`
    pub fn frame_at_next(&self, category: &str, now: i64) -> Option<i64> {
        self.frames(category, |f, _| f > now).first().copied()
    }

    /// Earliest frame tagged `tag`
    pub fn first_tagged(&self, category: &str, tag: &str) -> Option<i64> {
        self.frames_tagged(category, tag).first().copied()
    }

    /// Latest frame tagged `tag`
    pub fn last_tagged(&self, category: &str, tag: &str) -> Option<i64> {
        self.frames_tagged(category, tag).last().copied()
    }

    /// Earliest frame tagged `tag` strictly after `now`
    pub fn next_tagged(&self, category: &str, tag: &str, now: i64) -> Option<i64> {
        self.frames(category, |f, t| t == tag && f > now).first().copied()
    }

    /// Latest frame tagged `tag` at or before `now`
    pub fn just_tagged(&self, category: &str, tag: &str, now: i64) -> Option<i64> {
        self.frames(category, |f, t| t == tag && f <= now).last().copied()
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn frame_index(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = "
bpm:
  0: 120
  44100: 128.5
volume:
  100: 80
  0: 100
  300: 50
play:
  900: start
  200: start
  500: stop
";

    #[test]
    fn test_parse_scalars() {
        let map = CueMap::from_yaml_str(DOC).unwrap();
        assert_eq!(map.tag("bpm", 0), Some("120"));
        assert_eq!(map.tag("bpm", 44100), Some("128.5"));
        assert_eq!(map.tag("play", 500), Some("stop"));
        assert_eq!(map.tag("play", 501), None);
        assert_eq!(map.categories().count(), 3);
    }

    #[test]
    fn test_queries_sort() {
        let map = CueMap::from_yaml_str(DOC).unwrap();
        assert_eq!(map.frames("volume", |_, _| true), vec![0, 100, 300]);
        assert_eq!(map.frame_at_just("volume", 250), Some(100));
        assert_eq!(map.frame_at_just("volume", 100), Some(100));
        assert_eq!(map.frame_at_next("volume", 100), Some(300));
        assert_eq!(map.frame_at_next("volume", 300), None);
        assert_eq!(map.first_tagged("play", "start"), Some(200));
        assert_eq!(map.last_tagged("play", "start"), Some(900));
        assert_eq!(map.next_tagged("play", "start", 200), Some(900));
        assert_eq!(map.just_tagged("play", "start", 899), Some(200));
    }

    #[test]
    fn test_missing_category_finds_nothing() {
        let map = CueMap::from_yaml_str(DOC).unwrap();
        assert!(map.frames_tagged("cue", "x").is_empty());
        assert_eq!(map.frame_at_just("cue", 1000), None);
        assert_eq!(map.frame_at_next("cue", -1000), None);
        assert_eq!(map.first_tagged("cue", "x"), None);
        assert_eq!(map.last_tagged("cue", "x"), None);
        assert_eq!(map.next_tagged("cue", "x", 0), None);
        assert_eq!(map.just_tagged("cue", "x", 0), None);
    }

    #[test]
    fn test_just_and_next_bounds() {
        let map = CueMap::from_entries((0..50).map(|i| ("beat", i * 37 - 200, "x")));
        for now in (-300..2000).step_by(13) {
            if let Some(f) = map.frame_at_just("beat", now) {
                assert!(f <= now);
            }
            if let Some(f) = map.frame_at_next("beat", now) {
                assert!(f > now);
            }
        }
    }

    #[test]
    fn test_malformed_yields_empty() {
        assert!(CueMap::from_yaml_str("bpm: [unclosed").is_err());
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.yml");
        std::fs::write(&path, "bpm: [unclosed").unwrap();
        assert!(CueMap::load(&path).is_empty());
        assert!(CueMap::load(&dir.path().join("missing.yml")).is_empty());
    }

    #[test]
    fn test_non_mapping_document() {
        assert!(CueMap::from_yaml_str("just a string").unwrap().is_empty());
        let map = CueMap::from_yaml_str("bpm: 120\nplay:\n  5: start\n").unwrap();
        assert_eq!(map.first_tagged("play", "start"), Some(5));
        assert_eq!(map.frame_at_just("bpm", 10), None);
    }

    #[test]
    fn test_cue_format_yaml_defaults() {
        let format: CueFormat = serde_yaml::from_str("tag_start: go\n").unwrap();
        assert_eq!(format.tag_start, "go");
        assert_eq!(format.category_bpm, "bpm");
    }
}
