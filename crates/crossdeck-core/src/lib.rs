//! Crossdeck Core - real-time multi-track mixing engine
//!
//! Sources ([`source::AudioSource`]) stream PCM from files through a
//! [`reader::SeekableReader`]. Every tick the render thread refreshes each
//! playing source's margin-augmented process buffer, lets registered
//! [`script::Script`]s rewrite them (tempo changes, transitions, volume
//! automation), then sums the playable regions into the output sink.
//!
//! ```ignore
//! use std::sync::Arc;
//! use crossdeck_core::config::EngineConfig;
//! use crossdeck_core::engine::{AudioManager, AudioRoutine, AudioThread};
//!
//! let config = EngineConfig::default();
//! let manager = Arc::new(AudioManager::from_config(&config));
//! let deck = manager.create_source("/music/track", "flac");
//! manager.play(deck);
//! let routine = AudioRoutine::new(manager.clone(), config.output_format());
//! let thread = AudioThread::spawn(routine, config.device_sink_factory())?;
//! ```

pub mod audio;
pub mod config;
pub mod cue;
pub mod dsp;
pub mod engine;
pub mod reader;
pub mod script;
pub mod source;
pub mod types;

pub use types::*;
