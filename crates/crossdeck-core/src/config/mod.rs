//! Engine configuration
//!
//! - [`EngineConfig`]: output format, tick and margin sizes, reader choice,
//!   cue names and output device
//! - Generic YAML loading/saving for any serde config type
//! - Platform config paths
//!
//! # Usage
//!
//! ```ignore
//! use crossdeck_core::config::{default_config_path, load_config, save_config, EngineConfig};
//!
//! let path = default_config_path("engine.yaml");
//! let config: EngineConfig = load_config(&path);
//! save_config(&config, &path)?;
//! ```

mod engine;
mod io;
mod paths;

pub use engine::{EngineConfig, OutputFormatConfig};
pub use io::{load_config, save_config};
pub use paths::{default_config_dir, default_config_path};
