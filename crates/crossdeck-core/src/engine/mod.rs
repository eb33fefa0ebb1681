//! Render engine
//!
//! - [`AudioManager`]: lock-guarded registry of sources and scripts
//! - [`AudioRoutine`]: one tick of refresh, scripts, mixing and output
//! - [`AudioThread`]: the real-time thread running routine ticks

mod manager;
mod routine;
mod thread;

pub use manager::AudioManager;
pub use routine::{mix, AudioRoutine};
pub use thread::AudioThread;
