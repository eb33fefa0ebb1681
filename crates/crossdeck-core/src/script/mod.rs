//! Scripts: effect units applied to the whole registry every tick
//!
//! The render loop calls [`Script::apply`] on every registered script, in
//! registration order, while holding the manager's write lock. A script may
//! read or rewrite any source's process buffer, playback state or seek
//! target. Scripts do not commute: when one must see another's output, add it
//! later.
//!
//! Scripts are shared as [`ScriptHandle`]s so a control thread can keep a
//! handle to configure (e.g. [`SpeedControl::set`]) or poll
//! ([`Script::is_completed`]) a script after registering it. Any state that
//! changes across ticks therefore lives behind interior mutability.
//!
//! Built-ins:
//! - [`SpeedControl`]: per-source tempo multipliers
//! - [`FastCutIn`]: hard splice from one source to another
//! - [`SimpleCrossFade`]: linear cross-fade from one source to another
//! - [`WaveCapture`]: snapshot of one channel for visualizers
//!
//! [`utility`] and [`cue_utility`] hold the per-source building blocks.

pub mod cue_utility;
mod speed;
mod transition;
pub mod utility;
mod wave_capture;

use std::sync::Arc;

pub use speed::SpeedControl;
pub use transition::{FastCutIn, SimpleCrossFade};
pub use wave_capture::{WaveCapture, WaveSnapshot};

use crate::source::Sources;

/// Effect unit run once per tick
pub trait Script: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Mutate sources for the coming tick
    fn apply(&self, sources: &mut Sources);

    /// Whether the script has finished and may be removed
    fn is_completed(&self) -> bool {
        false
    }
}

/// Shared handle to a registered script
pub type ScriptHandle = Arc<dyn Script>;
