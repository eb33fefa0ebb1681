//! Per-source tempo control

use std::collections::HashMap;

use parking_lot::Mutex;

use super::utility::change_speed;
use super::Script;
use crate::source::Sources;
use crate::types::SourceId;

/// Plays selected sources faster or slower without changing pitch
///
/// Speeds can be changed from any thread while the script is registered;
/// the render thread picks them up on its next tick.
#[derive(Debug, Default)]
pub struct SpeedControl {
    speeds: Mutex<HashMap<SourceId, f64>>,
}

impl SpeedControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the multiplier for `id` (1.0 is normal speed)
    pub fn set(&self, id: SourceId, speed: f64) {
        if speed > 0.0 && speed.is_finite() {
            self.speeds.lock().insert(id, speed);
        } else {
            log::warn!("Ignoring invalid speed {} for source {}", speed, id);
        }
    }

    pub fn remove(&self, id: SourceId) {
        self.speeds.lock().remove(&id);
    }

    pub fn speed(&self, id: SourceId) -> Option<f64> {
        self.speeds.lock().get(&id).copied()
    }
}

impl Script for SpeedControl {
    fn name(&self) -> &'static str {
        "speed-control"
    }

    fn apply(&self, sources: &mut Sources) {
        let speeds = self.speeds.lock();
        for (&id, &speed) in speeds.iter() {
            if speed == 1.0 {
                continue;
            }
            if let Some(source) = sources.get_mut(id).filter(|s| s.is_playing()) {
                change_speed(source, speed, 1.0);
            }
        }
    }
}
