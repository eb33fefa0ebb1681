//! Transitions between two sources
//!
//! Both transitions are scheduled relative to the moment they were created:
//! the splice point (the *border*) sits `insert` after creation. Each tick the
//! border is converted to a frame offset from the start of the now-source's
//! playable region, at the now-source's sample rate.
//!
//! While the border is beyond the tick (playable region plus margin-after),
//! the next-source is kept silent. Once the border comes within reach the
//! next-source is started and both process buffers are shaped around it.
//! Border offsets apply to each source's buffer as `margin_before + border`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use super::Script;
use crate::source::{AudioSource, Sources};
use crate::types::{Sample, SourceId};

/// State shared by both transitions
#[derive(Debug)]
struct Schedule {
    now: SourceId,
    next: SourceId,
    insert: Duration,
    started: Instant,
    completed: AtomicBool,
}

/// Where the border falls for the coming tick
struct Splice<'a> {
    now: &'a mut AudioSource,
    next: &'a mut AudioSource,
    /// Border offset from the playable start, in now-source frames
    border: i64,
    sample_rate: f64,
}

impl Schedule {
    fn new(now: SourceId, next: SourceId, insert: Duration, started: Instant) -> Self {
        Self {
            now,
            next,
            insert,
            started,
            completed: AtomicBool::new(false),
        }
    }

    fn is_completed(&self) -> bool {
        self.completed.load(Ordering::Acquire)
    }

    fn complete(&self, name: &str) {
        if !self.completed.swap(true, Ordering::AcqRel) {
            log::info!("{}: {} -> {} completed", name, self.now, self.next);
        }
    }

    /// Resolve both sources and the border, silencing the next-source while
    /// the border is out of reach
    ///
    /// Returns `None` when there is nothing to shape this tick. A missing
    /// source, or a now-source that cannot load, completes the transition.
    fn splice<'a>(&self, name: &str, sources: &'a mut Sources, at: Instant) -> Option<Splice<'a>> {
        let Some((now, next)) = sources.pair_mut(self.now, self.next) else {
            self.complete(name);
            return None;
        };
        if !now.load() {
            self.complete(name);
            return None;
        }
        let sample_rate = now.sample_rate()? as f64;

        let elapsed = at.saturating_duration_since(self.started).as_secs_f64();
        let remaining = self.insert.as_secs_f64() - elapsed;
        let border = (remaining * sample_rate) as i64;

        if border >= (now.buffer_size() + now.margin_after()) as i64 {
            next.map_process_buffer(|b| b.modify(|_, _, _| 0));
            return None;
        }
        if !next.is_playing() && next.play() {
            log::debug!("{}: starting source {}", name, next.id());
            next.on_play_update();
        }
        Some(Splice {
            now,
            next,
            border,
            sample_rate,
        })
    }
}

/// Hard splice: the now-source stops sounding at the border and the
/// next-source starts there
#[derive(Debug)]
pub struct FastCutIn {
    schedule: Schedule,
}

impl FastCutIn {
    /// Cut from `now` to `next`, `insert` from now
    pub fn new(now: SourceId, next: SourceId, insert: Duration) -> Self {
        Self::starting_at(now, next, insert, Instant::now())
    }

    /// Same as [`new`](Self::new) with an explicit creation instant
    pub fn starting_at(now: SourceId, next: SourceId, insert: Duration, started: Instant) -> Self {
        Self {
            schedule: Schedule::new(now, next, insert, started),
        }
    }

    /// [`apply`](Script::apply) as if the current time were `at`
    pub fn apply_at(&self, sources: &mut Sources, at: Instant) {
        let Some(splice) = self.schedule.splice(self.name(), sources, at) else {
            return;
        };
        let Splice { now, next, border, .. } = splice;

        let now_split = now.margin_before() as i64 + border;
        let now_end = now.procsize() as i64;
        now.map_process_buffer(|b| b.modify_between(now_split, now_end, |_, _, _| 0));

        let next_split = next.margin_before() as i64 + border;
        next.map_process_buffer(|b| b.modify_between(0, next_split, |_, _, _| 0));

        if border < now.buffer_size() as i64 {
            self.schedule.complete(self.name());
        }
    }
}

impl Script for FastCutIn {
    fn name(&self) -> &'static str {
        "fast-cut-in"
    }

    fn apply(&self, sources: &mut Sources) {
        self.apply_at(sources, Instant::now());
    }

    fn is_completed(&self) -> bool {
        self.schedule.is_completed()
    }
}

/// Linear cross-fade over `work`, starting at the border
#[derive(Debug)]
pub struct SimpleCrossFade {
    schedule: Schedule,
    work: Duration,
}

impl SimpleCrossFade {
    /// Fade from `now` to `next` over `work`, beginning `insert` from now
    pub fn new(now: SourceId, next: SourceId, insert: Duration, work: Duration) -> Self {
        Self::starting_at(now, next, insert, work, Instant::now())
    }

    /// Same as [`new`](Self::new) with an explicit creation instant
    pub fn starting_at(
        now: SourceId,
        next: SourceId,
        insert: Duration,
        work: Duration,
        started: Instant,
    ) -> Self {
        Self {
            schedule: Schedule::new(now, next, insert, started),
            work,
        }
    }

    /// [`apply`](Script::apply) as if the current time were `at`
    pub fn apply_at(&self, sources: &mut Sources, at: Instant) {
        let Some(splice) = self.schedule.splice(self.name(), sources, at) else {
            return;
        };
        let Splice {
            now,
            next,
            border,
            sample_rate,
        } = splice;
        let work = (self.work.as_secs_f64() * sample_rate) as i64;

        let now_split = now.margin_before() as i64 + border;
        now.map_process_buffer(|b| b.modify(|_, f, v| fade_out(v, f as i64 - now_split, work)));

        let next_split = next.margin_before() as i64 + border;
        next.map_process_buffer(|b| b.modify(|_, f, v| fade_in(v, f as i64 - next_split, work)));

        if border + work <= now.buffer_size() as i64 {
            self.schedule.complete(self.name());
        }
    }
}

impl Script for SimpleCrossFade {
    fn name(&self) -> &'static str {
        "simple-cross-fade"
    }

    fn apply(&self, sources: &mut Sources) {
        self.apply_at(sources, Instant::now());
    }

    fn is_completed(&self) -> bool {
        self.schedule.is_completed()
    }
}

/// Gain applied `pos` frames after the border, fading out over `work`
fn fade_out(v: Sample, pos: i64, work: i64) -> Sample {
    if pos < 0 {
        v
    } else if pos < work {
        (v as f64 * (work - pos) as f64 / work as f64) as Sample
    } else {
        0
    }
}

fn fade_in(v: Sample, pos: i64, work: i64) -> Sample {
    if pos < 0 {
        0
    } else if pos < work {
        (v as f64 * pos as f64 / work as f64) as Sample
    } else {
        v
    }
}
