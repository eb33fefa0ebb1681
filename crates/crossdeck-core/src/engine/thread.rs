//! The render thread
//!
//! One thread per engine runs [`AudioRoutine`] ticks back to back. Pacing
//! comes from the sink: a device sink blocks in `write` until the hardware
//! has drained enough, so the loop settles at one tick per buffer period.

use std::io;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use super::AudioRoutine;
use crate::audio::SinkFactory;

/// Window over which ticks per second are measured
const RATE_WINDOW: Duration = Duration::from_secs(1);

/// Handle to a running render thread
///
/// Dropping the handle stops the thread and waits for it.
pub struct AudioThread {
    running: Arc<AtomicBool>,
    /// Measured ticks per second, as `f32` bits
    tick_rate: Arc<AtomicU32>,
    handle: Option<JoinHandle<()>>,
}

impl AudioThread {
    /// Start rendering `routine` into the sink built by `sink_factory`
    ///
    /// The sink is built and opened on the render thread. If that fails the
    /// thread logs the error and exits; [`is_running`](Self::is_running)
    /// then reports false.
    pub fn spawn(mut routine: AudioRoutine, sink_factory: SinkFactory) -> io::Result<Self> {
        let running = Arc::new(AtomicBool::new(true));
        let tick_rate = Arc::new(AtomicU32::new(0f32.to_bits()));

        let thread_running = running.clone();
        let thread_rate = tick_rate.clone();
        let handle = thread::Builder::new()
            .name("crossdeck-render".to_string())
            .spawn(move || {
                promote_to_realtime();

                let mut sink = match sink_factory() {
                    Ok(sink) => sink,
                    Err(e) => {
                        log::error!("Render thread: failed to create output sink: {}", e);
                        thread_running.store(false, Ordering::Release);
                        return;
                    }
                };
                let format = *routine.format();
                if let Err(e) = sink.open(&format, routine.buffer_bytes()) {
                    log::error!("Render thread: failed to open output sink: {}", e);
                    thread_running.store(false, Ordering::Release);
                    return;
                }
                log::info!(
                    "Render thread started: {} Hz, {} ch, {} bit",
                    format.sample_rate,
                    format.channels,
                    format.bits_per_sample
                );

                let mut failing = false;
                let mut ticks = 0u32;
                let mut window_start = Instant::now();
                while thread_running.load(Ordering::Acquire) {
                    routine.update();
                    match routine.render(sink.as_mut()) {
                        Ok(()) => failing = false,
                        Err(e) => {
                            // Logged once per run of failures
                            if !failing {
                                log::error!("Render thread: tick dropped: {}", e);
                            }
                            failing = true;
                        }
                    }

                    ticks += 1;
                    let elapsed = window_start.elapsed();
                    if elapsed >= RATE_WINDOW {
                        let rate = ticks as f32 / elapsed.as_secs_f32();
                        thread_rate.store(rate.to_bits(), Ordering::Relaxed);
                        log::debug!("Render thread: {:.1} ticks/s", rate);
                        ticks = 0;
                        window_start = Instant::now();
                    }
                }

                sink.close();
                log::info!("Render thread stopped");
            })?;

        Ok(Self {
            running,
            tick_rate,
            handle: Some(handle),
        })
    }

    /// Whether the loop is still going
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
            && self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Ticks per second over the last measurement window (0 until the
    /// first window closes)
    pub fn ticks_per_second(&self) -> f32 {
        f32::from_bits(self.tick_rate.load(Ordering::Relaxed))
    }

    /// Finish the current tick, close the sink and join the thread
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("Render thread panicked");
            }
        }
    }
}

impl Drop for AudioThread {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Move the calling thread to the highest SCHED_FIFO priority
#[cfg(target_os = "linux")]
fn promote_to_realtime() {
    // SAFETY: plain libc calls on the current thread with a valid param
    let rc = unsafe {
        let param = libc::sched_param {
            sched_priority: libc::sched_get_priority_max(libc::SCHED_FIFO),
        };
        libc::pthread_setschedparam(libc::pthread_self(), libc::SCHED_FIFO, &param)
    };
    if rc == 0 {
        log::info!("Render thread promoted to SCHED_FIFO");
    } else {
        log::warn!(
            "Render thread: SCHED_FIFO unavailable ({}), keeping default priority",
            io::Error::from_raw_os_error(rc)
        );
    }
}

#[cfg(not(target_os = "linux"))]
fn promote_to_realtime() {
    log::warn!("Render thread: real-time priority not supported here, keeping default priority");
}
