//! Output sink abstraction
//!
//! The render loop pushes one tick of interleaved PCM bytes at a time into an
//! [`OutputSink`]. Writes block until the sink accepts something and may
//! accept fewer bytes than offered; the loop keeps writing the remainder.
//!
//! Sinks are not required to be `Send` (device streams usually are not), so
//! the render thread builds its own through a [`SinkFactory`].

use std::sync::Arc;

use parking_lot::Mutex;

use super::error::{AudioError, AudioResult};
use crate::types::PcmFormat;

/// Destination for rendered audio
pub trait OutputSink {
    /// Prepare for `format`, buffering about `buffer_bytes` per tick
    fn open(&mut self, format: &PcmFormat, buffer_bytes: usize) -> AudioResult<()>;

    /// Bytes that can be written right now without blocking
    fn available(&self) -> usize;

    /// Write from the start of `bytes`, returning how many were accepted
    ///
    /// An error means the sink is unusable for the rest of the tick.
    fn write(&mut self, bytes: &[u8]) -> AudioResult<usize>;

    /// Flush and release the device
    fn close(&mut self);
}

/// Builds a sink on the render thread
pub type SinkFactory = Box<dyn FnOnce() -> AudioResult<Box<dyn OutputSink>> + Send>;

/// Shared view of the bytes captured by a [`MemorySink`]
#[derive(Debug, Clone, Default)]
pub struct MemoryCapture {
    bytes: Arc<Mutex<Vec<u8>>>,
    writes: Arc<Mutex<usize>>,
}

impl MemoryCapture {
    /// Copy of everything written so far
    pub fn bytes(&self) -> Vec<u8> {
        self.bytes.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.bytes.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of successful write calls
    pub fn write_count(&self) -> usize {
        *self.writes.lock()
    }
}

/// Sink that appends to memory
///
/// Useful for offline rendering and for driving the render loop in tests.
/// `chunk` caps how many bytes a single write accepts, which simulates a
/// device that drains slower than it is fed. `fail_after` makes every write
/// past that count fail.
#[derive(Debug)]
pub struct MemorySink {
    capture: MemoryCapture,
    chunk: usize,
    fail_after: Option<usize>,
    is_open: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self {
            capture: MemoryCapture::default(),
            chunk: usize::MAX,
            fail_after: None,
            is_open: false,
        }
    }

    /// Accept at most `chunk` bytes per write
    pub fn with_chunk(mut self, chunk: usize) -> Self {
        self.chunk = chunk.max(1);
        self
    }

    /// Fail every write after `writes` successful ones
    pub fn failing_after(mut self, writes: usize) -> Self {
        self.fail_after = Some(writes);
        self
    }

    /// Handle that stays readable after the sink moves to the render thread
    pub fn capture(&self) -> MemoryCapture {
        self.capture.clone()
    }
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputSink for MemorySink {
    fn open(&mut self, format: &PcmFormat, buffer_bytes: usize) -> AudioResult<()> {
        log::debug!(
            "MemorySink: open {} ch, {} bit, {} bytes per tick",
            format.channels,
            format.bits_per_sample,
            buffer_bytes
        );
        self.is_open = true;
        Ok(())
    }

    fn available(&self) -> usize {
        self.chunk
    }

    fn write(&mut self, bytes: &[u8]) -> AudioResult<usize> {
        if !self.is_open {
            return Err(AudioError::SinkClosed);
        }
        let mut writes = self.capture.writes.lock();
        if self.fail_after.is_some_and(|n| *writes >= n) {
            return Err(AudioError::SinkFailed("injected failure".to_string()));
        }
        let n = bytes.len().min(self.chunk);
        self.capture.bytes.lock().extend_from_slice(&bytes[..n]);
        *writes += 1;
        Ok(n)
    }

    fn close(&mut self) {
        self.is_open = false;
    }
}
