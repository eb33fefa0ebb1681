//! Audio output for Crossdeck
//!
//! The render loop produces interleaved integer PCM and hands it to an
//! [`OutputSink`]:
//!
//! - [`CpalSink`]: plays through a cpal device via a lock-free byte ring
//! - [`WavRecorderSink`]: records the mix to a WAV file
//! - [`MemorySink`]: captures to memory (offline rendering, tests)
//!
//! [`codec`] holds the 8/16/32-bit sample encoding shared by all of them.
//!
//! # Example Usage
//!
//! ```ignore
//! use crossdeck_core::audio::{CpalSink, SinkFactory};
//!
//! let factory: SinkFactory = Box::new(|| Ok(Box::new(CpalSink::new(None, 4)) as _));
//! ```

pub mod codec;
mod cpal_sink;
mod device;
mod error;
mod sink;
mod wav_sink;

pub use cpal_sink::CpalSink;
pub use device::{
    find_device_by_name, get_default_device, get_output_devices, resolve_output_device,
    AudioDevice,
};
pub use error::{AudioError, AudioResult};
pub use sink::{MemoryCapture, MemorySink, OutputSink, SinkFactory};
pub use wav_sink::WavRecorderSink;
