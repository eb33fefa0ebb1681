//! Audio output error types

use thiserror::Error;

/// Errors that can occur while encoding or emitting audio
#[derive(Error, Debug)]
pub enum AudioError {
    /// No audio devices available
    #[error("No audio output devices found")]
    NoDevices,

    /// Failed to get default device
    #[error("Failed to get default audio device: {0}")]
    NoDefaultDevice(String),

    /// Device not found
    #[error("Audio device not found: {0}")]
    DeviceNotFound(String),

    /// Failed to get device configuration
    #[error("Failed to get device config: {0}")]
    ConfigError(String),

    /// Failed to build audio stream
    #[error("Failed to build audio stream: {0}")]
    StreamBuildError(String),

    /// Failed to start/play stream
    #[error("Failed to start audio stream: {0}")]
    StreamPlayError(String),

    /// Stream error during playback
    #[error("Audio stream error: {0}")]
    StreamError(String),

    /// PCM bit depth outside 8/16/32
    #[error("Unsupported sample bit depth: {0}")]
    UnsupportedBitDepth(u16),

    /// Write attempted on a sink that is not open
    #[error("Output sink is not open")]
    SinkClosed,

    /// The sink cannot accept any more data
    #[error("Output sink failed: {0}")]
    SinkFailed(String),
}

/// Result type for audio operations
pub type AudioResult<T> = Result<T, AudioError>;
