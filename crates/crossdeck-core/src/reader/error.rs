//! Reader error types

use thiserror::Error;

/// Errors raised while opening or decoding an audio stream
#[derive(Error, Debug)]
pub enum ReaderError {
    /// I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Container or codec the strategy cannot handle
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// The stream contains no decodable audio track
    #[error("No audio track found")]
    NoAudioTrack,

    /// Decoding failed mid-stream
    #[error("Decode error: {0}")]
    Decode(String),
}

impl From<hound::Error> for ReaderError {
    fn from(e: hound::Error) -> Self {
        match e {
            hound::Error::IoError(io) => ReaderError::Io(io),
            hound::Error::Unsupported => ReaderError::UnsupportedFormat("WAV variant".to_string()),
            other => ReaderError::Decode(other.to_string()),
        }
    }
}

/// Result type for reader operations
pub type ReaderResult<T> = Result<T, ReaderError>;
