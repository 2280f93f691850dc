//! Playback trait and error types.

use sb_formats::FormatError;

/// Error type for audio operations.
#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    /// No audio device available
    #[error("no audio device available")]
    NoDevice,
    /// Failed to initialize audio device
    #[error("device init error: {0}")]
    DeviceInit(String),
    /// Failed to create audio stream
    #[error("stream create error: {0}")]
    StreamCreate(String),
    /// Playback error
    #[error("playback error: {0}")]
    Playback(String),
    /// None of the configured external players is on the search path
    #[error("no external player found")]
    NoPlayer,
    /// Temporary file or process I/O
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// The container handed to a backend did not decode
    #[error("undecodable container: {0}")]
    Decode(#[from] FormatError),
}

/// A way of making a WAV container audible.
///
/// Implementations must return promptly; playback itself continues in the
/// background.
pub trait PlaybackBackend {
    /// Short name for log lines.
    fn name(&self) -> &str;

    /// Start playing a RIFF/WAVE container.
    fn play(&mut self, wav: &[u8]) -> Result<(), AudioError>;
}
