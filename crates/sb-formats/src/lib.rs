//! Audio container formats for the staffbeat sequencer.
//!
//! Every sound the engine dispatches travels as a 16-bit mono RIFF/WAVE
//! file; this crate writes and reads that container and pitches a stored
//! container with the engine's nearest-neighbour resampler.

mod wav_format;

pub use wav_format::{
    resample_wav, samples_to_wav, unwrap_wav, wrap_pcm16, write_wav, DecodedWav,
};

/// Error type for container decoding.
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    /// Missing `RIFF` group tag or `WAVE` form tag
    #[error("not a RIFF/WAVE container")]
    InvalidHeader,
    /// Input ends before the 12-byte group header
    #[error("container truncated before its header")]
    UnexpectedEof,
    /// Structured read failure
    #[error("malformed container: {0}")]
    Parse(#[from] binrw::Error),
}
