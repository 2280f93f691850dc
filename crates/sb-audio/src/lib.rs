//! Audio backends for the staffbeat sequencer.
//!
//! Sounds leave the engine as WAV containers. The [`Dispatcher`] hands each
//! one to the best backend found at startup: an in-process cpal stream, an
//! external command-line player, or nothing at all.

mod capture;
mod cpal_backend;
mod dispatcher;
mod system_player;
mod traits;

pub use capture::{clamp_capture_duration, record_mono, MAX_CAPTURE, MIN_CAPTURE};
pub use cpal_backend::{voice_channel, CpalOutput, VoiceMixer, VoiceQueue};
pub use dispatcher::{BackendProbe, Dispatcher, SILENT_NOTICE};
pub use system_player::{PlayerCommand, SystemPlayer};
pub use traits::{AudioError, PlaybackBackend};
