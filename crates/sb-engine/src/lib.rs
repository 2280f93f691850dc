//! Playback engine for the staffbeat sequencer.
//!
//! Turns grid symbols into audio: lane pitch lookup, waveform synthesis,
//! nearest-neighbour resampling and the tempo-driven tick scheduler.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod frequency;
mod resample;
pub mod scheduler;
mod strike_queue;
mod synth;

pub use frequency::{lane_frequency, note_frequency, semitone_offset, REFERENCE_HZ};
pub use resample::{resample_nearest, MAX_RESAMPLE_RATIO};
pub use scheduler::{
    beats_to_seconds, clamp_bpm, tick_interval_ms, Scheduler, TransportState, Trigger,
    TriggerSource, MAX_BPM, MIN_BPM,
};
pub use strike_queue::StrikeQueue;
#[cfg(feature = "std")]
pub use synth::synthesize;
pub use synth::{synthesize_with_rng, SynthParams, DEFAULT_SAMPLE_RATE};
