//! Core IR types for the staffbeat sequencer.
//!
//! This crate defines the data the editing front end mutates and the
//! scheduler reads: the sparse symbol grid, the lane-to-pitch table and
//! the waveform selection.
//!
//! Designed to be `no_std` compatible with the `alloc` crate.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod edit;
mod grid;
mod lane_map;
mod waveform;

pub use edit::Edit;
pub use grid::{
    slot_of, Grid, GridCoord, GridError, SymbolKind, BARS, LANES, SUBDIVISIONS_PER_BAR,
    TOTAL_POSITIONS,
};
pub use lane_map::{LaneMap, LaneMapError, NoteName, DEFAULT_LANE_NOTES};
pub use waveform::Waveform;
