//! Edit commands for mutating the grid during playback.

use crate::grid::{GridCoord, SymbolKind};

/// An edit command that mutates grid data.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Edit {
    /// Place a symbol, replacing any existing one.
    Place { coord: GridCoord, kind: SymbolKind },
    /// Remove the symbol at a coordinate.
    Erase { coord: GridCoord },
}
