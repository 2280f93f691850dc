//! Sparse symbol grid addressed by (bar, subdivision, lane).

use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use crate::edit::Edit;

/// Number of bars on the sheet.
pub const BARS: u8 = 42;

/// Subdivisions (beats) per bar.
pub const SUBDIVISIONS_PER_BAR: u8 = 4;

/// Pitch lanes: 4 staff lines plus 4 gaps.
pub const LANES: u8 = 8;

/// Number of distinct playhead positions.
pub const TOTAL_POSITIONS: usize = BARS as usize * SUBDIVISIONS_PER_BAR as usize;

/// Map a linear playhead position to its (bar, subdivision) slot.
///
/// Positions past the end wrap around, matching the scheduler's modular
/// playhead.
pub const fn slot_of(pos: usize) -> (u8, u8) {
    let pos = pos % TOTAL_POSITIONS;
    (
        (pos / SUBDIVISIONS_PER_BAR as usize) as u8,
        (pos % SUBDIVISIONS_PER_BAR as usize) as u8,
    )
}

/// Errors from grid addressing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum GridError {
    /// A coordinate component lies outside the fixed grid dimensions.
    #[error("grid coordinate out of bounds: bar {bar}, subdivision {subdivision}, lane {lane}")]
    OutOfBounds { bar: u8, subdivision: u8, lane: u8 },
}

/// The kind of symbol placed at a grid coordinate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum SymbolKind {
    Full,
    Half,
    /// Two half-beat strikes inside one tick window.
    Combo,
    Rest,
}

impl SymbolKind {
    /// Length of each strike in beats. `None` for rests.
    pub const fn beats(self) -> Option<f32> {
        match self {
            SymbolKind::Full => Some(1.0),
            SymbolKind::Half | SymbolKind::Combo => Some(0.5),
            SymbolKind::Rest => None,
        }
    }

    /// How many times the symbol sounds per tick.
    pub const fn strikes(self) -> u8 {
        match self {
            SymbolKind::Combo => 2,
            SymbolKind::Rest => 0,
            SymbolKind::Full | SymbolKind::Half => 1,
        }
    }

    pub const fn is_rest(self) -> bool {
        matches!(self, SymbolKind::Rest)
    }
}

/// A cell address on the sheet.
///
/// Ordering is bar-major, then subdivision, then lane, so all lanes of one
/// slot form a contiguous key range.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GridCoord {
    pub bar: u8,
    pub subdivision: u8,
    pub lane: u8,
}

impl GridCoord {
    /// Create a coordinate, rejecting components outside the grid.
    pub fn new(bar: u8, subdivision: u8, lane: u8) -> Result<Self, GridError> {
        let coord = Self { bar, subdivision, lane };
        coord.check()?;
        Ok(coord)
    }

    /// Verify that every component is within the grid dimensions.
    pub fn check(&self) -> Result<(), GridError> {
        if self.bar >= BARS || self.subdivision >= SUBDIVISIONS_PER_BAR || self.lane >= LANES {
            return Err(GridError::OutOfBounds {
                bar: self.bar,
                subdivision: self.subdivision,
                lane: self.lane,
            });
        }
        Ok(())
    }

    /// Linear playhead position of this coordinate's slot.
    pub const fn position(&self) -> usize {
        self.bar as usize * SUBDIVISIONS_PER_BAR as usize + self.subdivision as usize
    }
}

/// Sparse store of placed symbols. At most one symbol per coordinate.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Grid {
    cells: BTreeMap<GridCoord, SymbolKind>,
}

impl Grid {
    /// Create an empty grid.
    pub fn new() -> Self {
        Self { cells: BTreeMap::new() }
    }

    /// Place a symbol, replacing whatever occupied the coordinate.
    ///
    /// Returns the previous occupant.
    pub fn place(&mut self, coord: GridCoord, kind: SymbolKind) -> Result<Option<SymbolKind>, GridError> {
        coord.check()?;
        Ok(self.cells.insert(coord, kind))
    }

    /// Remove the symbol at a coordinate. Erasing an empty cell is a no-op.
    pub fn erase(&mut self, coord: GridCoord) -> Result<Option<SymbolKind>, GridError> {
        coord.check()?;
        Ok(self.cells.remove(&coord))
    }

    /// Look up the symbol at a coordinate.
    pub fn get(&self, coord: GridCoord) -> Result<Option<SymbolKind>, GridError> {
        coord.check()?;
        Ok(self.cells.get(&coord).copied())
    }

    /// All `(lane, kind)` pairs at one bar/subdivision, in ascending lane order.
    pub fn symbols_at(&self, bar: u8, subdivision: u8) -> Result<Vec<(u8, SymbolKind)>, GridError> {
        let first = GridCoord::new(bar, subdivision, 0)?;
        let last = GridCoord { lane: LANES - 1, ..first };
        Ok(self
            .cells
            .range(first..=last)
            .map(|(coord, kind)| (coord.lane, *kind))
            .collect())
    }

    /// Returns true if any lane holds a symbol at the given slot.
    pub fn is_slot_occupied(&self, bar: u8, subdivision: u8) -> Result<bool, GridError> {
        let first = GridCoord::new(bar, subdivision, 0)?;
        let last = GridCoord { lane: LANES - 1, ..first };
        Ok(self.cells.range(first..=last).next().is_some())
    }

    /// Apply an edit command. Returns the symbol that was displaced, if any.
    pub fn apply(&mut self, edit: &Edit) -> Result<Option<SymbolKind>, GridError> {
        match *edit {
            Edit::Place { coord, kind } => self.place(coord, kind),
            Edit::Erase { coord } => self.erase(coord),
        }
    }

    /// Remove every symbol.
    pub fn clear(&mut self) {
        self.cells.clear();
    }

    /// Number of placed symbols.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Iterate over all placed symbols in coordinate order.
    pub fn iter(&self) -> impl Iterator<Item = (GridCoord, SymbolKind)> + '_ {
        self.cells.iter().map(|(coord, kind)| (*coord, *kind))
    }
}
