use serde::{Deserialize, Serialize};

/// Player-visible state of a single cell.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellState {
    #[default]
    Closed,
    Open,
    Flagged,
}

impl CellState {
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Open)
    }
}

/// One grid position. `has_mine` and `neighbor_mines` are fixed when the board is built, only `state` changes
/// during play.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    has_mine: bool,
    neighbor_mines: u8,
    state: CellState,
}

impl Cell {
    pub(crate) const fn new(has_mine: bool, neighbor_mines: u8) -> Self {
        Self {
            has_mine,
            neighbor_mines,
            state: CellState::Closed,
        }
    }

    pub const fn has_mine(self) -> bool {
        self.has_mine
    }

    /// Number of mines among the adjacent cells, meaningless for mine cells.
    pub const fn neighbor_mines(self) -> u8 {
        self.neighbor_mines
    }

    pub const fn state(self) -> CellState {
        self.state
    }

    pub(crate) fn set_state(&mut self, state: CellState) {
        self.state = state;
    }
}
