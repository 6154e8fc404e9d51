use core::ops::Index;
use ndarray::Array2;
use rand::prelude::*;
use serde::{Deserialize, Serialize};

use crate::types::nd_index;
use crate::*;

/// Strategy used to lay out mines for a new board.
pub trait BoardGenerator {
    fn generate(self, config: GameConfig) -> Result<Board>;
}

/// Purely random placement: uniformly sampled `(row, col)` pairs, resampled on collision. The first opened cell is
/// not protected.
#[derive(Clone, Debug, PartialEq)]
pub struct RandomBoardGenerator {
    seed: u64,
}

impl RandomBoardGenerator {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Generator with a seed drawn from the operating system.
    pub fn from_entropy() -> Self {
        Self::new(SmallRng::from_os_rng().random())
    }
}

impl BoardGenerator for RandomBoardGenerator {
    fn generate(self, config: GameConfig) -> Result<Board> {
        let (rows, cols) = config.size();
        // at least one free cell has to remain or the resampling below never finishes
        let config = GameConfig::new(rows, cols, config.mines())?;

        let mut mine_mask: Array2<bool> = Array2::default(nd_index(config.size()));
        let mut rng = SmallRng::seed_from_u64(self.seed);

        let mut mines_placed = 0;
        while mines_placed < config.mines() {
            let coords = (rng.random_range(0..rows), rng.random_range(0..cols));
            let slot = &mut mine_mask[nd_index(coords)];
            if !*slot {
                *slot = true;
                mines_placed += 1;
            }
        }

        log::debug!(
            "Generated {}x{} board with {} mines (seed {})",
            rows,
            cols,
            mines_placed,
            self.seed
        );
        Ok(Board::from_mine_mask(mine_mask))
    }
}

/// Builds a fresh, randomly mined board for the given dimensions.
pub fn create_board(rows: Coord, cols: Coord, mines: CellCount) -> Result<Board> {
    let config = GameConfig::new(rows, cols, mines)?;
    RandomBoardGenerator::from_entropy().generate(config)
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BoardSnapshot")]
pub struct Board {
    cells: Array2<Cell>,
    mine_count: CellCount,
}

/// Serialized form of a board, the cached mine count is recomputed instead of trusted.
#[derive(Deserialize)]
struct BoardSnapshot {
    cells: Array2<Cell>,
}

impl TryFrom<BoardSnapshot> for Board {
    type Error = GameError;

    fn try_from(snapshot: BoardSnapshot) -> Result<Self> {
        let BoardSnapshot { cells } = snapshot;
        let (rows, cols) = cells.dim();
        let (Ok(rows), Ok(cols)) = (Coord::try_from(rows), Coord::try_from(cols)) else {
            return Err(GameError::InvalidSnapshot);
        };

        let layout = Self::from_mine_mask(cells.map(|cell| cell.has_mine()));
        GameConfig::new(rows, cols, layout.mine_count)?;

        let counts_match = cells
            .iter()
            .zip(layout.cells.iter())
            .all(|(cell, fresh)| cell.has_mine() || cell.neighbor_mines() == fresh.neighbor_mines());
        if !counts_match {
            return Err(GameError::InvalidSnapshot);
        }

        Ok(Self {
            cells,
            mine_count: layout.mine_count,
        })
    }
}

impl Board {
    fn from_mine_mask(mine_mask: Array2<bool>) -> Self {
        let (rows, cols) = mine_mask.dim();
        let size = (rows as Coord, cols as Coord);
        let mut mine_count = 0;
        let cells = Array2::from_shape_fn(mine_mask.dim(), |(row, col)| {
            if mine_mask[(row, col)] {
                mine_count += 1;
                Cell::new(true, 0)
            } else {
                let adjacent = neighbors((row as Coord, col as Coord), size)
                    .filter(|&pos| mine_mask[nd_index(pos)])
                    .count();
                Cell::new(false, adjacent as u8)
            }
        });
        Self { cells, mine_count }
    }

    /// Board with a fixed mine layout, mostly useful for fixtures and replays.
    pub fn from_mine_coords(rows: Coord, cols: Coord, mine_coords: &[Coord2]) -> Result<Self> {
        let mut mine_mask: Array2<bool> = Array2::default(nd_index((rows, cols)));

        for &coords in mine_coords {
            if coords.0 >= rows || coords.1 >= cols {
                return Err(GameError::InvalidCoords);
            }
            mine_mask[nd_index(coords)] = true;
        }

        let board = Self::from_mine_mask(mine_mask);
        GameConfig::new(rows, cols, board.mine_count)?;
        Ok(board)
    }

    pub fn size(&self) -> Coord2 {
        let (rows, cols) = self.cells.dim();
        (rows as Coord, cols as Coord)
    }

    pub fn rows(&self) -> Coord {
        self.size().0
    }

    pub fn cols(&self) -> Coord {
        self.size().1
    }

    pub fn game_config(&self) -> GameConfig {
        let (rows, cols) = self.size();
        GameConfig::new_unchecked(rows, cols, self.mine_count)
    }

    pub fn mine_count(&self) -> CellCount {
        self.mine_count
    }

    pub fn total_cells(&self) -> CellCount {
        self.cells.len() as CellCount
    }

    pub fn safe_cell_count(&self) -> CellCount {
        self.total_cells().saturating_sub(self.mine_count)
    }

    pub fn contains(&self, coords: Coord2) -> bool {
        let (rows, cols) = self.size();
        coords.0 < rows && coords.1 < cols
    }

    pub fn get(&self, coords: Coord2) -> Option<&Cell> {
        self.cells.get(nd_index(coords))
    }

    pub(crate) fn get_mut(&mut self, coords: Coord2) -> Option<&mut Cell> {
        self.cells.get_mut(nd_index(coords))
    }

    /// The up to 8 cells touching `coords`.
    pub fn neighbors(&self, coords: Coord2) -> impl Iterator<Item = Coord2> + use<> {
        neighbors(coords, self.size())
    }

    /// All cells in row-major order together with their coordinates.
    pub fn iter(&self) -> impl Iterator<Item = (Coord2, &Cell)> {
        self.cells
            .indexed_iter()
            .map(|((row, col), cell)| ((row as Coord, col as Coord), cell))
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Cell> {
        self.cells.iter_mut()
    }
}

impl Index<Coord2> for Board {
    type Output = Cell;

    fn index(&self, coords: Coord2) -> &Self::Output {
        &self.cells[nd_index(coords)]
    }
}
