use serde::{Deserialize, Serialize};

use crate::*;

/// Valid transitions:
/// - InProgress -> Win
/// - InProgress -> Lose
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameStatus {
    #[default]
    InProgress,
    Win,
    Lose,
}

impl GameStatus {
    /// Indicates the game has ended and no moves can be made anymore
    pub const fn is_final(self) -> bool {
        matches!(self, Self::Win | Self::Lose)
    }
}

/// Lifecycle signals raised by the engine, in the order they happen.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEvent {
    /// First successful open of this game, raised exactly once.
    Started,
    /// The game reached a terminal status.
    Ended(GameStatus),
}

/// Receives lifecycle signals, typically a clock or a front end.
pub trait GameListener {
    fn started(&mut self) {}

    fn ended(&mut self, _status: GameStatus) {}
}

impl GameListener for () {}

impl GameListener for Vec<GameEvent> {
    fn started(&mut self) {
        self.push(GameEvent::Started);
    }

    fn ended(&mut self, status: GameStatus) {
        self.push(GameEvent::Ended(status));
    }
}

impl<L: GameListener + ?Sized> GameListener for &mut L {
    fn started(&mut self) {
        (**self).started();
    }

    fn ended(&mut self, status: GameStatus) {
        (**self).ended(status);
    }
}

/// Represents a game from start to finish
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "GameSnapshot")]
pub struct Game {
    board: Board,
    #[serde(skip)]
    open_count: CellCount,
    #[serde(skip)]
    flag_count: CellCount,
    status: GameStatus,
    started: bool,
    detonated: Option<Coord2>,
}

/// Serialized form of a game. Counters are rebuilt from the cells and the status is checked against them.
#[derive(Deserialize)]
struct GameSnapshot {
    board: Board,
    status: GameStatus,
    started: bool,
    detonated: Option<Coord2>,
}

impl TryFrom<GameSnapshot> for Game {
    type Error = GameError;

    fn try_from(snapshot: GameSnapshot) -> Result<Self> {
        let GameSnapshot {
            board,
            status,
            started,
            detonated,
        } = snapshot;

        let mut game = Self::new(board);
        for (_, cell) in game.board.iter() {
            match (cell.state(), cell.has_mine()) {
                (CellState::Open, false) => game.open_count += 1,
                (CellState::Flagged, _) => game.flag_count += 1,
                _ => {}
            }
        }
        let mine_opened = game
            .board
            .iter()
            .any(|(_, cell)| cell.has_mine() && cell.state().is_open());
        let detonated_ok = match detonated {
            Some(coords) => game
                .board
                .get(coords)
                .is_some_and(|cell| cell.has_mine() && cell.state().is_open()),
            None => true,
        };
        let all_safe_open = game.open_count == game.board.safe_cell_count();

        let consistent = detonated_ok
            && (started || (game.open_count == 0 && !mine_opened))
            && match status {
                GameStatus::InProgress => !mine_opened && !all_safe_open,
                GameStatus::Win => all_safe_open && !mine_opened,
                GameStatus::Lose => detonated.is_some(),
            };
        if !consistent {
            return Err(GameError::InvalidSnapshot);
        }

        game.status = status;
        game.started = started;
        game.detonated = detonated;
        Ok(game)
    }
}

impl Game {
    pub fn new(board: Board) -> Self {
        Self {
            board,
            open_count: 0,
            flag_count: 0,
            status: Default::default(),
            started: false,
            detonated: None,
        }
    }

    /// Fresh game on a randomly generated board.
    pub fn create(rows: Coord, cols: Coord, mines: CellCount) -> Result<Self> {
        Ok(Self::new(create_board(rows, cols, mines)?))
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    pub fn is_finished(&self) -> bool {
        self.status.is_final()
    }

    /// Whether the first successful open already happened.
    pub fn has_started(&self) -> bool {
        self.started
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn size(&self) -> Coord2 {
        self.board.size()
    }

    pub fn rows(&self) -> Coord {
        self.board.rows()
    }

    pub fn cols(&self) -> Coord {
        self.board.cols()
    }

    pub fn total_mines(&self) -> CellCount {
        self.board.mine_count()
    }

    pub fn cell_at(&self, coords: Coord2) -> Option<Cell> {
        self.board.get(coords).copied()
    }

    /// The mine that ended the game, if it was lost.
    pub fn detonated(&self) -> Option<Coord2> {
        self.detonated
    }

    pub fn flagged_count(&self) -> CellCount {
        self.flag_count
    }

    /// How many mines have not been flagged yet, never negative
    pub fn remaining_mines(&self) -> CellCount {
        self.total_mines().saturating_sub(self.flag_count)
    }

    /// Safe cells still waiting to be opened, computed from the board rather than the running counters.
    pub fn count_closed_safe_cells(&self) -> CellCount {
        self.board
            .iter()
            .filter(|(_, cell)| !cell.has_mine() && !cell.state().is_open())
            .count() as CellCount
    }

    pub fn open_cell(&mut self, coords: Coord2) -> OpenOutcome {
        self.open_cell_with(coords, &mut ())
    }

    /// Opens a closed cell, cascading over zero-count regions, and reports lifecycle changes to `listener`.
    pub fn open_cell_with(&mut self, coords: Coord2, listener: &mut impl GameListener) -> OpenOutcome {
        if self.status.is_final() {
            return OpenOutcome::NoChange;
        }
        let Some(&cell) = self.board.get(coords) else {
            return OpenOutcome::NoChange;
        };
        if cell.state() != CellState::Closed {
            return OpenOutcome::NoChange;
        }

        if !self.started {
            self.started = true;
            log::debug!("First open at {:?}", coords);
            listener.started();
        }

        if cell.has_mine() {
            self.set_open(coords);
            self.detonated = Some(coords);
            self.mark_ended(GameStatus::Lose, listener);
            return OpenOutcome::Explode;
        }

        if cell.neighbor_mines() == 0 {
            self.flood_reveal(coords);
        } else {
            self.set_open(coords);
            log::debug!("Open cell at {:?}, mine count: {}", coords, cell.neighbor_mines());
        }

        if self.open_count == self.board.safe_cell_count() {
            debug_assert_eq!(self.count_closed_safe_cells(), 0);
            self.mark_ended(GameStatus::Win, listener);
            OpenOutcome::Win
        } else {
            OpenOutcome::Safe
        }
    }

    /// Flag a closed cell or unflag a flagged one
    pub fn toggle_flag(&mut self, coords: Coord2) -> FlagOutcome {
        use CellState::*;

        if self.status.is_final() {
            return FlagOutcome::NoChange;
        }
        let Some(cell) = self.board.get_mut(coords) else {
            return FlagOutcome::NoChange;
        };

        match cell.state() {
            Closed => {
                cell.set_state(Flagged);
                self.flag_count = self.flag_count.saturating_add(1);
            }
            Flagged => {
                cell.set_state(Closed);
                self.flag_count = self.flag_count.saturating_sub(1);
            }
            Open => return FlagOutcome::NoChange,
        }
        log::trace!("Toggled flag at {:?}, {} flagged", coords, self.flag_count);
        FlagOutcome::Changed
    }

    fn set_open(&mut self, coords: Coord2) {
        if let Some(cell) = self.board.get_mut(coords) {
            cell.set_state(CellState::Open);
            if !cell.has_mine() {
                self.open_count = self.open_count.saturating_add(1);
            }
        }
    }

    /// Opens the zero-count region around `seed` and its numbered border, using an explicit stack so large boards
    /// cannot overflow the call stack.
    fn flood_reveal(&mut self, seed: Coord2) {
        let mut to_visit = vec![seed];
        log::trace!("Starting flood-fill from {:?}", seed);

        while let Some(coords) = to_visit.pop() {
            let cell = self.board[coords];
            // already opened through another path, flagged, or a mine
            if cell.state() != CellState::Closed || cell.has_mine() {
                continue;
            }

            self.set_open(coords);
            log::trace!(
                "Flood opened cell at {:?}, mine count: {}",
                coords,
                cell.neighbor_mines()
            );

            if cell.neighbor_mines() == 0 {
                to_visit.extend(self.board.neighbors(coords).filter(|&pos| {
                    let neighbor = self.board[pos];
                    neighbor.state() == CellState::Closed && !neighbor.has_mine()
                }));
            }
        }
    }

    /// Every mine becomes open, flagged ones included, other cells are left alone
    fn reveal_all_mines(&mut self) {
        let mut unflagged = 0;
        for cell in self.board.iter_mut().filter(|cell| cell.has_mine()) {
            if cell.state() == CellState::Flagged {
                unflagged += 1;
            }
            cell.set_state(CellState::Open);
        }
        self.flag_count = self.flag_count.saturating_sub(unflagged);
    }

    fn mark_ended(&mut self, status: GameStatus, listener: &mut impl GameListener) {
        if self.status.is_final() {
            return;
        }
        self.status = status;
        if status == GameStatus::Lose {
            self.reveal_all_mines();
        }
        log::debug!("Game ended: {:?}", status);
        listener.ended(status);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn game(rows: Coord, cols: Coord, mines: &[Coord2]) -> Game {
        Game::new(Board::from_mine_coords(rows, cols, mines).unwrap())
    }

    fn open_cells(game: &Game) -> Vec<Coord2> {
        game.board()
            .iter()
            .filter(|(_, cell)| cell.state() == CellState::Open)
            .map(|(coords, _)| coords)
            .collect()
    }

    fn state_at(game: &Game, coords: Coord2) -> CellState {
        game.cell_at(coords).unwrap().state()
    }

    #[test]
    fn fixture_open_numbered_cell_opens_only_itself() {
        let mut game = game(3, 3, &[(0, 1), (1, 1), (1, 2)]);

        assert_eq!(game.open_cell((2, 0)), OpenOutcome::Safe);

        assert_eq!(open_cells(&game), vec![(2, 0)]);
        assert_eq!(game.status(), GameStatus::InProgress);
    }

    #[test]
    fn flood_reveal_opens_zero_region_and_border() {
        // . . . .
        // . . . .
        // . . 1 1
        // . . 1 *
        let mut game = game(4, 4, &[(3, 3)]);

        assert_eq!(game.open_cell((0, 0)), OpenOutcome::Win);

        assert_eq!(open_cells(&game).len(), 15);
        assert_eq!(state_at(&game, (3, 3)), CellState::Closed);
        assert_eq!(game.status(), GameStatus::Win);
    }

    #[test]
    fn flood_reveal_stops_at_numbered_border() {
        // . 1 * 1 .
        // . 1 1 1 .
        // 2 2 1 . .
        // * * 1 . .
        let mut game = game(4, 5, &[(0, 2), (3, 0), (3, 1)]);

        assert_eq!(game.open_cell((1, 4)), OpenOutcome::Safe);

        let expected = [
            (0, 3),
            (0, 4),
            (1, 2),
            (1, 3),
            (1, 4),
            (2, 2),
            (2, 3),
            (2, 4),
            (3, 2),
            (3, 3),
            (3, 4),
        ];
        assert_eq!(open_cells(&game), expected);
        assert_eq!(game.count_closed_safe_cells(), 6);

        // the left region is a separate zero area
        assert_eq!(game.open_cell((0, 0)), OpenOutcome::Win);
        for mine in [(0, 2), (3, 0), (3, 1)] {
            assert_eq!(state_at(&game, mine), CellState::Closed);
        }
    }

    #[test]
    fn flood_reveal_does_not_cross_numbered_wall() {
        // . 2 * 2 .
        // . 3 * 3 .
        // . 2 * 2 .
        let mut game = game(3, 5, &[(0, 2), (1, 2), (2, 2)]);

        assert_eq!(game.open_cell((1, 0)), OpenOutcome::Safe);

        let opened = open_cells(&game);
        assert_eq!(opened.len(), 6);
        assert!(opened.iter().all(|&(_, col)| col < 2));
        assert_eq!(game.count_closed_safe_cells(), 6);
    }

    #[test]
    fn flood_reveal_skips_flagged_cells() {
        let mut game = game(3, 3, &[(2, 2)]);
        game.toggle_flag((0, 2));

        assert_eq!(game.open_cell((0, 0)), OpenOutcome::Safe);

        assert_eq!(state_at(&game, (0, 2)), CellState::Flagged);
        assert_eq!(game.count_closed_safe_cells(), 1);
        assert_eq!(game.flagged_count(), 1);
    }

    #[test]
    fn flood_reveal_handles_large_empty_board() {
        let mut game = game(400, 400, &[(399, 399)]);

        assert_eq!(game.open_cell((0, 0)), OpenOutcome::Win);
        assert_eq!(game.count_closed_safe_cells(), 0);
    }

    #[test]
    fn opening_mine_loses_and_reveals_every_mine() {
        let mines = [(0, 0), (0, 3), (2, 1)];
        let mut game = game(3, 4, &mines);
        game.toggle_flag((0, 3));
        game.toggle_flag((1, 1));

        assert_eq!(game.open_cell((0, 0)), OpenOutcome::Explode);

        assert_eq!(game.status(), GameStatus::Lose);
        assert_eq!(game.detonated(), Some((0, 0)));
        for mine in mines {
            assert_eq!(state_at(&game, mine), CellState::Open);
        }
        // safe cells keep their state, including wrong flags
        assert_eq!(state_at(&game, (1, 1)), CellState::Flagged);
        assert_eq!(open_cells(&game).len(), 3);
        assert_eq!(game.flagged_count(), 1);
    }

    #[test]
    fn finished_game_ignores_moves() {
        let mut game = game(2, 2, &[(0, 0)]);
        game.open_cell((0, 0));
        let snapshot = game.clone();

        assert_eq!(game.open_cell((1, 1)), OpenOutcome::NoChange);
        assert_eq!(game.toggle_flag((1, 0)), FlagOutcome::NoChange);
        assert_eq!(game, snapshot);
    }

    #[test]
    fn status_never_leaves_win() {
        let mut game = game(1, 2, &[(0, 1)]);

        assert_eq!(game.open_cell((0, 0)), OpenOutcome::Win);
        assert_eq!(game.open_cell((0, 1)), OpenOutcome::NoChange);
        assert_eq!(game.status(), GameStatus::Win);
        assert_eq!(state_at(&game, (0, 1)), CellState::Closed);
    }

    #[test]
    fn single_safe_cell_wins_immediately() {
        let mut game = Game::create(1, 1, 0).unwrap();
        assert_eq!(game.status(), GameStatus::InProgress);

        assert_eq!(game.open_cell((0, 0)), OpenOutcome::Win);
        assert_eq!(game.status(), GameStatus::Win);
    }

    #[test]
    fn full_board_is_rejected() {
        assert!(matches!(
            Game::create(3, 2, 6),
            Err(GameError::InvalidConfiguration { mines: 6, .. })
        ));
    }

    #[test]
    fn win_requires_every_safe_cell() {
        let mut game = game(1, 3, &[(0, 1)]);

        assert_eq!(game.open_cell((0, 0)), OpenOutcome::Safe);
        assert_eq!(game.status(), GameStatus::InProgress);
        assert_eq!(game.open_cell((0, 2)), OpenOutcome::Win);
        assert_eq!(state_at(&game, (0, 1)), CellState::Closed);
    }

    #[test]
    fn flags_never_trigger_win() {
        let mut game = game(1, 2, &[(0, 1)]);

        assert_eq!(game.toggle_flag((0, 1)), FlagOutcome::Changed);
        assert_eq!(game.status(), GameStatus::InProgress);
        assert!(!game.has_started());
    }

    #[test]
    fn repeated_open_is_a_no_op() {
        let mut game = game(2, 2, &[(1, 1)]);

        assert_eq!(game.open_cell((0, 1)), OpenOutcome::Safe);
        let snapshot = game.clone();
        assert_eq!(game.open_cell((0, 1)), OpenOutcome::NoChange);
        assert_eq!(game, snapshot);
    }

    #[test]
    fn out_of_bounds_is_a_no_op() {
        let mut game = game(2, 2, &[(1, 1)]);

        assert_eq!(game.open_cell((2, 0)), OpenOutcome::NoChange);
        assert_eq!(game.open_cell((0, Coord::MAX)), OpenOutcome::NoChange);
        assert_eq!(game.toggle_flag((5, 5)), FlagOutcome::NoChange);
        assert!(!game.has_started());
    }

    #[test]
    fn toggle_flag_cycles_and_skips_open_cells() {
        let mut game = game(2, 2, &[(1, 1)]);

        assert_eq!(game.toggle_flag((0, 0)), FlagOutcome::Changed);
        assert_eq!(state_at(&game, (0, 0)), CellState::Flagged);
        assert_eq!(game.open_cell((0, 0)), OpenOutcome::NoChange);
        assert_eq!(game.toggle_flag((0, 0)), FlagOutcome::Changed);
        assert_eq!(state_at(&game, (0, 0)), CellState::Closed);

        game.open_cell((0, 1));
        assert_eq!(game.toggle_flag((0, 1)), FlagOutcome::NoChange);
        assert_eq!(state_at(&game, (0, 1)), CellState::Open);
    }

    #[test]
    fn remaining_mines_floors_at_zero() {
        let mut game = game(2, 2, &[(1, 1)]);
        assert_eq!(game.remaining_mines(), 1);

        game.toggle_flag((0, 0));
        assert_eq!(game.remaining_mines(), 0);
        game.toggle_flag((0, 1));
        game.toggle_flag((1, 0));
        assert_eq!(game.flagged_count(), 3);
        assert_eq!(game.remaining_mines(), 0);

        game.toggle_flag((0, 1));
        game.toggle_flag((1, 0));
        game.toggle_flag((0, 0));
        assert_eq!(game.remaining_mines(), 1);
    }

    #[test]
    fn events_are_raised_once_in_order() {
        let mut game = game(1, 4, &[(0, 1)]);
        let mut events = Vec::new();

        game.open_cell_with((0, 0), &mut events);
        game.open_cell_with((0, 0), &mut events);
        game.open_cell_with((0, 2), &mut events);
        assert_eq!(events, vec![GameEvent::Started]);
        game.open_cell_with((0, 3), &mut events);
        game.open_cell_with((0, 1), &mut events);

        assert_eq!(
            events,
            vec![GameEvent::Started, GameEvent::Ended(GameStatus::Win)]
        );
    }

    #[test]
    fn losing_on_first_open_raises_both_events() {
        let mut game = game(2, 2, &[(0, 0)]);
        let mut events = Vec::new();

        game.open_cell_with((0, 0), &mut events);

        assert_eq!(
            events,
            vec![GameEvent::Started, GameEvent::Ended(GameStatus::Lose)]
        );
    }

    #[test]
    fn random_games_keep_counters_in_sync() {
        for seed in 0..16 {
            let board = RandomBoardGenerator::new(seed)
                .generate(GameConfig::intermediate())
                .unwrap();
            let mut game = Game::new(board);
            let mut coords = (0..16).flat_map(|row| (0..16).map(move |col| (row, col)));

            while !game.is_finished() {
                let Some(next) = coords.next() else { break };
                if game.board()[next].has_mine() {
                    game.toggle_flag(next);
                } else {
                    game.open_cell(next);
                }
                let flagged = game
                    .board()
                    .iter()
                    .filter(|(_, cell)| cell.state() == CellState::Flagged)
                    .count() as CellCount;
                assert_eq!(game.flagged_count(), flagged);
            }
            assert_eq!(game.status(), GameStatus::Win);
            assert_eq!(game.remaining_mines(), 40 - game.flagged_count());
        }
    }

    #[test]
    fn game_snapshot_roundtrips_through_json() {
        let mut game = game(3, 3, &[(2, 2)]);
        game.toggle_flag((2, 2));
        game.open_cell((0, 0));

        let json = serde_json::to_string(&game).unwrap();
        let back: Game = serde_json::from_str(&json).unwrap();

        assert_eq!(back, game);
    }

    #[test]
    fn snapshot_counters_are_rebuilt_from_cells() {
        let mut game = game(2, 2, &[(1, 1)]);
        game.toggle_flag((0, 0));
        let mut json = serde_json::to_value(&game).unwrap();
        json["flag_count"] = serde_json::json!(0);

        let mut back: Game = serde_json::from_value(json).unwrap();

        assert_eq!(back.flagged_count(), 1);
        assert_eq!(back.toggle_flag((0, 0)), FlagOutcome::Changed);
        assert_eq!(back.flagged_count(), 0);
        assert_eq!(back.remaining_mines(), 1);
    }

    #[test]
    fn snapshot_of_finished_game_keeps_win() {
        let mut game = game(1, 3, &[(0, 1)]);
        game.open_cell((0, 0));
        game.open_cell((0, 2));

        let json = serde_json::to_string(&game).unwrap();
        let mut back: Game = serde_json::from_str(&json).unwrap();

        assert_eq!(back, game);
        assert_eq!(back.status(), GameStatus::Win);
        assert_eq!(back.open_cell((0, 1)), OpenOutcome::NoChange);
    }

    #[test]
    fn snapshot_with_wrong_status_is_rejected() {
        let mut game = game(1, 3, &[(0, 1)]);
        game.open_cell((0, 0));
        let mut json = serde_json::to_value(&game).unwrap();
        json["status"] = serde_json::json!("Win");

        assert!(serde_json::from_value::<Game>(json).is_err());
    }

    #[test]
    fn snapshot_with_foreign_detonation_is_rejected() {
        let mut game = game(2, 2, &[(0, 0)]);
        game.open_cell((0, 0));
        let mut json = serde_json::to_value(&game).unwrap();
        json["detonated"] = serde_json::json!([1, 1]);

        assert!(serde_json::from_value::<Game>(json).is_err());
    }
}
