use rand::prelude::*;

use crate::*;

/// Caller-owned play session: the current game plus its clock.
///
/// `create_game` both starts the first game and replaces a running one; the old game is dropped as a whole.
#[derive(Debug)]
pub struct Session {
    game: Game,
    clock: Clock,
    seeds: SmallRng,
}

impl Session {
    pub fn new(config: GameConfig) -> Result<Self> {
        Self::with_seeds(config, SmallRng::from_os_rng())
    }

    /// Session whose successive boards are fully determined by `seed`.
    pub fn with_generator_seed(config: GameConfig, seed: u64) -> Result<Self> {
        Self::with_seeds(config, SmallRng::seed_from_u64(seed))
    }

    fn with_seeds(config: GameConfig, mut seeds: SmallRng) -> Result<Self> {
        let board = RandomBoardGenerator::new(seeds.random()).generate(config)?;
        Ok(Self {
            game: Game::new(board),
            clock: Clock::new(),
            seeds,
        })
    }

    /// Starts a new game, keeping the current one if the configuration is invalid.
    pub fn create_game(&mut self, rows: Coord, cols: Coord, mines: CellCount) -> Result<()> {
        self.restart(GameConfig::new(rows, cols, mines)?)
    }

    /// New game with the same dimensions and mine count as the current one.
    pub fn restart_same(&mut self) -> Result<()> {
        self.restart(self.game.board().game_config())
    }

    fn restart(&mut self, config: GameConfig) -> Result<()> {
        let board = RandomBoardGenerator::new(self.seeds.random()).generate(config)?;
        self.game = Game::new(board);
        self.clock.reset();
        log::debug!(
            "new game {}x{} with {} mines",
            config.rows(),
            config.cols(),
            config.mines()
        );
        Ok(())
    }

    pub fn game(&self) -> &Game {
        &self.game
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub fn open_cell(&mut self, coords: Coord2) -> OpenOutcome {
        self.game.open_cell_with(coords, &mut self.clock)
    }

    pub fn toggle_flag(&mut self, coords: Coord2) -> FlagOutcome {
        self.game.toggle_flag(coords)
    }

    pub fn tick(&mut self) {
        self.clock.tick();
    }
}
