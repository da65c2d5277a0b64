//! The board engine: sole owner of true cell state.
//!
//! Mines, adjacency counts and reveal status live here and are mutated only
//! through the operations below. The solver and any frontend see the board
//! exclusively through [`crate::view::VisibleBoard`].

use std::collections::VecDeque;

use crate::rng::Mulberry32;
use crate::view::{VisibleBoard, VisibleCell};

/// A 2D coordinate on the board, row-major.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Point {
    pub row: usize,
    pub col: usize,
}

impl Point {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

/// All valid grid-adjacent neighbors of a point, edges and corners handled.
pub fn neighbors(at: Point, rows: usize, cols: usize) -> impl Iterator<Item = Point> {
    (-1..=1).flat_map(move |dr: isize| {
        (-1..=1).filter_map(move |dc: isize| {
            if dr == 0 && dc == 0 {
                return None;
            }
            let nr = at.row as isize + dr;
            let nc = at.col as isize + dc;
            if nr >= 0 && nr < rows as isize && nc >= 0 && nc < cols as isize {
                Some(Point::new(nr as usize, nc as usize))
            } else {
                None
            }
        })
    })
}

/// Board dimensions and mine target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct BoardConfig {
    pub rows: usize,
    pub cols: usize,
    pub mines: usize,
}

impl BoardConfig {
    pub fn new(rows: usize, cols: usize, mines: usize) -> Self {
        Self { rows, cols, mines }
    }

    /// Classic 9x9 with 10 mines.
    pub fn beginner() -> Self {
        Self::new(9, 9, 10)
    }

    /// Classic 16x16 with 40 mines.
    pub fn intermediate() -> Self {
        Self::new(16, 16, 40)
    }

    /// Classic 16x30 with 99 mines.
    pub fn expert() -> Self {
        Self::new(16, 30, 99)
    }

    pub fn cell_count(&self) -> usize {
        self.rows * self.cols
    }
}

/// Player-facing status of a single true cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellStatus {
    Hidden,
    Revealed,
    Flagged,
}

/// True state of a single cell. Only the board engine mutates these.
#[derive(Debug, Clone, Copy)]
pub struct Cell {
    pub status: CellStatus,
    pub mine: bool,
    /// Number of mined grid-adjacent neighbors, 0..=8. Computed once after
    /// mine placement and never again.
    pub adjacent: u8,
}

impl Cell {
    fn hidden() -> Self {
        Self {
            status: CellStatus::Hidden,
            mine: false,
            adjacent: 0,
        }
    }
}

/// Current status of the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameState {
    Playing,
    Won,
    Lost,
}

/// What applying a reveal (or chord) did to the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealOutcome {
    /// One or more cells were revealed, no mine hit.
    Revealed,
    /// A mine was revealed; the game is lost.
    Mine,
    /// The action was redundant (non-hidden target, mismatched chord, game
    /// already over) and the board is unchanged.
    Ignored,
}

/// The true board. Mine placement is deferred until the first reveal so the
/// opening click and its neighbors can be kept mine-free.
pub struct Board {
    config: BoardConfig,
    seed: u32,
    cells: Vec<Vec<Cell>>,
    mines_placed: bool,
    state: GameState,
}

impl Board {
    /// A fresh all-hidden board. The seed fully determines the mine layout
    /// once the first reveal fixes the safe opening area.
    ///
    /// Panics if the mine target does not leave at least one safe cell.
    pub fn new(config: BoardConfig, seed: u32) -> Self {
        assert!(
            config.rows > 0 && config.cols > 0,
            "board must have at least one cell"
        );
        assert!(
            config.mines < config.cell_count(),
            "mine target must be less than the number of cells"
        );
        Self {
            config,
            seed,
            cells: vec![vec![Cell::hidden(); config.cols]; config.rows],
            mines_placed: false,
            state: GameState::Playing,
        }
    }

    pub fn config(&self) -> BoardConfig {
        self.config
    }

    pub fn rows(&self) -> usize {
        self.config.rows
    }

    pub fn cols(&self) -> usize {
        self.config.cols
    }

    pub fn state(&self) -> GameState {
        self.state
    }

    /// True cell state at `at`. Panics on out-of-bounds coordinates; callers
    /// other than endgame display and tests should use the projection.
    pub fn cell(&self, at: Point) -> Cell {
        self.cells[at.row][at.col]
    }

    fn neighbors_of(&self, at: Point) -> impl Iterator<Item = Point> {
        neighbors(at, self.config.rows, self.config.cols)
    }

    /// Derives the player-visible snapshot: hidden and flagged markers plus
    /// revealed adjacency counts, never mine identity.
    pub fn visible(&self) -> VisibleBoard {
        let grid = self
            .cells
            .iter()
            .map(|row| {
                row.iter()
                    .map(|cell| match cell.status {
                        CellStatus::Hidden => VisibleCell::Hidden,
                        CellStatus::Flagged => VisibleCell::Flagged,
                        CellStatus::Revealed => VisibleCell::Open(cell.adjacent),
                    })
                    .collect()
            })
            .collect();
        VisibleBoard::from_grid(grid)
    }

    /// Deterministically places mines from the seed, excluding the first
    /// clicked cell and its neighbors, then recomputes every adjacency count
    /// in one full pass. Called exactly once, lazily, by the first reveal.
    fn place_mines(&mut self, first: Point) {
        let BoardConfig { rows, cols, mines } = self.config;

        // Eligible pool: every cell outside the safe opening area, row-major.
        let mut pool: Vec<Point> = Vec::with_capacity(rows * cols);
        for row in 0..rows {
            for col in 0..cols {
                let p = Point::new(row, col);
                let banned = p == first || self.neighbors_of(first).any(|n| n == p);
                if !banned {
                    pool.push(p);
                }
            }
        }

        let mut rng = Mulberry32::new(self.seed);
        rng.shuffle(&mut pool);
        for &p in pool.iter().take(mines.min(pool.len())) {
            self.cells[p.row][p.col].mine = true;
        }

        self.recompute_adjacency();
        self.mines_placed = true;
    }

    fn recompute_adjacency(&mut self) {
        for row in 0..self.config.rows {
            for col in 0..self.config.cols {
                let p = Point::new(row, col);
                let count = self
                    .neighbors_of(p)
                    .filter(|n| self.cells[n.row][n.col].mine)
                    .count();
                self.cells[row][col].adjacent = count as u8;
            }
        }
    }

    /// Reveals a hidden cell. Redundant targets (already revealed, flagged,
    /// game over) are silently ignored. Hitting a mine loses the game and
    /// uncovers every mine for endgame display. Revealing a zero-adjacency
    /// cell floods its whole zero region plus the numbered border.
    pub fn reveal(&mut self, at: Point) -> RevealOutcome {
        if self.state != GameState::Playing
            || self.cells[at.row][at.col].status != CellStatus::Hidden
        {
            return RevealOutcome::Ignored;
        }

        if !self.mines_placed {
            self.place_mines(at);
        }

        if self.cells[at.row][at.col].mine {
            self.cells[at.row][at.col].status = CellStatus::Revealed;
            self.state = GameState::Lost;
            self.reveal_all_mines();
            return RevealOutcome::Mine;
        }

        self.flood_reveal(at);

        if self.check_win() {
            self.state = GameState::Won;
        }
        RevealOutcome::Revealed
    }

    /// Breadth-first reveal from a known-safe hidden cell. A cell enters the
    /// queue only via its Hidden -> Revealed transition, so every cell is
    /// processed at most once.
    fn flood_reveal(&mut self, at: Point) {
        let (rows, cols) = (self.config.rows, self.config.cols);
        let mut queue = VecDeque::new();

        let cell = &mut self.cells[at.row][at.col];
        cell.status = CellStatus::Revealed;
        if cell.adjacent == 0 {
            queue.push_back(at);
        }

        while let Some(p) = queue.pop_front() {
            for n in neighbors(p, rows, cols) {
                let cell = &mut self.cells[n.row][n.col];
                if cell.status != CellStatus::Hidden || cell.mine {
                    continue;
                }
                cell.status = CellStatus::Revealed;
                if cell.adjacent == 0 {
                    queue.push_back(n);
                }
            }
        }
    }

    fn reveal_all_mines(&mut self) {
        for row in self.cells.iter_mut() {
            for cell in row.iter_mut() {
                if cell.mine {
                    cell.status = CellStatus::Revealed;
                }
            }
        }
    }

    /// Alternates Hidden <-> Flagged. No-op on revealed cells or after the
    /// game has ended. Flag count bookkeeping is the caller's concern.
    pub fn toggle_flag(&mut self, at: Point) {
        if self.state != GameState::Playing {
            return;
        }
        let cell = &mut self.cells[at.row][at.col];
        cell.status = match cell.status {
            CellStatus::Hidden => CellStatus::Flagged,
            CellStatus::Flagged => CellStatus::Hidden,
            CellStatus::Revealed => CellStatus::Revealed,
        };
    }

    /// Reveals all remaining hidden neighbors of a revealed cell whose
    /// flagged-neighbor count matches its adjacency count. Each neighbor goes
    /// through [`Board::reveal`] individually, so a wrongly placed flag still
    /// loses the game. Anything else is a silent no-op.
    pub fn chord(&mut self, at: Point) -> RevealOutcome {
        if self.state != GameState::Playing {
            return RevealOutcome::Ignored;
        }
        let cell = self.cells[at.row][at.col];
        if cell.status != CellStatus::Revealed {
            return RevealOutcome::Ignored;
        }

        let flagged = self
            .neighbors_of(at)
            .filter(|n| self.cells[n.row][n.col].status == CellStatus::Flagged)
            .count();
        if flagged != cell.adjacent as usize {
            return RevealOutcome::Ignored;
        }

        let targets: Vec<Point> = self
            .neighbors_of(at)
            .filter(|n| self.cells[n.row][n.col].status == CellStatus::Hidden)
            .collect();
        if targets.is_empty() {
            return RevealOutcome::Ignored;
        }

        for n in targets {
            if self.reveal(n) == RevealOutcome::Mine {
                return RevealOutcome::Mine;
            }
        }
        RevealOutcome::Revealed
    }

    /// True iff the number of non-revealed cells equals the mine target.
    /// Flags do not have to sit on actual mines.
    pub fn check_win(&self) -> bool {
        let unrevealed = self
            .cells
            .iter()
            .flatten()
            .filter(|c| c.status != CellStatus::Revealed)
            .count();
        unrevealed == self.config.mines
    }

    /// Test constructor with a fixed mine layout instead of seeded placement.
    #[cfg(test)]
    pub(crate) fn with_mines(config: BoardConfig, mines: &[Point]) -> Self {
        let mut board = Self::new(config, 0);
        for &p in mines {
            board.cells[p.row][p.col].mine = true;
        }
        board.recompute_adjacency();
        board.mines_placed = true;
        board
    }
}
