//! The visibility projection: what a player (or the solver) is allowed to see.
//!
//! One [`VisibleCell`] per true cell, computed on demand by
//! [`crate::board::Board::visible`]. Mine identity never crosses this
//! boundary.

use core::fmt;

use itertools::Itertools;

use crate::board::{Point, neighbors};

/// Player-visible value of a single cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum VisibleCell {
    Hidden,
    Flagged,
    /// Revealed with this many adjacent mines (0..=8).
    Open(u8),
}

impl VisibleCell {
    pub fn is_hidden(self) -> bool {
        self == VisibleCell::Hidden
    }

    pub fn is_flagged(self) -> bool {
        self == VisibleCell::Flagged
    }

    /// The adjacency count if this cell is revealed.
    pub fn clue(self) -> Option<u8> {
        match self {
            VisibleCell::Open(n) => Some(n),
            _ => None,
        }
    }
}

/// A read-only snapshot of the board as the player sees it. The solver's sole
/// input.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct VisibleBoard {
    rows: usize,
    cols: usize,
    grid: Vec<Vec<VisibleCell>>,
}

impl VisibleBoard {
    /// Builds a snapshot from a rectangular grid. Panics if the grid is empty
    /// or ragged.
    pub fn from_grid(grid: Vec<Vec<VisibleCell>>) -> Self {
        let rows = grid.len();
        assert!(rows > 0, "snapshot must have at least one row");
        let cols = grid[0].len();
        assert!(
            cols > 0 && grid.iter().all(|row| row.len() == cols),
            "snapshot rows must be non-empty and of equal length"
        );
        Self { rows, cols, grid }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Panics on out-of-bounds coordinates.
    pub fn get(&self, at: Point) -> VisibleCell {
        self.grid[at.row][at.col]
    }

    /// Every coordinate in stable row-major scan order. All solver
    /// tie-breaking leans on this order.
    pub fn positions(&self) -> impl Iterator<Item = Point> {
        (0..self.rows)
            .cartesian_product(0..self.cols)
            .map(|(row, col)| Point::new(row, col))
    }

    pub fn neighbors(&self, at: Point) -> impl Iterator<Item = Point> {
        neighbors(at, self.rows, self.cols)
    }

    pub fn hidden_count(&self) -> usize {
        self.positions().filter(|&p| self.get(p).is_hidden()).count()
    }
}

impl fmt::Display for VisibleBoard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in &self.grid {
            for cell in row {
                match cell {
                    VisibleCell::Hidden => write!(f, "■")?,
                    VisibleCell::Flagged => write!(f, "F")?,
                    VisibleCell::Open(0) => write!(f, "·")?,
                    VisibleCell::Open(n) => write!(f, "{n}")?,
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{Board, BoardConfig};

    #[test]
    fn projection_shows_markers_and_clues_only() {
        let config = BoardConfig::new(3, 3, 1);
        let mut board = Board::with_mines(config, &[Point::new(0, 0)]);
        board.reveal(Point::new(1, 1));
        board.toggle_flag(Point::new(0, 1));

        let vis = board.visible();
        assert_eq!(vis.get(Point::new(1, 1)), VisibleCell::Open(1));
        assert_eq!(vis.get(Point::new(0, 1)), VisibleCell::Flagged);
        // The mine projects exactly like any other hidden cell.
        assert_eq!(vis.get(Point::new(0, 0)), VisibleCell::Hidden);
        assert_eq!(vis.get(Point::new(2, 2)), VisibleCell::Hidden);
    }

    #[test]
    fn positions_scan_row_major() {
        let vis = VisibleBoard::from_grid(vec![vec![VisibleCell::Hidden; 3]; 2]);
        let order: Vec<Point> = vis.positions().collect();
        assert_eq!(order[0], Point::new(0, 0));
        assert_eq!(order[1], Point::new(0, 1));
        assert_eq!(order[3], Point::new(1, 0));
        assert_eq!(order.len(), 6);
    }

    #[test]
    #[should_panic(expected = "equal length")]
    fn ragged_grid_is_rejected() {
        VisibleBoard::from_grid(vec![
            vec![VisibleCell::Hidden; 3],
            vec![VisibleCell::Hidden; 2],
        ]);
    }
}
