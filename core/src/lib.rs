//! Minesweeper core: the true-state board engine, the read-only visibility
//! projection, the constraint-based inference solver, and the headless
//! simulation runner used to benchmark the solver.
//!
//! Ownership boundary: only [`board::Board`] holds true cell state (mines,
//! adjacency, reveal status). Everything else, the solver and simulator
//! included, works from a [`view::VisibleBoard`] snapshot and hands back a
//! [`solver::Move`] for the board to apply.

pub mod board;
pub mod rng;
pub mod sim;
pub mod solver;
pub mod view;

pub use board::{Board, BoardConfig, Cell, CellStatus, GameState, Point, RevealOutcome};
pub use sim::{SimResult, run_batch, simulate_game};
pub use solver::{Explanation, Move, MoveKind, ProbabilityMap, compute_next_move, probability_map};
pub use view::{VisibleBoard, VisibleCell};
