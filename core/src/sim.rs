//! Headless simulation: plays full games with the solver for benchmarking.
//!
//! Each game owns its board and shares nothing, so a batch over many seeds is
//! embarrassingly parallel; results are aggregated only at the end.

use std::time::Instant;

use rayon::prelude::*;

use crate::board::{Board, BoardConfig, GameState, Point};
use crate::solver::{self, MoveKind};

/// Outcome record of one simulated game.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SimResult {
    pub seed: u32,
    pub won: bool,
    pub time_ms: u64,
    /// Total moves applied, the opening reveal included.
    pub moves: u64,
    /// Moves resolved by the two certain-deduction tiers.
    pub exact_steps: u64,
    /// Largest frontier seen before any move of the game.
    pub frontier_max: usize,
    /// Total backtracking nodes spent in exact enumeration.
    pub visited_nodes: u64,
}

/// Plays one full game: seeded board, opening reveal at the grid center,
/// then project -> solve -> apply until the game ends. Terminates on win, on
/// a mine, or when the solver goes silent with no hidden cell left to guess.
pub fn simulate_game(config: BoardConfig, seed: u32) -> SimResult {
    let start = Instant::now();
    let mut board = Board::new(config, seed);

    let mut moves: u64 = 1;
    let mut exact_steps: u64 = 0;
    let mut frontier_max: usize = 0;
    let mut visited_nodes: u64 = 0;

    // The opening click: grid center, mine-free by lazy placement.
    board.reveal(Point::new(config.rows / 2, config.cols / 2));

    let won = loop {
        match board.state() {
            GameState::Won => break true,
            GameState::Lost => break false,
            GameState::Playing => {}
        }

        let vis = board.visible();
        frontier_max = frontier_max.max(solver::frontier_cells(&vis).len());

        let Some(mv) = solver::compute_next_move(&vis) else {
            // Nothing hidden is left to act on and the game is not won.
            break false;
        };
        if mv.explain.is_exact() {
            exact_steps += 1;
        }
        visited_nodes += mv.explain.visited_nodes();
        moves += 1;

        match mv.kind {
            MoveKind::Reveal => {
                board.reveal(mv.at);
            }
            MoveKind::Flag => board.toggle_flag(mv.at),
        }
    };

    let result = SimResult {
        seed,
        won,
        time_ms: start.elapsed().as_millis() as u64,
        moves,
        exact_steps,
        frontier_max,
        visited_nodes,
    };
    log::debug!(
        "seed {seed}: {} after {} moves ({} exact)",
        if won { "won" } else { "lost" },
        result.moves,
        result.exact_steps
    );
    result
}

/// Runs one independent game per seed in parallel. Results come back in seed
/// order regardless of scheduling.
pub fn run_batch(config: BoardConfig, seeds: &[u32]) -> Vec<SimResult> {
    seeds
        .par_iter()
        .map(|&seed| simulate_game(config, seed))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_board_wins_on_the_opening_move() {
        let result = simulate_game(BoardConfig::new(5, 5, 0), 1);
        assert!(result.won);
        assert_eq!(result.moves, 1);
        assert_eq!(result.exact_steps, 0);
    }

    #[test]
    fn results_are_reproducible_per_seed() {
        let config = BoardConfig::beginner();
        for seed in [1, 7, 42] {
            let a = simulate_game(config, seed);
            let b = simulate_game(config, seed);
            // Everything except wall-clock time must replay identically.
            assert_eq!(a.won, b.won);
            assert_eq!(a.moves, b.moves);
            assert_eq!(a.exact_steps, b.exact_steps);
            assert_eq!(a.frontier_max, b.frontier_max);
            assert_eq!(a.visited_nodes, b.visited_nodes);
        }
    }

    #[test]
    fn counters_stay_consistent() {
        let config = BoardConfig::beginner();
        for seed in 0..10 {
            let r = simulate_game(config, seed);
            assert_eq!(r.seed, seed);
            assert!(r.moves >= 1);
            assert!(r.exact_steps < r.moves, "opening move is never exact");
            assert!(r.frontier_max <= config.cell_count());
        }
    }

    #[test]
    fn batch_keeps_seed_order() {
        let seeds = [9, 2, 31, 4];
        let results = run_batch(BoardConfig::new(6, 6, 5), &seeds);
        assert_eq!(results.len(), seeds.len());
        for (r, &seed) in results.iter().zip(&seeds) {
            assert_eq!(r.seed, seed);
        }
    }

    #[test]
    fn batch_matches_sequential_runs() {
        let config = BoardConfig::new(8, 8, 10);
        let seeds: Vec<u32> = (0..6).collect();
        let parallel = run_batch(config, &seeds);
        for (r, &seed) in parallel.iter().zip(&seeds) {
            let solo = simulate_game(config, seed);
            assert_eq!(r.won, solo.won);
            assert_eq!(r.moves, solo.moves);
            assert_eq!(r.exact_steps, solo.exact_steps);
        }
    }
}
