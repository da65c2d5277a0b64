//! The inference solver: turns a visibility snapshot into the next move.
//!
//! Four tiers, tried in order, first success wins:
//!
//! 1. Single-constraint deduction: a clue whose residual need is zero makes
//!    every hidden neighbor safe; a need equal to the hidden-neighbor count
//!    makes every one a mine.
//! 2. Subset deduction: for clues A, B with hidden(A) ⊆ hidden(B), equal
//!    needs clear `B \ A`, and a need difference of `|B \ A|` mines it.
//! 3. Bounded exact enumeration: backtracking over every admissible
//!    mine/safe assignment of the frontier, skipped above
//!    [`MAX_FRONTIER`] cells.
//! 4. Probability fallback: averaged local-need heuristic, minimum
//!    probability wins.
//!
//! Every function here is a pure function of the snapshot: same input, same
//! move. Ties always break to the first candidate in row-major scan order.

use std::collections::{HashMap, HashSet};

use crate::board::Point;
use crate::view::{VisibleBoard, VisibleCell};

/// Frontier cap for exact enumeration. 2^18 assignments worst case; beyond
/// that the tier reports itself unavailable instead of blowing up.
pub const MAX_FRONTIER: usize = 18;

/// Probability threshold treated as "mine in every admissible assignment".
const CERTAIN_MINE: f64 = 0.999;

/// What a move does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveKind {
    Reveal,
    Flag,
}

/// Which rule produced a move, and what it looked at.
#[derive(Debug, Clone, PartialEq)]
pub enum Explanation {
    /// Tier 1: the clue at `clue` pinned down all of `cells` at once.
    Deterministic { clue: Point, cells: Vec<Point> },
    /// Tier 2: comparing two clue needs resolved the cells in `B \ A`.
    Subset {
        need_a: usize,
        need_b: usize,
        cells: Vec<Point>,
    },
    /// Tier 3: full frontier enumeration. `probability` is the target cell's
    /// mine probability over all `solutions` admissible assignments;
    /// `visited` counts search nodes.
    ExactFrontier {
        probability: f64,
        solutions: u64,
        visited: u64,
    },
    /// Tier 4: heuristic local-need average.
    Probability { probability: f64 },
}

impl Explanation {
    /// True for the two certain-deduction tiers, matching what the benchmark
    /// counts as "exact steps".
    pub fn is_exact(&self) -> bool {
        matches!(
            self,
            Explanation::Deterministic { .. } | Explanation::Subset { .. }
        )
    }

    /// Search nodes spent on this move, zero outside tier 3.
    pub fn visited_nodes(&self) -> u64 {
        match self {
            Explanation::ExactFrontier { visited, .. } => *visited,
            _ => 0,
        }
    }
}

/// One move for the board engine to apply. Produced per solver invocation,
/// consumed once, never retained as board state.
#[derive(Debug, Clone, PartialEq)]
pub struct Move {
    pub kind: MoveKind,
    pub at: Point,
    pub explain: Explanation,
}

impl Move {
    fn reveal(at: Point, explain: Explanation) -> Self {
        Self {
            kind: MoveKind::Reveal,
            at,
            explain,
        }
    }

    fn flag(at: Point, explain: Explanation) -> Self {
        Self {
            kind: MoveKind::Flag,
            at,
            explain,
        }
    }
}

/// Solver-internal constraint derived from one revealed numbered cell: the
/// hidden neighbors and the residual mine need among them (clue value minus
/// flagged neighbors). Rebuilt from scratch on every invocation.
struct Clue {
    at: Point,
    need: i32,
    hidden: Vec<Point>,
}

/// All clues with at least one hidden neighbor, in scan order. `need` may be
/// negative when the player has over-flagged a neighborhood.
fn clues(board: &VisibleBoard) -> Vec<Clue> {
    board
        .positions()
        .filter_map(|p| {
            let value = board.get(p).clue()?;
            if value == 0 {
                return None;
            }
            let mut flags = 0;
            let mut hidden = Vec::new();
            for n in board.neighbors(p) {
                match board.get(n) {
                    VisibleCell::Flagged => flags += 1,
                    VisibleCell::Hidden => hidden.push(n),
                    VisibleCell::Open(_) => {}
                }
            }
            if hidden.is_empty() {
                None
            } else {
                Some(Clue {
                    at: p,
                    need: i32::from(value) - flags,
                    hidden,
                })
            }
        })
        .collect()
}

/// Tier 1: per-clue residual deduction.
pub fn deterministic_move(board: &VisibleBoard) -> Option<Move> {
    for clue in clues(board) {
        // Residual zero: every hidden neighbor is safe.
        if clue.need == 0 {
            let at = clue.hidden[0];
            return Some(Move::reveal(
                at,
                Explanation::Deterministic {
                    clue: clue.at,
                    cells: clue.hidden,
                },
            ));
        }
        // Residual equals the hidden count: every hidden neighbor is a mine.
        if clue.need == clue.hidden.len() as i32 {
            let at = clue.hidden[0];
            return Some(Move::flag(
                at,
                Explanation::Deterministic {
                    clue: clue.at,
                    cells: clue.hidden,
                },
            ));
        }
    }
    None
}

/// Tier 2: pairwise subset deduction over clue hidden-neighbor sets.
pub fn subset_move(board: &VisibleBoard) -> Option<Move> {
    let clues: Vec<Clue> = clues(board).into_iter().filter(|c| c.need >= 0).collect();
    let sets: Vec<HashSet<Point>> = clues
        .iter()
        .map(|c| c.hidden.iter().copied().collect())
        .collect();

    for (i, a) in clues.iter().enumerate() {
        for (j, b) in clues.iter().enumerate() {
            if i == j || !a.hidden.iter().all(|p| sets[j].contains(p)) {
                continue;
            }
            // diff = hidden(B) \ hidden(A), in B's stable order.
            let diff: Vec<Point> = b
                .hidden
                .iter()
                .copied()
                .filter(|p| !sets[i].contains(p))
                .collect();
            if diff.is_empty() {
                continue;
            }
            let (need_a, need_b) = (a.need as usize, b.need as usize);

            // Equal needs: the extra cells on B's side carry no mines.
            if need_a == need_b {
                let at = diff[0];
                return Some(Move::reveal(
                    at,
                    Explanation::Subset {
                        need_a,
                        need_b,
                        cells: diff,
                    },
                ));
            }
            // B needs exactly |B \ A| more mines than A: all of them are mines.
            if need_b > need_a && need_b - need_a == diff.len() {
                let at = diff[0];
                return Some(Move::flag(
                    at,
                    Explanation::Subset {
                        need_a,
                        need_b,
                        cells: diff,
                    },
                ));
            }
        }
    }
    None
}

/// The frontier: hidden cells adjacent to at least one revealed numbered
/// cell, in first-encountered scan order. The only cells constraint
/// enumeration can say anything about.
pub fn frontier_cells(board: &VisibleBoard) -> Vec<Point> {
    let mut seen = HashSet::new();
    let mut frontier = Vec::new();
    for p in board.positions() {
        if board.get(p).clue().is_none() {
            continue;
        }
        for n in board.neighbors(p) {
            if board.get(n).is_hidden() && seen.insert(n) {
                frontier.push(n);
            }
        }
    }
    frontier
}

/// One clue constraint projected onto frontier indices.
struct FrontierConstraint {
    vars: Vec<usize>,
    need: usize,
}

/// Backtracking state for the exact enumeration.
struct Enumeration<'a> {
    constraints: &'a [FrontierConstraint],
    var_to_cons: &'a [Vec<usize>],
    assign: Vec<Option<bool>>,
    mine_tally: Vec<u64>,
    solutions: u64,
    visited: u64,
}

impl Enumeration<'_> {
    /// A constraint stays satisfiable iff its assigned mines do not exceed
    /// its need and the unassigned cells can still make up the difference.
    fn satisfiable(&self, ci: usize) -> bool {
        let c = &self.constraints[ci];
        let mut mines = 0;
        let mut unassigned = 0;
        for &v in &c.vars {
            match self.assign[v] {
                Some(true) => mines += 1,
                Some(false) => {}
                None => unassigned += 1,
            }
        }
        mines <= c.need && mines + unassigned >= c.need
    }

    /// Branch heuristic: the unassigned variable attached to the fewest
    /// constraints, so contradictions surface early.
    fn pick(&self) -> Option<usize> {
        self.assign
            .iter()
            .enumerate()
            .filter(|(_, a)| a.is_none())
            .min_by_key(|&(v, _)| self.var_to_cons[v].len())
            .map(|(v, _)| v)
    }

    fn search(&mut self) {
        self.visited += 1;
        let Some(v) = self.pick() else {
            // Complete admissible assignment: tally which cells carry mines.
            self.solutions += 1;
            for (i, a) in self.assign.iter().enumerate() {
                if *a == Some(true) {
                    self.mine_tally[i] += 1;
                }
            }
            return;
        };

        for mine in [false, true] {
            self.assign[v] = Some(mine);
            if self.var_to_cons[v].iter().all(|&ci| self.satisfiable(ci)) {
                self.search();
            }
            self.assign[v] = None;
        }
    }
}

/// Tier 3: exact constraint-satisfaction enumeration over the frontier.
///
/// Returns `None` when the frontier is empty or larger than `max_frontier`,
/// when no clue constrains it, or when no admissible assignment exists; the
/// caller cascades to the probability fallback in every one of those cases.
pub fn exact_frontier_move(board: &VisibleBoard, max_frontier: usize) -> Option<Move> {
    let frontier = frontier_cells(board);
    if frontier.is_empty() || frontier.len() > max_frontier {
        return None;
    }
    let index: HashMap<Point, usize> = frontier
        .iter()
        .enumerate()
        .map(|(i, &p)| (p, i))
        .collect();

    let mut constraints = Vec::new();
    for clue in clues(board) {
        let vars: Vec<usize> = clue.hidden.iter().map(|p| index[p]).collect();
        // Clamp: an over- or under-flagged neighborhood still yields a
        // well-formed constraint.
        let need = clue.need.clamp(0, vars.len() as i32) as usize;
        constraints.push(FrontierConstraint { vars, need });
    }
    if constraints.is_empty() {
        return None;
    }

    let mut var_to_cons = vec![Vec::new(); frontier.len()];
    for (ci, c) in constraints.iter().enumerate() {
        for &v in &c.vars {
            var_to_cons[v].push(ci);
        }
    }

    let mut search = Enumeration {
        constraints: &constraints,
        var_to_cons: &var_to_cons,
        assign: vec![None; frontier.len()],
        mine_tally: vec![0; frontier.len()],
        solutions: 0,
        visited: 0,
    };
    search.search();
    if search.solutions == 0 {
        log::debug!("exact enumeration found no admissible assignment");
        return None;
    }

    // A cell mined in every admissible assignment gets flagged; otherwise
    // reveal the globally least likely mine.
    let mut flag: Option<Move> = None;
    let mut best: Option<(Point, f64)> = None;
    for (i, &p) in frontier.iter().enumerate() {
        let probability = search.mine_tally[i] as f64 / search.solutions as f64;
        let explain = Explanation::ExactFrontier {
            probability,
            solutions: search.solutions,
            visited: search.visited,
        };
        if probability >= CERTAIN_MINE && flag.is_none() {
            flag = Some(Move::flag(p, explain.clone()));
        }
        if best.as_ref().is_none_or(|&(_, bp)| probability < bp) {
            best = Some((p, probability));
        }
    }
    flag.or_else(|| {
        best.map(|(p, probability)| {
            Move::reveal(
                p,
                Explanation::ExactFrontier {
                    probability,
                    solutions: search.solutions,
                    visited: search.visited,
                },
            )
        })
    })
}

/// Heuristic per-cell mine probabilities plus the frontier size, the way a
/// UI heat-map wants them.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbabilityMap {
    rows: usize,
    cols: usize,
    probs: Vec<Vec<f64>>,
    pub frontier_size: usize,
}

impl ProbabilityMap {
    /// Estimated mine probability. Only meaningful for hidden cells; cells
    /// touched by no clue sit at the 0.5 default.
    pub fn get(&self, at: Point) -> f64 {
        self.probs[at.row][at.col]
    }
}

/// Tier 4 groundwork: every clue spreads `need / hidden_count` (clamped to
/// [0, 1]) over its hidden neighbors; a cell's probability is the average of
/// the contributions it received, defaulting to 0.5 when no clue touches it.
pub fn probability_map(board: &VisibleBoard) -> ProbabilityMap {
    let (rows, cols) = (board.rows(), board.cols());
    let mut sums = vec![vec![0.0f64; cols]; rows];
    let mut counts = vec![vec![0u32; cols]; rows];

    for clue in clues(board) {
        if clue.need < 0 {
            continue;
        }
        let contribution = (clue.need as f64 / clue.hidden.len() as f64).clamp(0.0, 1.0);
        for p in &clue.hidden {
            sums[p.row][p.col] += contribution;
            counts[p.row][p.col] += 1;
        }
    }

    let mut probs = vec![vec![0.5f64; cols]; rows];
    for p in board.positions() {
        if board.get(p).is_hidden() && counts[p.row][p.col] > 0 {
            probs[p.row][p.col] = sums[p.row][p.col] / f64::from(counts[p.row][p.col]);
        }
    }

    ProbabilityMap {
        rows,
        cols,
        probs,
        frontier_size: frontier_cells(board).len(),
    }
}

/// Tier 4: reveal the minimum-probability hidden cell, unless some cell's
/// probability reaches 1, in which case flag it instead. `None` only when no
/// hidden cell remains.
fn probability_move(board: &VisibleBoard) -> Option<Move> {
    let map = probability_map(board);
    let mut flag: Option<Move> = None;
    let mut best: Option<(Point, f64)> = None;
    for p in board.positions() {
        if !board.get(p).is_hidden() {
            continue;
        }
        let probability = map.get(p);
        if probability >= 1.0 && flag.is_none() {
            flag = Some(Move::flag(p, Explanation::Probability { probability }));
        }
        if best.as_ref().is_none_or(|&(_, bp)| probability < bp) {
            best = Some((p, probability));
        }
    }
    flag.or_else(|| {
        best.map(|(p, probability)| Move::reveal(p, Explanation::Probability { probability }))
    })
}

/// The solver's public contract: the next move for this snapshot, or `None`
/// when no hidden cell is left to act on. Deterministic and stateless.
pub fn compute_next_move(board: &VisibleBoard) -> Option<Move> {
    deterministic_move(board)
        .or_else(|| subset_move(board))
        .or_else(|| exact_frontier_move(board, MAX_FRONTIER))
        .or_else(|| probability_move(board))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{Board, BoardConfig, GameState, RevealOutcome};

    use VisibleCell::{Flagged as F, Hidden as H, Open};

    fn snapshot(grid: Vec<Vec<VisibleCell>>) -> VisibleBoard {
        VisibleBoard::from_grid(grid)
    }

    #[test]
    fn lone_clue_with_single_hidden_neighbor_flags_it() {
        // A revealed "1" whose only hidden neighbor must hold its mine.
        let board = snapshot(vec![vec![H, Open(1)], vec![Open(1), Open(1)]]);
        let mv = compute_next_move(&board).unwrap();
        assert_eq!(mv.kind, MoveKind::Flag);
        assert_eq!(mv.at, Point::new(0, 0));
        assert!(matches!(mv.explain, Explanation::Deterministic { .. }));
    }

    #[test]
    fn satisfied_clue_reveals_remaining_neighbors() {
        // The flag already accounts for the "1", so the hidden cell is safe.
        let board = snapshot(vec![vec![F, Open(1), H]]);
        let mv = compute_next_move(&board).unwrap();
        assert_eq!(mv.kind, MoveKind::Reveal);
        assert_eq!(mv.at, Point::new(0, 2));
        assert!(matches!(
            mv.explain,
            Explanation::Deterministic {
                clue: Point { row: 0, col: 1 },
                ..
            }
        ));
    }

    #[test]
    fn subset_with_equal_needs_clears_the_extra_cell() {
        // hidden(A) = {(0,0),(0,1)} ⊆ hidden(B) = {(0,0),(0,1),(0,2)},
        // both need one mine, so B's extra cell (0,2) is safe.
        let board = snapshot(vec![
            vec![H, H, H],
            vec![Open(1), Open(1), Open(1)],
            vec![Open(0), Open(0), Open(0)],
        ]);
        assert!(deterministic_move(&board).is_none());
        let mv = subset_move(&board).unwrap();
        assert_eq!(mv.kind, MoveKind::Reveal);
        assert_eq!(mv.at, Point::new(0, 2));
        assert!(matches!(
            mv.explain,
            Explanation::Subset {
                need_a: 1,
                need_b: 1,
                ..
            }
        ));
    }

    #[test]
    fn subset_need_difference_flags_the_extra_cells() {
        // The 1-2-1 pattern: A = "1" over {(0,0),(0,1)}, B = "2" over the
        // same plus (0,2), so B's extra cell carries the extra mine.
        let board = snapshot(vec![
            vec![H, H, H],
            vec![Open(1), Open(2), Open(1)],
            vec![Open(0), Open(0), Open(0)],
        ]);
        assert!(deterministic_move(&board).is_none());
        let mv = subset_move(&board).unwrap();
        assert_eq!(mv.kind, MoveKind::Flag);
        assert_eq!(mv.at, Point::new(0, 2));
    }

    #[test]
    fn exact_enumeration_flags_a_forced_mine() {
        // a+b = 1, a+b+c = 1, b+c = 1 has the single solution b = mine.
        let board = snapshot(vec![vec![H, H, H], vec![Open(1), Open(1), Open(1)]]);
        let mv = exact_frontier_move(&board, MAX_FRONTIER).unwrap();
        assert_eq!(mv.kind, MoveKind::Flag);
        assert_eq!(mv.at, Point::new(0, 1));
        match mv.explain {
            Explanation::ExactFrontier {
                probability,
                solutions,
                visited,
            } => {
                assert_eq!(probability, 1.0);
                assert_eq!(solutions, 1);
                assert!(visited > 0);
            }
            other => panic!("unexpected explanation {other:?}"),
        }
    }

    #[test]
    fn exact_enumeration_reveals_the_least_likely_cell() {
        // a+b = 1 and (after the flag) a+b+c = 1 force c safe while a and b
        // stay at probability one half.
        let board = snapshot(vec![vec![H, H, H], vec![Open(1), Open(2), F]]);
        let mv = exact_frontier_move(&board, MAX_FRONTIER).unwrap();
        assert_eq!(mv.kind, MoveKind::Reveal);
        assert_eq!(mv.at, Point::new(0, 2));
        match mv.explain {
            Explanation::ExactFrontier {
                probability,
                solutions,
                ..
            } => {
                assert_eq!(probability, 0.0);
                assert_eq!(solutions, 2);
            }
            other => panic!("unexpected explanation {other:?}"),
        }
    }

    #[test]
    fn contradictory_constraints_leave_tier_three_silent() {
        // "1" and "2" over the same hidden pair cannot both hold, so
        // enumeration finds zero admissible assignments and steps aside.
        let board = snapshot(vec![
            vec![H, H],
            vec![Open(1), Open(2)],
            vec![Open(2), Open(1)],
        ]);
        assert!(exact_frontier_move(&board, MAX_FRONTIER).is_none());
        // The full pipeline still answers (an earlier tier or the fallback).
        assert!(compute_next_move(&board).is_some());
    }

    /// A 6x6 board whose outer ring (20 cells) is hidden and whose interior
    /// is revealed "1"s around a zero center. No clue's hidden set is a
    /// subset of another's, and no residual matches 0 or its hidden count,
    /// so tiers 1 and 2 have nothing to say.
    fn hidden_ring_board() -> VisibleBoard {
        let grid = (0..6)
            .map(|row| {
                (0..6)
                    .map(|col| {
                        if row == 0 || row == 5 || col == 0 || col == 5 {
                            H
                        } else if (2..=3).contains(&row) && (2..=3).contains(&col) {
                            Open(0)
                        } else {
                            Open(1)
                        }
                    })
                    .collect()
            })
            .collect();
        snapshot(grid)
    }

    #[test]
    fn oversized_frontier_skips_enumeration() {
        // Spec scenario: a 20-cell frontier with no certain deduction must
        // go straight to the probability fallback.
        let board = hidden_ring_board();
        assert_eq!(frontier_cells(&board).len(), 20);
        assert!(deterministic_move(&board).is_none());
        assert!(subset_move(&board).is_none());
        assert!(exact_frontier_move(&board, MAX_FRONTIER).is_none());

        let mv = compute_next_move(&board).unwrap();
        assert_eq!(mv.kind, MoveKind::Reveal);
        // The corners touch a single five-cell "1" clue, the cheapest guess.
        assert_eq!(mv.at, Point::new(0, 0));
        assert!(matches!(mv.explain, Explanation::Probability { .. }));
    }

    #[test]
    fn probability_map_defaults_and_averages() {
        let board = snapshot(vec![
            vec![H, H, H],
            vec![Open(1), Open(1), Open(1)],
            vec![H, H, H],
        ]);
        let map = probability_map(&board);
        // Every hidden cell in row 0 and row 2 touches at least one clue.
        assert!(map.get(Point::new(0, 0)) > 0.0);
        assert_eq!(map.frontier_size, 6);

        // A board with no clues at all leaves everything at the 0.5 default.
        let blank = snapshot(vec![vec![H; 4]; 4]);
        let blank_map = probability_map(&blank);
        assert_eq!(blank_map.get(Point::new(2, 2)), 0.5);
        assert_eq!(blank_map.frontier_size, 0);
    }

    #[test]
    fn solver_is_silent_when_nothing_is_hidden() {
        let board = snapshot(vec![vec![F, Open(1)], vec![Open(1), Open(1)]]);
        assert_eq!(compute_next_move(&board), None);
    }

    #[test]
    fn same_snapshot_same_move() {
        let board = hidden_ring_board();
        assert_eq!(compute_next_move(&board), compute_next_move(&board));

        let mut game = Board::new(BoardConfig::beginner(), 11);
        game.reveal(Point::new(4, 4));
        let vis = game.visible();
        assert_eq!(compute_next_move(&vis), compute_next_move(&vis));
    }

    #[test]
    fn certain_moves_are_sound_over_real_games() {
        // Play full games and verify no certain-tier reveal ever hits a mine.
        for seed in 0..15 {
            let mut game = Board::new(BoardConfig::beginner(), seed);
            game.reveal(Point::new(4, 4));

            for _ in 0..500 {
                if game.state() != GameState::Playing {
                    break;
                }
                let Some(mv) = compute_next_move(&game.visible()) else {
                    break;
                };
                let certain = mv.explain.is_exact()
                    || matches!(
                        mv.explain,
                        Explanation::ExactFrontier { probability, .. } if probability == 0.0
                    );
                if certain && mv.kind == MoveKind::Reveal {
                    assert!(
                        !game.cell(mv.at).mine,
                        "seed {seed}: certain reveal at {:?} hit a mine",
                        mv.at
                    );
                }
                match mv.kind {
                    MoveKind::Reveal => {
                        game.reveal(mv.at);
                    }
                    MoveKind::Flag => game.toggle_flag(mv.at),
                }
            }
        }
    }

    #[test]
    fn solver_never_targets_revealed_or_flagged_cells() {
        for seed in [3, 8, 21] {
            let mut game = Board::new(BoardConfig::new(8, 8, 12), seed);
            game.reveal(Point::new(4, 4));
            for _ in 0..200 {
                if game.state() != GameState::Playing {
                    break;
                }
                let vis = game.visible();
                let Some(mv) = compute_next_move(&vis) else {
                    break;
                };
                assert!(vis.get(mv.at).is_hidden());
                match mv.kind {
                    MoveKind::Reveal => {
                        assert_ne!(game.reveal(mv.at), RevealOutcome::Ignored);
                    }
                    MoveKind::Flag => game.toggle_flag(mv.at),
                }
            }
        }
    }
}
