//! Headless benchmark runner: plays batches of seeded games with the solver
//! and reports win rate and per-game rows.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, ValueEnum};
use flexi_logger::Logger;
use minesweeper_core as ms;

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Difficulty {
    Beginner,
    Intermediate,
    Expert,
}

impl From<Difficulty> for ms::BoardConfig {
    fn from(difficulty: Difficulty) -> Self {
        match difficulty {
            Difficulty::Beginner => ms::BoardConfig::beginner(),
            Difficulty::Intermediate => ms::BoardConfig::intermediate(),
            Difficulty::Expert => ms::BoardConfig::expert(),
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "minesweeper-bench")]
struct Args {
    /// Difficulty preset
    #[arg(long, value_enum, default_value = "beginner")]
    difficulty: Difficulty,

    /// Custom row count (replaces the preset together with --cols and --mines)
    #[arg(long)]
    rows: Option<usize>,

    /// Custom column count
    #[arg(long)]
    cols: Option<usize>,

    /// Custom mine count
    #[arg(long)]
    mines: Option<usize>,

    /// Number of games to simulate
    #[arg(short = 'g', long, default_value_t = 100)]
    games: u32,

    /// First seed; games run over consecutive seeds from here
    #[arg(short, long, default_value_t = 1)]
    seed: u32,

    /// Worker threads (defaults to one per CPU)
    #[arg(long)]
    threads: Option<usize>,

    /// Write per-game rows as CSV to this path
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Print the aggregate summary as JSON instead of plain text
    #[arg(long, default_value_t = false)]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    // Keep the handle alive so logs flush until main returns.
    let _logger = Logger::try_with_env_or_str("info")?.start()?;

    if let Some(threads) = args.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("configuring thread pool")?;
    }

    let config = match (args.rows, args.cols, args.mines) {
        (Some(rows), Some(cols), Some(mines)) => ms::BoardConfig::new(rows, cols, mines),
        (None, None, None) => args.difficulty.into(),
        _ => anyhow::bail!("--rows, --cols and --mines must be given together"),
    };
    let seeds: Vec<u32> = (0..args.games).map(|i| args.seed.wrapping_add(i)).collect();

    log::info!(
        "simulating {} games on {}x{} with {} mines (seeds from {})",
        seeds.len(),
        config.rows,
        config.cols,
        config.mines,
        args.seed
    );
    let results = ms::run_batch(config, &seeds);

    if let Some(path) = &args.csv {
        write_csv(path, &results)?;
        log::info!("wrote {} rows to {}", results.len(), path.display());
    }

    report(&results, args.json)?;
    Ok(())
}

/// Per-game rows, column layout shared with the UI's benchmark export.
fn write_csv(path: &Path, rows: &[ms::SimResult]) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;
    writer.write_record([
        "seed",
        "win",
        "timeMs",
        "moves",
        "exactSteps",
        "frontierMax",
        "visitedNodes",
    ])?;
    for r in rows {
        writer.write_record([
            r.seed.to_string(),
            u8::from(r.won).to_string(),
            r.time_ms.to_string(),
            r.moves.to_string(),
            r.exact_steps.to_string(),
            r.frontier_max.to_string(),
            r.visited_nodes.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn report(results: &[ms::SimResult], json: bool) -> anyhow::Result<()> {
    let games = results.len();
    let wins = results.iter().filter(|r| r.won).count();
    let total_moves: u64 = results.iter().map(|r| r.moves).sum();
    let total_exact: u64 = results.iter().map(|r| r.exact_steps).sum();
    let total_visited: u64 = results.iter().map(|r| r.visited_nodes).sum();
    let total_time_ms: u64 = results.iter().map(|r| r.time_ms).sum();
    let max_frontier = results.iter().map(|r| r.frontier_max).max().unwrap_or(0);

    let win_rate = if games > 0 {
        wins as f64 / games as f64
    } else {
        0.0
    };
    let avg_moves = if games > 0 {
        total_moves as f64 / games as f64
    } else {
        0.0
    };

    if json {
        let summary = serde_json::json!({
            "games": games,
            "wins": wins,
            "winRate": win_rate,
            "avgMoves": avg_moves,
            "exactSteps": total_exact,
            "visitedNodes": total_visited,
            "maxFrontier": max_frontier,
            "totalTimeMs": total_time_ms,
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("games:         {games}");
        println!("wins:          {wins} ({:.1}%)", win_rate * 100.0);
        println!("avg moves:     {avg_moves:.1}");
        println!("exact steps:   {total_exact}");
        println!("visited nodes: {total_visited}");
        println!("max frontier:  {max_frontier}");
        println!("total time:    {total_time_ms} ms");
    }
    Ok(())
}
