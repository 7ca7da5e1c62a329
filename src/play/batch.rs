use std::fs;
use std::path::Path;
use std::time::Instant;

use anyhow::Context;
use colored::Colorize;
use log::{debug, info};
use rayon::prelude::*;

use crate::board::{Board, StartPos};
use crate::general::common::Res;
use crate::search::{solve, verify_solution, Solution, Strategy};

/// The marker line written for a board whose solution didn't fit its step
/// cap (or whose solve failed).
pub const GAME_NOT_WON: &str = "game not won";

/// Reads a dataset: one compact board per line, empty lines ignored.
/// Parse errors carry the 1-based line number.
pub fn read_dataset(path: &Path, start: StartPos, max_steps: Option<u32>) -> Res<Vec<Board>> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Couldn't read '{}'", path.display()))?;
    let mut boards = vec![];
    for (idx, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let board = Board::from_compact_str(line, start, max_steps)
            .with_context(|| format!("Line {0} of '{1}'", idx + 1, path.display()))?;
        boards.push(board);
    }
    Ok(boards)
}

/// Solves every board, in parallel, preserving input order. A failed solve
/// is recorded in place and doesn't abort the rest of the batch.
pub fn solve_boards(
    boards: &[Board],
    strategy: Strategy,
    queue_cutoff: Option<usize>,
) -> Vec<Res<Solution>> {
    boards
        .par_iter()
        .enumerate()
        .map(|(idx, board)| {
            let res = solve(board, strategy, queue_cutoff);
            if let Ok(moves) = &res {
                debug_assert!(verify_solution(board, moves));
                debug!("board {idx}: {} moves", moves.len());
            }
            res
        })
        .collect()
}

#[must_use]
pub fn solution_str(moves: &[crate::board::Color]) -> String {
    moves.iter().map(|c| c.to_char()).collect()
}

/// Writes one line per board: the solution string, or [`GAME_NOT_WON`] when
/// the solution doesn't fit the board's step cap or the solve failed.
pub fn write_solutions(path: &Path, boards: &[Board], results: &[Res<Solution>]) -> Res<()> {
    debug_assert_eq!(boards.len(), results.len());
    let mut out = String::new();
    for (board, result) in boards.iter().zip(results.iter()) {
        match result {
            Ok(moves) if moves.len() <= board.max_steps() as usize => {
                out.push_str(&solution_str(moves));
            }
            _ => out.push_str(GAME_NOT_WON),
        }
        out.push('\n');
    }
    fs::write(path, out).with_context(|| format!("Couldn't write '{}'", path.display()))?;
    Ok(())
}

/// Reads a dataset, solves it, prints totals and optionally writes the
/// solutions file.
pub fn run_batch(
    input: &Path,
    output: Option<&Path>,
    strategy: Strategy,
    start: StartPos,
    max_steps: Option<u32>,
    queue_cutoff: Option<usize>,
    jobs: Option<usize>,
) -> Res<()> {
    let boards = read_dataset(input, start, max_steps)?;
    info!("solving {0} boards from '{1}' with {strategy}", boards.len(), input.display());
    let begin = Instant::now();
    let results = match jobs {
        Some(jobs) => rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .build()?
            .install(|| solve_boards(&boards, strategy, queue_cutoff)),
        None => solve_boards(&boards, strategy, queue_cutoff),
    };
    let elapsed = begin.elapsed();

    let solved = results.iter().filter(|r| r.is_ok()).count();
    let total_moves: usize = results.iter().flatten().map(Vec::len).sum();
    let capped = boards
        .iter()
        .zip(results.iter())
        .filter(|(board, r)| !matches!(r, Ok(moves) if moves.len() <= board.max_steps() as usize))
        .count();
    println!("{}", "----- Batch done ------------".bold());
    println!(
        "+++ Boards: {0} ({1} solved, {2} over their step cap or failed)",
        boards.len().to_string().bright_yellow(),
        solved,
        capped
    );
    if solved > 0 {
        println!(
            "+++ Moves: {0} total, {1:.2} on average",
            total_moves.to_string().bright_yellow(),
            total_moves as f64 / solved as f64
        );
    }
    println!(
        "+++ Time: {0:.3}s ({1:.1}ms per board)",
        elapsed.as_secs_f64(),
        elapsed.as_secs_f64() * 1000.0 / boards.len().max(1) as f64
    );
    for (idx, result) in results.iter().enumerate() {
        if let Err(err) = result {
            println!("{0} board {idx}: {err:#}", "Failed:".red());
        }
    }

    if let Some(output) = output {
        write_solutions(output, &boards, &results)?;
        println!("Solutions written to '{}'", output.display());
    }
    Ok(())
}
