//! [`floodit`](crate) is a Flood-It game engine. It reduces a colored grid
//! to a graph of uniform-color regions and searches that graph for short
//! flooding sequences with A* under a ladder of heuristic strategies, from
//! provably optimal to greedy-fast.
//!
//! This project is grouped in 4 broad modules:
//! - The board representation (region graph, positions, textual formats)
//! - The search (strategies, the A* driver and its supporting structures)
//! - The `play` layer (interactive play, dataset batch solving)
//! - Low-level substrate under `general` (bitsets, the move chain store)

use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Instant;

use clap::{Parser, ValueEnum};
use colored::Colorize;

use crate::board::{Board, StartPos};
use crate::general::common::Res;
use crate::play::batch::{run_batch, solution_str};
use crate::search::{greedy_solve, solve, verify_solution, Solution, Strategy, MEMORY_BOUNDED_QUEUE_CUTOFF};

pub mod board;

pub mod general;

pub mod play;

pub mod search;

/// A Flood-It solver and game.
#[derive(Parser, Debug)]
#[command(name = "floodit", author = "ToTheAnd", version, about, long_about = None)]
pub struct CommandLineArgs {
    #[arg(value_enum, default_value_t = Mode::Solve)]
    mode: Mode,
    /// A compact board string (size² base-35 digits). Takes precedence over
    /// the seed.
    #[arg(long)]
    board: Option<String>,
    /// Seed for deterministic board generation.
    #[arg(long, default_value = "floodit")]
    seed: String,
    #[arg(long, default_value_t = 14)]
    size: usize,
    #[arg(long, default_value_t = 6)]
    colors: usize,
    /// Start position: ul, ur, ll, lr or m.
    #[arg(long, default_value = "ul")]
    start: String,
    /// astar_a, astar_ias, astar_ia, astar_iaf, astar_iaff or greedy.
    #[arg(long, default_value = "astar_iaf")]
    strategy: String,
    /// Overrides the default step cap of 0.3 * size * colors.
    #[arg(long)]
    max_steps: Option<u32>,
    /// Bounds the search frontier; halves it greedily when exceeded.
    #[arg(long)]
    queue_cutoff: Option<usize>,
    /// Shorthand for --queue-cutoff 1000000.
    #[arg(long)]
    memory_bounded: bool,
    /// Dataset file for batch mode, one compact board per line.
    #[arg(long)]
    input: Option<PathBuf>,
    /// Where batch mode writes one solution per line.
    #[arg(long)]
    output: Option<PathBuf>,
    /// Number of boards in bench mode.
    #[arg(long, default_value_t = 10)]
    count: usize,
    /// Worker threads for batch mode; defaults to all cores.
    #[arg(long)]
    jobs: Option<usize>,
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, ValueEnum, Default, Debug)]
pub enum Mode {
    /// Solve a single board and print the move sequence.
    #[default]
    Solve,
    /// Play a board interactively on the terminal.
    Play,
    /// Solve a dataset file, reporting totals.
    Batch,
    /// Solve a series of generated boards and report timings.
    Bench,
}

impl Display for Mode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Solve => write!(f, "solve"),
            Mode::Play => write!(f, "play"),
            Mode::Batch => write!(f, "batch"),
            Mode::Bench => write!(f, "bench"),
        }
    }
}

/// What solves the board: one of the A* strategies, or the plain greedy
/// player.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
enum Player {
    Greedy,
    AStar(Strategy),
}

impl Player {
    fn parse(name: &str) -> Res<Player> {
        if name.trim() == "greedy" {
            return Ok(Player::Greedy);
        }
        Ok(Player::AStar(Strategy::from_str(name)?))
    }

    fn solve(self, board: &Board, queue_cutoff: Option<usize>) -> Res<Solution> {
        match self {
            Player::Greedy => Ok(greedy_solve(board)),
            Player::AStar(strategy) => solve(board, strategy, queue_cutoff),
        }
    }
}

fn board_from_args(args: &CommandLineArgs, start: StartPos, seed_suffix: &str) -> Res<Board> {
    match &args.board {
        Some(compact) => Board::from_compact_str(compact, start, args.max_steps),
        None => {
            let seed = format!("{}{}", args.seed, seed_suffix);
            Board::from_seed(&seed, args.size, args.colors, start)
        }
    }
}

fn solve_single(args: &CommandLineArgs, start: StartPos, queue_cutoff: Option<usize>) -> Res<()> {
    let board = board_from_args(args, start, "")?;
    let player = Player::parse(&args.strategy)?;
    println!("{board}");
    let begin = Instant::now();
    let moves = player.solve(&board, queue_cutoff)?;
    let elapsed = begin.elapsed();
    debug_assert!(verify_solution(&board, &moves));
    println!(
        "Solved with {0} moves in {1:.3}s: {2}",
        moves.len().to_string().bright_yellow(),
        elapsed.as_secs_f64(),
        solution_str(&moves).bold()
    );
    if moves.len() as u32 > board.max_steps() {
        println!("(the step cap of {} would not allow this in a real game)", board.max_steps());
    }
    Ok(())
}

fn run_bench(args: &CommandLineArgs, start: StartPos, queue_cutoff: Option<usize>) -> Res<()> {
    let player = Player::parse(&args.strategy)?;
    println!("Benchmarking '{0}' on {1} boards of size {2}", args.strategy, args.count, args.size);
    let mut total_moves = 0;
    let mut total_time = 0.0;
    let mut worst: Option<(f64, String, usize)> = None;
    for i in 0..args.count {
        let board = board_from_args(args, start, &format!("-{i}"))?;
        let begin = Instant::now();
        let moves = player.solve(&board, queue_cutoff)?;
        let elapsed = begin.elapsed().as_secs_f64();
        debug_assert!(verify_solution(&board, &moves));
        total_moves += moves.len();
        total_time += elapsed;
        if worst.as_ref().map_or(true, |(t, _, _)| elapsed > *t) {
            worst = Some((elapsed, board.compact_str(), moves.len()));
        }
    }
    println!("{}", "----- Benchmark done ------------".bold());
    println!(
        "+++ Time: {0:.3}s total, {1:.1}ms on average",
        total_time,
        total_time * 1000.0 / args.count.max(1) as f64
    );
    println!(
        "+++ Moves: {0} total, {1:.2} on average",
        total_moves.to_string().bright_yellow(),
        total_moves as f64 / args.count.max(1) as f64
    );
    if let Some((time, compact, moves)) = worst {
        println!("Slowest board took {time:.3}s for {moves} moves:");
        println!("{compact}");
    }
    Ok(())
}

pub fn run_program() -> Res<()> {
    env_logger::init();
    let args = CommandLineArgs::parse();
    run_with_args(args)
}

pub fn run_with_args(args: CommandLineArgs) -> Res<()> {
    let start = StartPos::from_str(&args.start)?;
    let queue_cutoff = match (args.queue_cutoff, args.memory_bounded) {
        (Some(cutoff), _) => Some(cutoff),
        (None, true) => Some(MEMORY_BOUNDED_QUEUE_CUTOFF),
        (None, false) => None,
    };
    match args.mode {
        Mode::Solve => solve_single(&args, start, queue_cutoff),
        Mode::Play => {
            let board = board_from_args(&args, start, "")?;
            play::play_interactive(&board)
        }
        Mode::Batch => {
            let Some(input) = &args.input else {
                anyhow::bail!("Batch mode needs an --input dataset file");
            };
            let strategy = Strategy::from_str(&args.strategy)?;
            run_batch(
                input,
                args.output.as_deref(),
                strategy,
                start,
                args.max_steps,
                queue_cutoff,
                args.jobs,
            )
        }
        Mode::Bench => run_bench(&args, start, queue_cutoff),
    }
}
