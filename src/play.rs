use std::io::{stdin, stdout, Write};

use colored::Colorize;
use itertools::Itertools;

use crate::board::state::Game;
use crate::board::{Board, Color};
use crate::general::common::Res;
use crate::search::{solve_from, Strategy};

pub mod batch;

/// Plays one game on the terminal. Each prompt expects a single base-35
/// color digit; `q` resigns, `!` asks the solver how it would finish from
/// here. Moves that wouldn't claim anything are rejected. The game is lost
/// when the board's step cap runs out.
pub fn play_interactive(board: &Board) -> Res<()> {
    let mut game = Game::new(board);
    println!("{}", board.render(Some(game.position())));
    while !game.is_won() {
        let played = game.moves().len() as u32;
        if played >= board.max_steps() {
            println!("{} no moves left, the board wasn't flooded", "You lost:".red().bold());
            return Ok(());
        }
        let sensible = game.sensible_moves().ones().map(|value| Color(value).to_char()).join(", ");
        print!(
            "Move {0} of {1}, sensible colors [{2}] (q to give up): ",
            played + 1,
            board.max_steps(),
            sensible.bold()
        );
        stdout().flush()?;
        let mut line = String::new();
        if stdin().read_line(&mut line)? == 0 {
            return Ok(()); // EOF
        }
        let input = line.trim();
        if input.eq_ignore_ascii_case("q") {
            println!("Giving up after {played} moves.");
            return Ok(());
        }
        if input == "!" {
            let moves = solve_from(board, &game, Strategy::InadmissibleFast, None)?;
            let hint: String = moves[game.moves().len()..].iter().map(|c| c.to_char()).collect();
            println!("The solver would continue with {}", hint.bold());
            continue;
        }
        let Some(first) = input.chars().next() else {
            continue;
        };
        let color = match Color::from_char(first) {
            Ok(color) => color,
            Err(err) => {
                println!("{err}");
                continue;
            }
        };
        match game.make_move(board, color) {
            Ok(next) => game = next,
            Err(err) => {
                println!("{err}");
                continue;
            }
        }
        println!("{}", board.render(Some(game.position())));
    }
    println!(
        "{} flooded the board in {1} of {2} allowed moves",
        "You won:".green().bold(),
        game.moves().len(),
        board.max_steps()
    );
    Ok(())
}
