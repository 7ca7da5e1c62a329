use std::fmt;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use anyhow::anyhow;
use colored::Colorize;
use strum_macros::EnumIter;

use crate::board::state::{Game, Position, ScratchState};
use crate::board::{Board, Color};
use crate::general::common::Res;

pub mod astar;
pub mod cache;
pub mod greedy;
pub mod heuristic;
pub mod pruning;
pub mod seen;

/// A winning (or attempted) move sequence in play order.
pub type Solution = Vec<Color>;

/// The frontier bound used when solving under a memory budget. The default
/// is no bound at all.
pub const MEMORY_BOUNDED_QUEUE_CUTOFF: usize = 1_000_000;

/// The five estimate strategies, a ladder from provably optimal and slow to
/// rough and fast. Only [`Strategy::Admissible`] never overestimates, which
/// is what makes its solutions minimal; the others buy speed by searching
/// less of the space.
#[derive(Copy, Clone, Eq, PartialEq, Debug, EnumIter)]
#[must_use]
pub enum Strategy {
    /// Lower bound via color-blind playout. Optimal solutions.
    Admissible,
    /// Two-color playout estimate, tight but not a bound.
    InadmissibleSlow,
    /// The slow estimate, inflated by 1/13.
    Inadmissible,
    /// A blend of the admissible bound and the greedy playout.
    InadmissibleFast,
    /// The raw greedy playout length.
    InadmissibleFastest,
}

impl Strategy {
    #[must_use]
    pub fn is_admissible(self) -> bool {
        matches!(self, Strategy::Admissible)
    }

    #[must_use]
    pub fn identifier(self) -> &'static str {
        match self {
            Strategy::Admissible => "astar_a",
            Strategy::InadmissibleSlow => "astar_ias",
            Strategy::Inadmissible => "astar_ia",
            Strategy::InadmissibleFast => "astar_iaf",
            Strategy::InadmissibleFastest => "astar_iaff",
        }
    }
}

impl Display for Strategy {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.identifier())
    }
}

impl FromStr for Strategy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Res<Self> {
        match s.trim() {
            "astar_a" => Ok(Strategy::Admissible),
            "astar_ias" => Ok(Strategy::InadmissibleSlow),
            "astar_ia" => Ok(Strategy::Inadmissible),
            "astar_iaf" => Ok(Strategy::InadmissibleFast),
            "astar_iaff" => Ok(Strategy::InadmissibleFastest),
            other => Err(anyhow!(
                "Unknown strategy '{0}', expected one of 'astar_a', 'astar_ias', 'astar_ia', 'astar_iaf', 'astar_iaff'",
                other.red()
            )),
        }
    }
}

/// Searches for a winning move sequence from the board's start position.
/// Always searches unbounded by the board's step cap. With
/// [`Strategy::Admissible`] and no queue cutoff the result has minimum
/// length; any cutoff bounds the frontier at the price of that guarantee.
pub fn solve(board: &Board, strategy: Strategy, queue_cutoff: Option<usize>) -> Res<Solution> {
    let root = Position::initial(board);
    astar::search(board, &root, strategy, queue_cutoff.unwrap_or(usize::MAX))
}

/// Continues a partially played game; the returned sequence includes the
/// already played prefix.
pub fn solve_from(
    board: &Board,
    game: &Game,
    strategy: Strategy,
    queue_cutoff: Option<usize>,
) -> Res<Solution> {
    let tail = astar::search(board, game.position(), strategy, queue_cutoff.unwrap_or(usize::MAX))?;
    let mut moves = game.moves().to_vec();
    moves.extend(tail);
    Ok(moves)
}

/// The plain greedy player, start to finish. Wins on every well-formed
/// board, in at most one move per region.
pub fn greedy_solve(board: &Board) -> Solution {
    greedy::greedy_sequence(board, &Position::initial(board))
}

/// Replays a sequence from the start position: true iff every move makes
/// progress and the final position is won.
#[must_use]
pub fn verify_solution(board: &Board, moves: &[Color]) -> bool {
    let mut state = ScratchState::new(board);
    for &color in moves {
        if !state.make_move(board, color) {
            return false;
        }
    }
    state.is_won()
}
