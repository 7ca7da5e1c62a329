use crate::board::state::{Position, ScratchState};
use crate::board::{Board, Color};
use crate::general::bitset::NodeSet;
use crate::search::greedy::{border_exposure, eliminable_colors, greedy_count};
use crate::search::Strategy;

/// Estimates the number of moves left from a position, per strategy.
///
/// Owns the mutable scratch states the estimates are played out on, so a
/// single `Estimator` can score millions of positions without allocating.
/// The admissible estimate is a true lower bound; the others trade accuracy
/// for speed in both directions and are only used with the relaxed pruner.
#[derive(Debug)]
#[must_use]
pub struct Estimator {
    strategy: Strategy,
    scratch: ScratchState,
    aux: ScratchState,
    new_nodes: NodeSet,
    gained: NodeSet,
    union: NodeSet,
}

impl Estimator {
    pub fn new(board: &Board, strategy: Strategy) -> Self {
        Self {
            strategy,
            scratch: ScratchState::new(board),
            aux: ScratchState::new(board),
            new_nodes: NodeSet::new(board.num_nodes()),
            gained: NodeSet::new(board.num_nodes()),
            union: NodeSet::new(board.num_nodes()),
        }
    }

    /// A nonnegative estimate of the moves still needed; 0 exactly for won
    /// positions. Never overestimates for [`Strategy::Admissible`].
    pub fn estimate(&mut self, board: &Board, pos: &Position) -> u32 {
        match self.strategy {
            Strategy::Admissible => {
                self.scratch.copy_from(pos);
                admissible_bound(board, &mut self.scratch)
            }
            Strategy::InadmissibleSlow => self.slow_estimate(board, pos),
            Strategy::Inadmissible => {
                let slow = self.slow_estimate(board, pos);
                slow + slow / 13
            }
            Strategy::InadmissibleFast => {
                self.scratch.copy_from(pos);
                let lower = admissible_bound(board, &mut self.scratch);
                self.aux.copy_from(pos);
                let greedy = greedy_count(board, &mut self.aux);
                (lower + 2 * greedy) / 3
            }
            Strategy::InadmissibleFastest => {
                self.scratch.copy_from(pos);
                greedy_count(board, &mut self.scratch)
            }
        }
    }

    /// Like the admissible bound, but when nothing can be eliminated it
    /// takes the two most exposing colors in one step instead of the whole
    /// border. Falls back to the admissible bound once half the board is
    /// filled, where the tighter playout no longer pays off.
    fn slow_estimate(&mut self, board: &Board, pos: &Position) -> u32 {
        self.scratch.copy_from(pos);
        if pos.filled_fields(board) * 2 >= board.num_fields() {
            return admissible_bound(board, &mut self.scratch);
        }
        let mut estimate = 0;
        loop {
            if self.scratch.is_won() {
                return estimate;
            }
            let sensible = self.scratch.position().sensible_moves(board);
            let elim = eliminable_colors(board, self.scratch.position(), sensible);
            if !elim.is_empty() {
                estimate += elim.count() as u32;
                let progressed = self.scratch.make_multi_color_move(board, elim);
                debug_assert!(progressed);
                continue;
            }

            let mut best = Color(0);
            let mut second = Color(0);
            let mut best_gain = 0;
            let mut second_gain = 0;
            for value in sensible.ones() {
                let gain = border_exposure(
                    board,
                    self.scratch.position(),
                    Color(value),
                    &mut self.new_nodes,
                    &mut self.gained,
                );
                if best.0 == 0 || gain > best_gain {
                    second = best;
                    second_gain = best_gain;
                    best = Color(value);
                    best_gain = gain;
                } else if second.0 == 0 || gain > second_gain {
                    second = Color(value);
                    second_gain = gain;
                }
            }
            self.union.copy_from(board.nodes_of_color(best));
            if second.0 != 0 {
                self.union.union_with(board.nodes_of_color(second));
            }
            let progressed = self.scratch.take_nodes(board, &self.union);
            debug_assert!(progressed);
            estimate += 1;
        }
    }
}

/// A true lower bound on the remaining moves: eliminations are counted at
/// face value (each removed color costs one move in any play), and every
/// other step takes the entire border at the price of a single move, which
/// no legal move can beat.
fn admissible_bound(board: &Board, state: &mut ScratchState) -> u32 {
    let mut bound = 0;
    loop {
        if state.is_won() {
            return bound;
        }
        let sensible = state.position().sensible_moves(board);
        let elim = eliminable_colors(board, state.position(), sensible);
        if !elim.is_empty() {
            bound += elim.count() as u32;
            let progressed = state.make_multi_color_move(board, elim);
            debug_assert!(progressed);
        } else {
            let progressed = state.make_color_blind_move(board);
            debug_assert!(progressed);
            bound += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::StartPos;
    use strum::IntoEnumIterator;

    fn estimate(board: &Board, pos: &Position, strategy: Strategy) -> u32 {
        Estimator::new(board, strategy).estimate(board, pos)
    }

    #[test]
    fn won_position_estimates_zero() {
        let board = Board::from_compact_str("1221", StartPos::UpperLeft, None).unwrap();
        let mut state = ScratchState::new(&board);
        assert!(state.make_move(&board, Color(2)));
        assert!(state.make_move(&board, Color(1)));
        assert!(state.is_won());
        for strategy in Strategy::iter() {
            assert_eq!(estimate(&board, state.position(), strategy), 0, "{strategy}");
        }
    }

    #[test]
    fn unfinished_position_estimates_positive() {
        let board = Board::from_seed("positive", 10, 6, StartPos::UpperLeft).unwrap();
        let pos = Position::initial(&board);
        for strategy in Strategy::iter() {
            assert!(estimate(&board, &pos, strategy) > 0, "{strategy}");
        }
    }

    #[test]
    fn admissible_bound_on_known_boards() {
        // checkerboard: optimal is 2 and the bound reaches it
        let board = Board::from_compact_str("1221", StartPos::UpperLeft, None).unwrap();
        assert_eq!(estimate(&board, &Position::initial(&board), Strategy::Admissible), 2);
        // three stripes: both remaining colors are eliminated one step at a time
        let board = Board::from_compact_str("123123123", StartPos::UpperLeft, None).unwrap();
        assert_eq!(estimate(&board, &Position::initial(&board), Strategy::Admissible), 2);
    }

    #[test]
    fn admissible_never_exceeds_greedy() {
        for seed in 0..15 {
            let board = Board::from_seed(&format!("bound{seed}"), 10, 6, StartPos::UpperLeft).unwrap();
            let pos = Position::initial(&board);
            let lower = estimate(&board, &pos, Strategy::Admissible);
            let greedy = estimate(&board, &pos, Strategy::InadmissibleFastest);
            assert!(lower <= greedy, "seed {seed}: {lower} > {greedy}");
        }
    }

    #[test]
    fn admissible_is_monotone_along_moves() {
        for seed in 0..10 {
            let board = Board::from_seed(&format!("mono{seed}"), 8, 5, StartPos::UpperLeft).unwrap();
            let mut estimator = Estimator::new(&board, Strategy::Admissible);
            let mut state = ScratchState::new(&board);
            loop {
                let here = estimator.estimate(&board, state.position());
                let sensible = state.position().sensible_moves(&board);
                if sensible.is_empty() {
                    break;
                }
                for value in sensible.ones() {
                    let mut next = ScratchState::from_position(state.position());
                    assert!(next.make_move(&board, Color(value)));
                    let there = estimator.estimate(&board, next.position());
                    assert!(here <= there + 1, "seed {seed}: {here} > 1 + {there}");
                }
                // walk down an arbitrary branch
                let value = sensible.ones().next().unwrap();
                assert!(state.make_move(&board, Color(value)));
            }
        }
    }

    #[test]
    fn fast_estimate_mixes_bound_and_greedy() {
        let board = Board::from_seed("mix", 12, 6, StartPos::UpperLeft).unwrap();
        let pos = Position::initial(&board);
        let lower = estimate(&board, &pos, Strategy::Admissible);
        let greedy = estimate(&board, &pos, Strategy::InadmissibleFastest);
        let fast = estimate(&board, &pos, Strategy::InadmissibleFast);
        assert_eq!(fast, (lower + 2 * greedy) / 3);
        assert!(fast >= lower.min(greedy));
        assert!(fast <= lower.max(greedy));
    }

    #[test]
    fn inflated_estimate_scales_the_slow_one() {
        let board = Board::from_seed("inflate", 12, 6, StartPos::UpperLeft).unwrap();
        let pos = Position::initial(&board);
        let slow = estimate(&board, &pos, Strategy::InadmissibleSlow);
        let inflated = estimate(&board, &pos, Strategy::Inadmissible);
        assert_eq!(inflated, slow + slow / 13);
    }

    #[test]
    fn slow_estimate_falls_back_when_half_filled() {
        let board = Board::from_seed("half", 8, 4, StartPos::UpperLeft).unwrap();
        let mut state = ScratchState::new(&board);
        while state.position().filled_fields(&board) * 2 < board.num_fields() {
            let value = state.position().sensible_moves(&board).ones().next().unwrap();
            assert!(state.make_move(&board, Color(value)));
        }
        let slow = estimate(&board, state.position(), Strategy::InadmissibleSlow);
        let lower = estimate(&board, state.position(), Strategy::Admissible);
        assert_eq!(slow, lower);
    }
}
