use crate::board::state::{Position, ScratchState};
use crate::board::{Board, Color};
use crate::general::bitset::{ColorSet, NodeSet};

/// The field count of the regions a move would newly expose: the unreached
/// regions bordering the border regions of `color`. The two set buffers are
/// caller-provided so repeated scoring doesn't allocate.
pub(crate) fn border_exposure(
    board: &Board,
    pos: &Position,
    color: Color,
    new_nodes: &mut NodeSet,
    gained: &mut NodeSet,
) -> usize {
    new_nodes.copy_from(board.nodes_of_color(color));
    new_nodes.intersect_with(pos.neighbors());
    gained.clear_all();
    for id in new_nodes.ones() {
        gained.union_with(board[id].neighbors());
    }
    gained.intersect_with(pos.unreached());
    gained.ones().map(|id| board[id].num_fields()).sum()
}

/// The colors of the border that can be wiped off the board in a single
/// move, i.e. sensible colors with no region left in the unreached set.
pub(crate) fn eliminable_colors(board: &Board, pos: &Position, sensible: ColorSet) -> ColorSet {
    let mut res = ColorSet::default();
    for value in sensible.ones() {
        if !board.nodes_of_color(Color(value)).intersects(pos.unreached()) {
            res.insert(value);
        }
    }
    res
}

/// Plays the position to the end greedily and returns the number of moves.
/// Whenever colors can be eliminated outright they are, all at once;
/// otherwise the move exposing the largest field count wins, lowest color
/// value on ties. Each applied color counts as one move.
fn run<F: FnMut(Color)>(board: &Board, state: &mut ScratchState, mut on_move: F) -> u32 {
    let mut new_nodes = NodeSet::new(board.num_nodes());
    let mut gained = NodeSet::new(board.num_nodes());
    let mut count = 0;
    loop {
        if state.is_won() {
            return count;
        }
        let sensible = state.position().sensible_moves(board);
        debug_assert!(!sensible.is_empty());

        let elim = eliminable_colors(board, state.position(), sensible);
        if !elim.is_empty() {
            for value in elim.ones() {
                on_move(Color(value));
            }
            count += elim.count() as u32;
            let progressed = state.make_multi_color_move(board, elim);
            debug_assert!(progressed);
            continue;
        }

        let mut best = Color(0);
        let mut best_gain = 0;
        for value in sensible.ones() {
            let gain = border_exposure(board, state.position(), Color(value), &mut new_nodes, &mut gained);
            if best.0 == 0 || gain > best_gain {
                best = Color(value);
                best_gain = gain;
            }
        }
        on_move(best);
        count += 1;
        let progressed = state.make_move(board, best);
        debug_assert!(progressed);
    }
}

/// Greedy move count from the given state; the state is played to the end.
/// Never less than the true remaining distance.
pub(crate) fn greedy_count(board: &Board, state: &mut ScratchState) -> u32 {
    run(board, state, |_| {})
}

/// The full greedy playout from a position, as a move sequence.
#[must_use]
pub fn greedy_sequence(board: &Board, pos: &Position) -> Vec<Color> {
    let mut moves = vec![];
    let mut state = ScratchState::from_position(pos);
    let _ = run(board, &mut state, |c| moves.push(c));
    moves
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::StartPos;

    fn replay_wins(board: &Board, moves: &[Color]) -> bool {
        let mut state = ScratchState::new(board);
        for &c in moves {
            if !state.make_move(board, c) {
                return false;
            }
        }
        state.is_won()
    }

    #[test]
    fn checkerboard_takes_two_moves() {
        let board = Board::from_compact_str("1221", StartPos::UpperLeft, None).unwrap();
        let moves = greedy_sequence(&board, &Position::initial(&board));
        assert_eq!(moves, vec![Color(2), Color(1)]);
        assert!(replay_wins(&board, &moves));
    }

    #[test]
    fn dominoes_take_one_move() {
        let board = Board::from_compact_str("1212", StartPos::UpperLeft, None).unwrap();
        let moves = greedy_sequence(&board, &Position::initial(&board));
        assert_eq!(moves, vec![Color(2)]);
        assert!(replay_wins(&board, &moves));
    }

    #[test]
    fn always_wins_within_region_count() {
        for seed in 0..20 {
            let board = Board::from_seed(&format!("greedy{seed}"), 12, 6, StartPos::UpperLeft).unwrap();
            let moves = greedy_sequence(&board, &Position::initial(&board));
            assert!(replay_wins(&board, &moves), "seed {seed}");
            assert!(moves.len() <= board.num_nodes(), "seed {seed}");
        }
    }

    #[test]
    fn count_matches_sequence_length() {
        let board = Board::from_seed("count", 10, 5, StartPos::Middle).unwrap();
        let pos = Position::initial(&board);
        let moves = greedy_sequence(&board, &pos);
        let mut state = ScratchState::from_position(&pos);
        assert_eq!(greedy_count(&board, &mut state) as usize, moves.len());
        assert!(state.is_won());
    }

    #[test]
    fn elimination_is_preferred() {
        // the lone 2 in the far corner keeps color 2 from being eliminable,
        // while color 3 can be wiped immediately
        let board = Board::from_compact_str("1311221111111112", StartPos::UpperLeft, None).unwrap();
        let pos = Position::initial(&board);
        let sensible = pos.sensible_moves(&board);
        assert_eq!(sensible.ones().collect::<Vec<_>>(), vec![2, 3]);
        let elim = eliminable_colors(&board, &pos, sensible);
        assert_eq!(elim.ones().collect::<Vec<_>>(), vec![3]);
        let moves = greedy_sequence(&board, &pos);
        assert_eq!(moves, vec![Color(3), Color(1), Color(2)]);
        assert!(replay_wins(&board, &moves));
    }

    #[test]
    fn exposure_counts_unreached_fields() {
        let board = Board::from_compact_str("123123123", StartPos::UpperLeft, None).unwrap();
        let pos = Position::initial(&board);
        let mut a = NodeSet::new(board.num_nodes());
        let mut b = NodeSet::new(board.num_nodes());
        // taking the middle stripe exposes the right stripe (3 fields)
        assert_eq!(border_exposure(&board, &pos, Color(2), &mut a, &mut b), 3);
        // color 3 isn't in the border, so it exposes nothing
        assert_eq!(border_exposure(&board, &pos, Color(3), &mut a, &mut b), 0);
    }
}
