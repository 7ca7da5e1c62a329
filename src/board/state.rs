use anyhow::bail;

use crate::board::{Board, Color};
use crate::general::bitset::{ColorSet, NodeSet};
use crate::general::common::Res;

/// A playing position: which regions the player owns, which ones border the
/// owned area, and which ones are still out of reach. The three sets always
/// partition the region ids of the board; the position is won exactly when
/// the border is empty.
///
/// A `Position` doesn't know its board. Everything that needs the region
/// graph takes a `&Board` parameter, so positions stay cheap to store and
/// the board is never aliased.
#[derive(Debug, Clone, Eq, PartialEq)]
#[must_use]
pub struct Position {
    filled: NodeSet,
    neighbors: NodeSet,
    unreached: NodeSet,
}

impl Position {
    /// The position before the first move: only the start region is owned.
    pub fn initial(board: &Board) -> Self {
        let start = board.start_node() as usize;
        let filled = NodeSet::single(board.num_nodes(), start);
        let neighbors = board[start].neighbors().clone();
        let mut unreached = filled.clone();
        unreached.union_with(&neighbors);
        unreached.flip_all();
        Self { filled, neighbors, unreached }
    }

    #[inline]
    pub fn filled(&self) -> &NodeSet {
        &self.filled
    }

    #[inline]
    pub fn neighbors(&self) -> &NodeSet {
        &self.neighbors
    }

    #[inline]
    pub fn unreached(&self) -> &NodeSet {
        &self.unreached
    }

    #[inline]
    #[must_use]
    pub fn is_won(&self) -> bool {
        self.neighbors.is_empty()
    }

    /// The colors that currently appear in the border, i.e. the moves that
    /// make progress. Iterates whichever of (border regions, board colors)
    /// is smaller.
    pub fn sensible_moves(&self, board: &Board) -> ColorSet {
        let mut res = ColorSet::default();
        if self.neighbors.count() < board.num_colors() {
            for id in self.neighbors.ones() {
                res.insert(board[id].color().0);
            }
        } else {
            for value in board.colors().ones() {
                if board.nodes_of_color(Color(value)).intersects(&self.neighbors) {
                    res.insert(value);
                }
            }
        }
        res
    }

    /// The total field count of the owned regions.
    #[must_use]
    pub fn filled_fields(&self, board: &Board) -> usize {
        self.filled.ones().map(|id| board[id].num_fields()).sum()
    }

    /// Overwrites this position with another one of the same shape, reusing
    /// the existing allocations.
    #[inline]
    pub fn copy_from(&mut self, other: &Position) {
        self.filled.copy_from(&other.filled);
        self.neighbors.copy_from(&other.neighbors);
        self.unreached.copy_from(&other.unreached);
    }
}

/// A [`Position`] that can apply moves in place, with a scratch set so the
/// hot loops never allocate. Heuristics reset one of these per estimate;
/// the driver uses them to replay move chains.
#[derive(Debug, Clone)]
#[must_use]
pub struct ScratchState {
    pos: Position,
    scratch: NodeSet,
}

impl ScratchState {
    pub fn new(board: &Board) -> Self {
        Self { pos: Position::initial(board), scratch: NodeSet::new(board.num_nodes()) }
    }

    pub fn from_position(pos: &Position) -> Self {
        Self { scratch: NodeSet::new(pos.filled.universe()), pos: pos.clone() }
    }

    /// Resets to the given position, reusing the existing allocations.
    #[inline]
    pub fn copy_from(&mut self, pos: &Position) {
        self.pos.copy_from(pos);
    }

    #[inline]
    pub fn position(&self) -> &Position {
        &self.pos
    }

    #[inline]
    #[must_use]
    pub fn is_won(&self) -> bool {
        self.pos.is_won()
    }

    /// Absorbs whatever is currently in the scratch set (a subset of the
    /// border) and rewires the three sets.
    fn absorb_scratch(&mut self, board: &Board) {
        let Self { pos, scratch } = self;
        pos.filled.union_with(scratch);
        for id in scratch.ones() {
            pos.neighbors.union_with(board[id].neighbors());
        }
        pos.neighbors.subtract(&pos.filled);
        pos.unreached.subtract(&pos.neighbors);
    }

    /// Claims all border regions of the given color. Returns false (and
    /// changes nothing) if the color isn't in the border.
    pub fn make_move(&mut self, board: &Board, color: Color) -> bool {
        self.scratch.copy_from(board.nodes_of_color(color));
        self.scratch.intersect_with(&self.pos.neighbors);
        if self.scratch.is_empty() {
            return false;
        }
        self.absorb_scratch(board);
        true
    }

    /// Claims all border regions of all given colors in one step.
    pub fn make_multi_color_move(&mut self, board: &Board, colors: ColorSet) -> bool {
        self.scratch.clear_all();
        for value in colors.ones() {
            self.scratch.union_with(board.nodes_of_color(Color(value)));
        }
        self.scratch.intersect_with(&self.pos.neighbors);
        if self.scratch.is_empty() {
            return false;
        }
        self.absorb_scratch(board);
        true
    }

    /// Claims the whole border regardless of color. Not a legal game move;
    /// the admissible lower bound is built on it.
    pub fn make_color_blind_move(&mut self, board: &Board) -> bool {
        if self.pos.neighbors.is_empty() {
            return false;
        }
        self.scratch.copy_from(&self.pos.neighbors);
        self.absorb_scratch(board);
        true
    }

    /// Claims the given regions (only those currently in the border count).
    pub fn take_nodes(&mut self, board: &Board, nodes: &NodeSet) -> bool {
        self.scratch.copy_from(nodes);
        self.scratch.intersect_with(&self.pos.neighbors);
        if self.scratch.is_empty() {
            return false;
        }
        self.absorb_scratch(board);
        true
    }
}

/// A position together with the moves that led to it. Immutable; applying a
/// move yields a new `Game`. This is the view handed to callers and the
/// interactive mode, not the one the search allocates per node.
#[derive(Debug, Clone)]
#[must_use]
pub struct Game {
    position: Position,
    moves: Vec<Color>,
    sensible: ColorSet,
}

impl Game {
    pub fn new(board: &Board) -> Self {
        let position = Position::initial(board);
        let sensible = position.sensible_moves(board);
        Self { position, moves: vec![], sensible }
    }

    #[inline]
    pub fn position(&self) -> &Position {
        &self.position
    }

    #[inline]
    #[must_use]
    pub fn moves(&self) -> &[Color] {
        &self.moves
    }

    /// The colors that would make progress from here.
    #[inline]
    pub fn sensible_moves(&self) -> ColorSet {
        self.sensible
    }

    #[inline]
    #[must_use]
    pub fn is_won(&self) -> bool {
        self.position.is_won()
    }

    /// Plays one move. Colors outside [`Self::sensible_moves`] are rejected.
    pub fn make_move(&self, board: &Board, color: Color) -> Res<Game> {
        if !self.sensible.contains(color.0) {
            bail!("Color {color} doesn't appear in the current border, playing it would do nothing");
        }
        let mut state = ScratchState::from_position(&self.position);
        let progressed = state.make_move(board, color);
        debug_assert!(progressed);
        let position = state.pos;
        let sensible = position.sensible_moves(board);
        let mut moves = self.moves.clone();
        moves.push(color);
        Ok(Game { position, moves, sensible })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::StartPos;
    use proptest::prelude::*;

    fn partition_holds(board: &Board, pos: &Position) -> bool {
        let mut all = pos.filled().clone();
        if all.intersects(pos.neighbors()) || all.intersects(pos.unreached()) {
            return false;
        }
        all.union_with(pos.neighbors());
        if all.intersects(pos.unreached()) {
            return false;
        }
        all.union_with(pos.unreached());
        all.count() == board.num_nodes()
    }

    fn border_matches_definition(board: &Board, pos: &Position) -> bool {
        let mut expected = NodeSet::new(board.num_nodes());
        for id in pos.filled().ones() {
            expected.union_with(board[id].neighbors());
        }
        expected.subtract(pos.filled());
        expected == *pos.neighbors()
    }

    #[test]
    fn initial_position() {
        let board = Board::from_compact_str("1221", StartPos::UpperLeft, None).unwrap();
        let pos = Position::initial(&board);
        assert!(partition_holds(&board, &pos));
        assert!(border_matches_definition(&board, &pos));
        assert_eq!(pos.filled().count(), 1);
        assert_eq!(pos.neighbors().count(), 2);
        assert_eq!(pos.unreached().count(), 1);
        assert!(!pos.is_won());
        assert_eq!(pos.sensible_moves(&board).ones().collect::<Vec<_>>(), vec![2]);
    }

    #[test]
    fn moves_until_won() {
        let board = Board::from_compact_str("1221", StartPos::UpperLeft, None).unwrap();
        let mut state = ScratchState::new(&board);
        assert!(!state.make_move(&board, Color(1))); // own color, nothing in the border
        assert!(state.make_move(&board, Color(2)));
        assert!(partition_holds(&board, state.position()));
        assert_eq!(state.position().filled().count(), 3);
        assert!(!state.is_won());
        assert!(state.make_move(&board, Color(1)));
        assert!(state.is_won());
        assert!(state.position().neighbors().is_empty());
        assert!(state.position().unreached().is_empty());
        assert!(state.position().sensible_moves(&board).is_empty());
        // nothing left to take
        assert!(!state.make_move(&board, Color(2)));
        assert!(!state.make_color_blind_move(&board));
    }

    #[test]
    fn non_sensible_move_is_a_noop() {
        let board = Board::from_compact_str("1221133113321111", StartPos::UpperLeft, None).unwrap();
        let mut state = ScratchState::new(&board);
        let before = state.position().clone();
        let sensible = state.position().sensible_moves(&board);
        for value in board.colors().ones() {
            if !sensible.contains(value) {
                assert!(!state.make_move(&board, Color(value)));
                assert_eq!(state.position(), &before);
            }
        }
    }

    #[test]
    fn color_blind_move_takes_whole_border() {
        let board = Board::from_seed("blind", 8, 4, StartPos::UpperLeft).unwrap();
        let mut state = ScratchState::new(&board);
        let border = state.position().neighbors().clone();
        assert!(state.make_color_blind_move(&board));
        let mut expected_filled = border;
        expected_filled.set(board.start_node() as usize);
        assert_eq!(state.position().filled(), &expected_filled);
        assert!(partition_holds(&board, state.position()));
        assert!(border_matches_definition(&board, state.position()));
    }

    #[test]
    fn multi_color_move_equals_sequential_union() {
        let board = Board::from_seed("multi", 10, 5, StartPos::Middle).unwrap();
        let sensible = Position::initial(&board).sensible_moves(&board);
        let mut picked = ColorSet::default();
        for value in sensible.ones().take(2) {
            picked.insert(value);
        }
        let mut multi = ScratchState::new(&board);
        assert!(multi.make_multi_color_move(&board, picked));
        // taking the same colors one at a time claims at least as much
        let mut single = ScratchState::new(&board);
        for value in picked.ones() {
            let _ = single.make_move(&board, Color(value));
        }
        let mut diff = multi.position().filled().clone();
        diff.subtract(single.position().filled());
        assert!(diff.is_empty());
        assert!(partition_holds(&board, multi.position()));
    }

    #[test]
    fn take_nodes_only_claims_border() {
        let board = Board::from_seed("take", 8, 4, StartPos::UpperLeft).unwrap();
        let mut state = ScratchState::new(&board);
        let mut everything = NodeSet::new(board.num_nodes());
        everything.flip_all();
        let border = state.position().neighbors().clone();
        assert!(state.take_nodes(&board, &everything));
        let mut expected = border;
        expected.set(board.start_node() as usize);
        assert_eq!(state.position().filled(), &expected);
    }

    #[test]
    fn game_rejects_useless_moves() {
        let board = Board::from_compact_str("1221", StartPos::UpperLeft, None).unwrap();
        let game = Game::new(&board);
        assert!(game.make_move(&board, Color(1)).is_err());
        assert!(game.make_move(&board, Color(3)).is_err());
        let game = game.make_move(&board, Color(2)).unwrap();
        assert_eq!(game.moves(), &[Color(2)]);
        let game = game.make_move(&board, Color(1)).unwrap();
        assert!(game.is_won());
        assert_eq!(game.moves(), &[Color(2), Color(1)]);
        assert!(game.sensible_moves().is_empty());
    }

    #[test]
    fn filled_fields_counts_cells() {
        let board = Board::from_compact_str("1212", StartPos::UpperLeft, None).unwrap();
        let mut state = ScratchState::new(&board);
        assert_eq!(state.position().filled_fields(&board), 2);
        assert!(state.make_move(&board, Color(2)));
        assert_eq!(state.position().filled_fields(&board), 4);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn random_play_preserves_invariants(seed in 0u32..1000, picks in proptest::collection::vec(0usize..8, 0..30)) {
            let board = Board::from_seed(&format!("game{seed}"), 8, 5, StartPos::UpperLeft).unwrap();
            let mut state = ScratchState::new(&board);
            for pick in picks {
                let sensible = state.position().sensible_moves(&board);
                if sensible.is_empty() {
                    prop_assert!(state.is_won());
                    break;
                }
                // sensible moves are exactly the border colors
                let mut border_colors = ColorSet::default();
                for id in state.position().neighbors().ones() {
                    border_colors.insert(board[id].color().0);
                }
                prop_assert_eq!(sensible, border_colors);

                let choices: Vec<u8> = sensible.ones().collect();
                let color = Color(choices[pick % choices.len()]);
                let filled_before = state.position().filled().count();
                let open_before = state.position().neighbors().count() + state.position().unreached().count();
                let absorbed = state.position().neighbors().count_common(board.nodes_of_color(color));
                prop_assert!(state.make_move(&board, color));
                prop_assert!(partition_holds(&board, state.position()));
                prop_assert!(border_matches_definition(&board, state.position()));
                // each move claims exactly the border regions of its color
                prop_assert_eq!(state.position().filled().count(), filled_before + absorbed);
                let open_after = state.position().neighbors().count() + state.position().unreached().count();
                prop_assert_eq!(open_after, open_before - absorbed);
                prop_assert!(absorbed > 0);
            }
        }
    }
}
