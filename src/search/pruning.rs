use crate::board::state::Position;
use crate::board::{Board, Color};
use crate::general::bitset::{ColorSet, NodeSet};

/// Symmetry-breaking move filters.
///
/// Two sensible moves that merely swap their order reach the same position,
/// so after playing `prev` a follow-up color only needs to be considered if
/// the previous move had a hand in making it available. The relaxed filter
/// keeps exactly those; the strict filter keeps more, enough to never cut
/// off an optimal ordering, and is the only one sound under an admissible
/// estimate. The two are deliberately separate: tightening the strict one
/// with relaxed-filter ideas breaks optimality.
#[derive(Debug)]
#[must_use]
pub struct Pruner {
    prev_filled: NodeSet,
    prev_open: NodeSet,
    border: NodeSet,
}

impl Pruner {
    pub fn new(board: &Board) -> Self {
        Self {
            prev_filled: NodeSet::new(board.num_nodes()),
            prev_open: NodeSet::new(board.num_nodes()),
            border: NodeSet::new(board.num_nodes()),
        }
    }

    /// Is some border region of the candidate color adjacent to an owned
    /// region of the previous color? If so, the previous move (which claimed
    /// exactly those owned regions last) enabled the candidate.
    fn enabled_by_prev(&mut self, board: &Board, pos: &Position, candidate: Color) -> bool {
        self.border.copy_from(board.nodes_of_color(candidate));
        self.border.intersect_with(pos.neighbors());
        self.border.ones().any(|b| board[b].neighbors().intersects(&self.prev_filled))
    }

    fn set_prev(&mut self, board: &Board, pos: &Position, prev: Color) {
        self.prev_filled.copy_from(board.nodes_of_color(prev));
        self.prev_filled.intersect_with(pos.filled());
    }

    /// The aggressive filter: only candidates enabled by the previous move
    /// survive. After an elimination step the filter can come up empty even
    /// though the position isn't dead; everything sensible is allowed then,
    /// which keeps the elimination-first search complete.
    pub fn relaxed(
        &mut self,
        board: &Board,
        pos: &Position,
        sensible: ColorSet,
        prev: Option<Color>,
        after_elimination: bool,
    ) -> ColorSet {
        let Some(prev) = prev else {
            return sensible;
        };
        self.set_prev(board, pos, prev);
        let mut allowed = ColorSet::default();
        for value in sensible.ones() {
            if self.enabled_by_prev(board, pos, Color(value)) {
                allowed.insert(value);
            }
        }
        if allowed.is_empty() && after_elimination {
            return sensible;
        }
        allowed
    }

    /// The order-preserving filter. A candidate not enabled by the previous
    /// move is dropped when the swapped ordering provably reaches the same
    /// position no later: smaller colors could have been played first
    /// outright, and larger ones only stay in if no border region of the
    /// candidate touches a still-unowned region of the previous color
    /// (otherwise the candidate could equally well have waited).
    pub fn strict(
        &mut self,
        board: &Board,
        pos: &Position,
        sensible: ColorSet,
        prev: Option<Color>,
    ) -> ColorSet {
        let Some(prev) = prev else {
            return sensible;
        };
        self.set_prev(board, pos, prev);
        self.prev_open.copy_from(board.nodes_of_color(prev));
        self.prev_open.subtract(pos.filled());
        let mut allowed = ColorSet::default();
        for value in sensible.ones() {
            let candidate = Color(value);
            if self.enabled_by_prev(board, pos, candidate) {
                allowed.insert(value);
                continue;
            }
            if candidate < prev {
                continue;
            }
            // self.border still holds the candidate's border regions
            let waits_on_prev =
                self.border.ones().any(|b| board[b].neighbors().intersects(&self.prev_open));
            if !waits_on_prev {
                allowed.insert(value);
            }
        }
        allowed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::state::ScratchState;
    use crate::board::StartPos;

    fn after_move(board: &Board, color: Color) -> Position {
        let mut state = ScratchState::new(board);
        assert!(state.make_move(board, color));
        state.position().clone()
    }

    #[test]
    fn no_previous_move_allows_everything() {
        let board = Board::from_seed("prune", 10, 6, StartPos::UpperLeft).unwrap();
        let pos = Position::initial(&board);
        let sensible = pos.sensible_moves(&board);
        let mut pruner = Pruner::new(&board);
        assert_eq!(pruner.relaxed(&board, &pos, sensible, None, false), sensible);
        assert_eq!(pruner.strict(&board, &pos, sensible, None), sensible);
    }

    #[test]
    fn filters_only_shrink_the_sensible_set() {
        for seed in 0..10 {
            let board = Board::from_seed(&format!("shrink{seed}"), 10, 6, StartPos::UpperLeft).unwrap();
            let first = Position::initial(&board).sensible_moves(&board).ones().next().unwrap();
            let pos = after_move(&board, Color(first));
            let sensible = pos.sensible_moves(&board);
            let mut pruner = Pruner::new(&board);
            let relaxed = pruner.relaxed(&board, &pos, sensible, Some(Color(first)), false);
            let strict = pruner.strict(&board, &pos, sensible, Some(Color(first)));
            assert_eq!(relaxed & sensible, relaxed);
            assert_eq!(strict & sensible, strict);
            // what the aggressive filter keeps, the careful one keeps too
            assert_eq!(relaxed & strict, relaxed, "seed {seed}");
        }
    }

    #[test]
    fn relaxed_keeps_only_enabled_colors() {
        // ┌1 2 3┐  after taking color 2 the 3-stripe becomes reachable
        // │1 2 3│  through it, while nothing new of color 1 appears
        // └1 2 3┘
        let board = Board::from_compact_str("123123123", StartPos::UpperLeft, None).unwrap();
        let pos = after_move(&board, Color(2));
        let sensible = pos.sensible_moves(&board);
        assert_eq!(sensible.ones().collect::<Vec<_>>(), vec![3]);
        let mut pruner = Pruner::new(&board);
        let relaxed = pruner.relaxed(&board, &pos, sensible, Some(Color(2)), false);
        assert_eq!(relaxed.ones().collect::<Vec<_>>(), vec![3]);
    }

    #[test]
    fn unrelated_color_is_pruned_by_the_relaxed_filter() {
        // ┌1 2 2┐  a color-2 arm to the right, a color-3 arm below; taking
        // │3 1 1│  2 doesn't enable 3, which could just as well have been
        // └3 1 1┘  taken first
        let board = Board::from_compact_str("122311311", StartPos::UpperLeft, None).unwrap();
        let pos = after_move(&board, Color(2));
        let sensible = pos.sensible_moves(&board);
        assert!(sensible.contains(3));
        assert!(sensible.contains(1));
        let mut pruner = Pruner::new(&board);
        let relaxed = pruner.relaxed(&board, &pos, sensible, Some(Color(2)), false);
        assert!(!relaxed.contains(3));
        // the center blob of color 1 borders the just-taken arm
        assert!(relaxed.contains(1));
        // the strict filter keeps 3: it's larger than the previous color
        // and no border region of 3 waits on an unowned 2-region, so the
        // swapped ordering isn't provably no worse
        let strict = pruner.strict(&board, &pos, sensible, Some(Color(2)));
        assert!(strict.contains(3));
        assert!(strict.contains(1));
    }

    #[test]
    fn smaller_colors_are_dropped_by_the_strict_filter() {
        // same arms, color 3 first: the untouched color-2 arm is smaller
        // than the previous move and not enabled by it
        let board = Board::from_compact_str("122311311", StartPos::UpperLeft, None).unwrap();
        let pos = after_move(&board, Color(3));
        let sensible = pos.sensible_moves(&board);
        assert!(sensible.contains(2));
        let mut pruner = Pruner::new(&board);
        let strict = pruner.strict(&board, &pos, sensible, Some(Color(3)));
        assert!(!strict.contains(2));
        assert!(strict.contains(1));
        let relaxed = pruner.relaxed(&board, &pos, sensible, Some(Color(3)), false);
        assert!(!relaxed.contains(2));
    }

    #[test]
    fn empty_relaxed_filter_falls_back_after_elimination() {
        // ┌1 2 4┐  both 2 and 3 are eliminable from the start; afterwards
        // │3 2 4│  the 4-stripe only touches the 2-column, so with 3 as
        // └3 2 4┘  the last played color nothing is enabled
        let board = Board::from_compact_str("124324324", StartPos::UpperLeft, None).unwrap();
        let mut state = ScratchState::new(&board);
        let mut elim = ColorSet::default();
        elim.insert(2);
        elim.insert(3);
        assert!(state.make_multi_color_move(&board, elim));
        let pos = state.position().clone();
        let sensible = pos.sensible_moves(&board);
        assert_eq!(sensible.ones().collect::<Vec<_>>(), vec![4]);
        let mut pruner = Pruner::new(&board);
        let dropped = pruner.relaxed(&board, &pos, sensible, Some(Color(3)), false);
        assert!(dropped.is_empty());
        let kept = pruner.relaxed(&board, &pos, sensible, Some(Color(3)), true);
        assert_eq!(kept, sensible);
    }
}
