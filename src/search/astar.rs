use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::mem::size_of;

use anyhow::bail;
use log::debug;
use static_assertions::const_assert_eq;

use crate::board::state::{Position, ScratchState};
use crate::board::{Board, Color};
use crate::general::common::Res;
use crate::general::move_chain::{MoveChain, NO_PREV};
use crate::search::cache::{StateCache, DEFAULT_CACHE_SLOTS};
use crate::search::greedy::{eliminable_colors, greedy_count, greedy_sequence};
use crate::search::heuristic::Estimator;
use crate::search::pruning::Pruner;
use crate::search::seen::SeenStates;
use crate::search::Strategy;

/// One frontier entry. The position itself lives in the ring cache (or is
/// replayed from the move chain after eviction), so a node is a handful of
/// bytes no matter how large the board is.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
struct Node {
    /// f-cost: moves played plus the estimate for the rest.
    priority: u16,
    /// g-cost.
    moves_played: u16,
    /// Last entry of this node's move sequence in the chain store.
    chain_end: i32,
    /// Ring cache index of the position snapshot.
    cache_index: u64,
    /// Set on the single successor produced by the elimination preference;
    /// unlocks the relaxed pruner's fallback exactly once.
    after_elimination: bool,
}

const_assert_eq!(size_of::<Node>(), 24);

impl Ord for Node {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap: order by f ascending, prefer deeper
        // nodes on ties, then arbitrary-but-total fields for determinism
        other
            .priority
            .cmp(&self.priority)
            .then_with(|| self.moves_played.cmp(&other.moves_played))
            .then_with(|| other.chain_end.cmp(&self.chain_end))
            .then_with(|| other.cache_index.cmp(&self.cache_index))
    }
}

impl PartialOrd for Node {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Best-first search over positions, ordered by moves played plus the
/// strategy's estimate. See [`crate::search::solve`] for the entry point.
pub(crate) fn search(
    board: &Board,
    root: &Position,
    strategy: Strategy,
    queue_cutoff: usize,
) -> Res<Vec<Color>> {
    if root.is_won() {
        return Ok(vec![]);
    }
    AStarSearch {
        board,
        strategy,
        queue_cutoff,
        frontier: BinaryHeap::new(),
        chain: MoveChain::new(),
        cache: StateCache::new(DEFAULT_CACHE_SLOTS),
        seen: SeenStates::new(root.filled().num_words()),
        estimator: Estimator::new(board, strategy),
        pruner: Pruner::new(board),
        current: ScratchState::from_position(root),
        successor: ScratchState::from_position(root),
        root: root.clone(),
        expanded: 0,
        fallback: None,
    }
    .run()
}

struct AStarSearch<'a> {
    board: &'a Board,
    strategy: Strategy,
    queue_cutoff: usize,
    root: Position,
    frontier: BinaryHeap<Node>,
    chain: MoveChain,
    cache: StateCache,
    seen: SeenStates,
    estimator: Estimator,
    pruner: Pruner,
    /// The resolved position of the node being expanded.
    current: ScratchState,
    /// Workspace for the successor being generated.
    successor: ScratchState,
    expanded: u64,
    /// Best full winning sequence remembered while compacting the frontier.
    /// Compaction discards states for good, so in the (degenerate, tiny
    /// cutoff) case where the remaining frontier runs dry this still backs
    /// a winning answer.
    fallback: Option<(u32, Vec<Color>)>,
}

impl AStarSearch<'_> {
    fn run(&mut self) -> Res<Vec<Color>> {
        let sensible = self.root.sensible_moves(self.board);
        for value in sensible.ones() {
            let color = Color(value);
            self.successor.copy_from(&self.root);
            let progressed = self.successor.make_move(self.board, color);
            debug_assert!(progressed);
            let recorded = self.seen.put_if_less(self.successor.position().filled(), 1);
            debug_assert!(recorded);
            let chain_end = self.chain.add(NO_PREV, color);
            self.push_node(chain_end, 1, false)?;
        }

        while let Some(node) = self.frontier.pop() {
            self.resolve(&node)?;
            self.expanded += 1;

            if self.current.is_won() {
                debug!(
                    "won with {0} moves after expanding {1} nodes ({2} distinct positions, {3} chain entries)",
                    node.moves_played,
                    self.expanded,
                    self.seen.len(),
                    self.chain.len()
                );
                return Ok(self.chain.collect(node.chain_end));
            }

            let sensible = self.current.position().sensible_moves(self.board);

            if !self.strategy.is_admissible() {
                // Wiping colors off the board never hurts and shrinks the
                // branching factor, so such a multi-step is taken eagerly
                // and is the only successor of this node.
                let elim = eliminable_colors(self.board, self.current.position(), sensible);
                if !elim.is_empty() {
                    let mut chain_end = node.chain_end;
                    for value in elim.ones() {
                        chain_end = self.chain.add(chain_end, Color(value));
                    }
                    let g = self.bumped_cost(node.moves_played, elim.count() as u32)?;
                    self.successor.copy_from(self.current.position());
                    let progressed = self.successor.make_multi_color_move(self.board, elim);
                    debug_assert!(progressed);
                    // recorded for deduplication, but pushed unconditionally:
                    // dropping the step would lose its pruner relaxation
                    let _ = self.seen.put_if_less(self.successor.position().filled(), g);
                    self.push_node(chain_end, g, true)?;
                    continue;
                }
            }

            let prev = self.chain.last_color(node.chain_end);
            let allowed = if self.strategy.is_admissible() {
                self.pruner.strict(self.board, self.current.position(), sensible, prev)
            } else {
                self.pruner.relaxed(
                    self.board,
                    self.current.position(),
                    sensible,
                    prev,
                    node.after_elimination,
                )
            };

            for value in allowed.ones() {
                let color = Color(value);
                self.successor.copy_from(self.current.position());
                let progressed = self.successor.make_move(self.board, color);
                debug_assert!(progressed);
                let g = self.bumped_cost(node.moves_played, 1)?;
                if self.seen.put_if_less(self.successor.position().filled(), g) {
                    let chain_end = self.chain.add(node.chain_end, color);
                    self.push_node(chain_end, g, false)?;
                }
            }

            if self.frontier.len() > self.queue_cutoff {
                self.compact()?;
            }
        }
        if let Some((score, moves)) = self.fallback.take() {
            debug!("frontier ran dry after compaction, using the remembered {score}-move playout");
            return Ok(moves);
        }
        bail!(
            "The search exhausted all candidate positions without finding a winning sequence; \
             this can't happen on a well-formed board"
        )
    }

    fn bumped_cost(&self, cost: u16, bump: u32) -> Res<u16> {
        let bumped = cost as u32 + bump;
        if bumped >= u16::MAX as u32 {
            bail!("Move counts beyond {} aren't representable", u16::MAX - 1);
        }
        Ok(bumped as u16)
    }

    /// Pushes a node for the position currently held in `self.successor`.
    fn push_node(&mut self, chain_end: i32, g: u16, after_elimination: bool) -> Res<()> {
        let estimate = self.estimator.estimate(self.board, self.successor.position());
        let priority = self.bumped_cost(g, estimate)?;
        let cache_index = self.cache.add(self.successor.position());
        self.frontier.push(Node { priority, moves_played: g, chain_end, cache_index, after_elimination });
        Ok(())
    }

    /// Loads the node's position into `self.current`, replaying its move
    /// chain if the cached snapshot has been evicted.
    fn resolve(&mut self, node: &Node) -> Res<()> {
        if let Some(pos) = self.cache.get(node.cache_index) {
            self.current.copy_from(pos);
            return Ok(());
        }
        self.current.copy_from(&self.root);
        let moves = self.chain.collect(node.chain_end);
        debug_assert_eq!(moves.len(), node.moves_played as usize);
        for color in moves {
            if !self.current.make_move(self.board, color) {
                bail!("Couldn't replay the move chain: color {color} makes no progress");
            }
        }
        Ok(())
    }

    /// Scores every frontier node with the cheap greedy playout and keeps
    /// the better half. This is the one operation that can cost solution
    /// quality, in exchange for bounding the frontier's memory.
    fn compact(&mut self) -> Res<()> {
        let nodes = std::mem::take(&mut self.frontier).into_vec();
        let before = nodes.len();
        let mut scored = Vec::with_capacity(nodes.len());
        for node in nodes {
            self.resolve(&node)?;
            let score = node.moves_played as u32 + greedy_count(self.board, &mut self.current);
            scored.push((score, node));
        }
        scored.sort_by_key(|&(score, _)| score);

        // the best playout just measured is a complete winning sequence;
        // remember it in case the surviving nodes all dead-end
        if let Some(&(score, ref node)) = scored.first() {
            if self.fallback.as_ref().map_or(true, |(stored, _)| score < *stored) {
                let node = *node;
                self.resolve(&node)?;
                let mut moves = self.chain.collect(node.chain_end);
                moves.extend(greedy_sequence(self.board, self.current.position()));
                self.fallback = Some((score, moves));
            }
        }

        scored.truncate((scored.len() / 2).max(1));
        self.frontier = scored.into_iter().map(|(_, node)| node).collect();
        debug!("compacted the frontier from {before} to {0} nodes", self.frontier.len());
        Ok(())
    }
}
