use crate::board::Color;

/// Sentinel for "this entry has no predecessor".
pub const NO_PREV: i32 = -1;

/// A store for move sequences that share prefixes.
///
/// Every entry records the color played and the index of the previous entry,
/// so a full sequence is a backward walk from its last entry. Appending is
/// O(1) and a sequence handle is just the index of its last entry, which
/// keeps the per-search-node footprint at one `i32` no matter how deep the
/// search gets.
#[derive(Debug, Default)]
#[must_use]
pub struct MoveChain {
    prev: Vec<i32>,
    color: Vec<u8>,
}

impl MoveChain {
    pub fn new() -> Self {
        Self::with_capacity(1 << 12)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self { prev: Vec::with_capacity(capacity), color: Vec::with_capacity(capacity) }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.prev.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.prev.is_empty()
    }

    /// Appends an entry and returns its index. `prev` must be [`NO_PREV`]
    /// or the index of an existing entry.
    pub fn add(&mut self, prev: i32, color: Color) -> i32 {
        debug_assert!(prev == NO_PREV || (prev as usize) < self.prev.len());
        let idx = self.prev.len() as i32;
        self.prev.push(prev);
        self.color.push(color.0);
        idx
    }

    /// The color of the given entry.
    #[must_use]
    pub fn color_at(&self, idx: i32) -> Color {
        Color(self.color[idx as usize])
    }

    /// The last color of the sequence ending at `end`, if the sequence is
    /// non-empty.
    #[must_use]
    pub fn last_color(&self, end: i32) -> Option<Color> {
        if end == NO_PREV { None } else { Some(self.color_at(end)) }
    }

    /// Walks the chain backward from `end` and returns the sequence in play
    /// order.
    #[must_use]
    pub fn collect(&self, end: i32) -> Vec<Color> {
        let mut res = vec![];
        let mut idx = end;
        while idx != NO_PREV {
            res.push(Color(self.color[idx as usize]));
            idx = self.prev[idx as usize];
        }
        res.reverse();
        res
    }
}
