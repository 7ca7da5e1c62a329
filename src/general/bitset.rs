use std::fmt;
use std::fmt::{Debug, Formatter};
use std::iter::FusedIterator;

use derive_more::{BitAnd, BitAndAssign, BitOr, BitOrAssign, BitXor, BitXorAssign};

use crate::general::common::pop_lsb64;

/// A fixed-shape bitmap over the region ids of one board.
///
/// All sets derived from the same board share the same word count, so the
/// binary operations can zip the backing words without bounds juggling.
/// The shape is fixed at construction; there is no growing.
#[derive(Clone, Eq, PartialEq)]
#[must_use]
pub struct NodeSet {
    words: Box<[u64]>,
    bits: u32,
}

impl NodeSet {
    pub fn new(bits: usize) -> Self {
        let num_words = bits.div_ceil(64);
        Self { words: vec![0; num_words].into_boxed_slice(), bits: bits as u32 }
    }

    pub fn single(bits: usize, idx: usize) -> Self {
        let mut res = Self::new(bits);
        res.set(idx);
        res
    }

    /// The size of the universe, not the number of set bits.
    #[inline]
    #[must_use]
    pub fn universe(&self) -> usize {
        self.bits as usize
    }

    #[inline]
    #[must_use]
    pub fn num_words(&self) -> usize {
        self.words.len()
    }

    #[inline]
    #[must_use]
    pub fn words(&self) -> &[u64] {
        &self.words
    }

    #[inline]
    pub fn set(&mut self, idx: usize) {
        debug_assert!(idx < self.bits as usize);
        self.words[idx / 64] |= 1 << (idx % 64);
    }

    #[inline]
    pub fn clear(&mut self, idx: usize) {
        debug_assert!(idx < self.bits as usize);
        self.words[idx / 64] &= !(1 << (idx % 64));
    }

    #[inline]
    #[must_use]
    pub fn get(&self, idx: usize) -> bool {
        debug_assert!(idx < self.bits as usize);
        (self.words[idx / 64] >> (idx % 64)) & 1 != 0
    }

    pub fn clear_all(&mut self) {
        self.words.fill(0);
    }

    /// Complement within the universe; bits past `universe()` stay zero.
    pub fn flip_all(&mut self) {
        for word in self.words.iter_mut() {
            *word = !*word;
        }
        let rem = self.bits as usize % 64;
        if rem != 0 {
            if let Some(last) = self.words.last_mut() {
                *last &= (1 << rem) - 1;
            }
        }
    }

    #[inline]
    #[must_use]
    pub fn count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    #[inline]
    pub fn union_with(&mut self, other: &Self) {
        debug_assert_eq!(self.bits, other.bits);
        for (w, &o) in self.words.iter_mut().zip(other.words.iter()) {
            *w |= o;
        }
    }

    #[inline]
    pub fn intersect_with(&mut self, other: &Self) {
        debug_assert_eq!(self.bits, other.bits);
        for (w, &o) in self.words.iter_mut().zip(other.words.iter()) {
            *w &= o;
        }
    }

    /// Removes every element of `other` from `self`.
    #[inline]
    pub fn subtract(&mut self, other: &Self) {
        debug_assert_eq!(self.bits, other.bits);
        for (w, &o) in self.words.iter_mut().zip(other.words.iter()) {
            *w &= !o;
        }
    }

    #[inline]
    pub fn toggle_with(&mut self, other: &Self) {
        debug_assert_eq!(self.bits, other.bits);
        for (w, &o) in self.words.iter_mut().zip(other.words.iter()) {
            *w ^= o;
        }
    }

    #[inline]
    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        debug_assert_eq!(self.bits, other.bits);
        self.words.iter().zip(other.words.iter()).any(|(&a, &b)| a & b != 0)
    }

    /// Counts the elements both sets have in common without materializing
    /// the intersection.
    #[inline]
    #[must_use]
    pub fn count_common(&self, other: &Self) -> usize {
        debug_assert_eq!(self.bits, other.bits);
        self.words.iter().zip(other.words.iter()).map(|(&a, &b)| (a & b).count_ones() as usize).sum()
    }

    /// The smallest set index `>= from`, if any.
    #[must_use]
    pub fn next_set_bit(&self, from: usize) -> Option<usize> {
        if from >= self.bits as usize {
            return None;
        }
        let mut word_idx = from / 64;
        let mut word = self.words[word_idx] & (u64::MAX << (from % 64));
        loop {
            if word != 0 {
                return Some(word_idx * 64 + word.trailing_zeros() as usize);
            }
            word_idx += 1;
            if word_idx >= self.words.len() {
                return None;
            }
            word = self.words[word_idx];
        }
    }

    /// Iterates over the set indices in ascending order.
    #[inline]
    pub fn ones(&self) -> NodeSetIter<'_> {
        NodeSetIter { words: &self.words, current: self.words.first().copied().unwrap_or(0), word_idx: 0 }
    }

    /// Reuses the existing allocation; both sets must have the same shape.
    #[inline]
    pub fn copy_from(&mut self, other: &Self) {
        debug_assert_eq!(self.bits, other.bits);
        self.words.copy_from_slice(&other.words);
    }

    /// Folds the backing words to a single 64-bit digest by rotate-xor.
    /// Stable across runs; used as the content hash for deduplication.
    #[must_use]
    pub fn content_hash(&self) -> u64 {
        let mut hash = 0;
        for (i, &word) in self.words.iter().enumerate() {
            hash ^= word.rotate_left((i as u32 * 7) & 63);
        }
        hash
    }
}

impl Debug for NodeSet {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "NodeSet({} of {}) ", self.count(), self.bits)?;
        f.debug_set().entries(self.ones()).finish()
    }
}

#[must_use]
pub struct NodeSetIter<'a> {
    words: &'a [u64],
    current: u64,
    word_idx: usize,
}

impl Iterator for NodeSetIter<'_> {
    type Item = usize;

    #[inline]
    fn next(&mut self) -> Option<usize> {
        while self.current == 0 {
            self.word_idx += 1;
            if self.word_idx >= self.words.len() {
                return None;
            }
            self.current = self.words[self.word_idx];
        }
        Some(self.word_idx * 64 + pop_lsb64(&mut self.current) as usize)
    }
}

impl FusedIterator for NodeSetIter<'_> {}

/// A one-word bitmap over color values. Bit `c` is set iff color value `c`
/// is a member; only values below [`crate::general::common::ALPHABET_SIZE`]
/// ever appear.
#[derive(
    Copy, Clone, Eq, PartialEq, Default, BitOr, BitOrAssign, BitAnd, BitAndAssign, BitXor, BitXorAssign,
)]
#[must_use]
pub struct ColorSet(pub u64);

impl ColorSet {
    pub const EMPTY: ColorSet = ColorSet(0);

    pub fn single(bit: u8) -> Self {
        ColorSet(1 << bit)
    }

    #[inline]
    pub fn insert(&mut self, bit: u8) {
        debug_assert!(bit < 64);
        self.0 |= 1 << bit;
    }

    #[inline]
    pub fn remove(&mut self, bit: u8) {
        self.0 &= !(1 << bit);
    }

    #[inline]
    #[must_use]
    pub fn contains(self, bit: u8) -> bool {
        (self.0 >> bit) & 1 != 0
    }

    #[inline]
    #[must_use]
    pub fn count(self) -> usize {
        self.0.count_ones() as usize
    }

    #[inline]
    #[must_use]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Iterates over the set values in ascending order.
    #[inline]
    pub fn ones(self) -> ColorSetIter {
        ColorSetIter(self.0)
    }
}

impl Debug for ColorSet {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.ones()).finish()
    }
}

#[must_use]
pub struct ColorSetIter(u64);

impl Iterator for ColorSetIter {
    type Item = u8;

    #[inline]
    fn next(&mut self) -> Option<u8> {
        if self.0 == 0 {
            return None;
        }
        Some(pop_lsb64(&mut self.0) as u8)
    }
}

impl FusedIterator for ColorSetIter {}
