use crate::general::bitset::NodeSet;

/// Multiplying by this and keeping the top bits spreads consecutive digests
/// over a power-of-two table (Fibonacci hashing: `2^64 / φ`, made odd).
const FIBONACCI_MULTIPLIER: u64 = 0x9E37_79B9_7F4A_7C15;

const INITIAL_CAPACITY: usize = 1 << 12;

/// Value meaning "this slot is empty"; real g-costs start at 1 because the
/// root position is never inserted.
const EMPTY: u16 = 0;

/// An open-addressed map from `filled` bitmaps to the smallest move count
/// they have been reached with.
///
/// Two positions with the same `filled` set are interchangeable for all
/// future play, so the search only ever needs the cheapest way to reach a
/// given bitmap. Keys are stored flattened (`key_words` words per slot) next
/// to 16-bit values; the table grows by doubling at 90% load. Hashing folds
/// the key words by rotate-xor and then Fibonacci-multiplies the digest.
#[derive(Debug)]
#[must_use]
pub struct SeenStates {
    keys: Vec<u64>,
    values: Vec<u16>,
    key_words: usize,
    len: usize,
}

impl SeenStates {
    pub fn new(key_words: usize) -> Self {
        debug_assert!(key_words > 0);
        Self {
            keys: vec![0; INITIAL_CAPACITY * key_words],
            values: vec![EMPTY; INITIAL_CAPACITY],
            key_words,
            len: 0,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[must_use]
    fn capacity(&self) -> usize {
        self.values.len()
    }

    fn index_of(&self, digest: u64) -> usize {
        let shift = 64 - self.capacity().trailing_zeros();
        (digest.wrapping_mul(FIBONACCI_MULTIPLIER) >> shift) as usize
    }

    /// Records `cost` for the given `filled` bitmap if it beats (strictly)
    /// whatever is stored, returning whether it did. `cost` must be in
    /// `1..u16::MAX`; the search fails before ever producing larger g-costs.
    pub fn put_if_less(&mut self, filled: &NodeSet, cost: u16) -> bool {
        debug_assert_eq!(filled.num_words(), self.key_words);
        debug_assert!(cost != EMPTY && cost < u16::MAX);
        if (self.len + 1) * 10 > self.capacity() * 9 {
            self.grow();
        }
        let words = filled.words();
        let mask = self.capacity() - 1;
        let mut idx = self.index_of(filled.content_hash());
        loop {
            if self.values[idx] == EMPTY {
                let at = idx * self.key_words;
                self.keys[at..at + self.key_words].copy_from_slice(words);
                self.values[idx] = cost;
                self.len += 1;
                return true;
            }
            let at = idx * self.key_words;
            if &self.keys[at..at + self.key_words] == words {
                if cost < self.values[idx] {
                    self.values[idx] = cost;
                    return true;
                }
                return false;
            }
            idx = (idx + 1) & mask;
        }
    }

    /// The stored cost for the bitmap, if present. Only used by tests and
    /// assertions; the search itself goes through [`Self::put_if_less`].
    #[must_use]
    pub fn get(&self, filled: &NodeSet) -> Option<u16> {
        let words = filled.words();
        let mask = self.capacity() - 1;
        let mut idx = self.index_of(filled.content_hash());
        loop {
            if self.values[idx] == EMPTY {
                return None;
            }
            let at = idx * self.key_words;
            if &self.keys[at..at + self.key_words] == words {
                return Some(self.values[idx]);
            }
            idx = (idx + 1) & mask;
        }
    }

    fn grow(&mut self) {
        let old_capacity = self.capacity();
        let new_capacity = old_capacity * 2;
        let old_keys = std::mem::replace(&mut self.keys, vec![0; new_capacity * self.key_words]);
        let old_values = std::mem::replace(&mut self.values, vec![EMPTY; new_capacity]);
        let mask = new_capacity - 1;
        for (slot, &value) in old_values.iter().enumerate() {
            if value == EMPTY {
                continue;
            }
            let at = slot * self.key_words;
            let words = &old_keys[at..at + self.key_words];
            let mut digest = 0u64;
            for (i, &word) in words.iter().enumerate() {
                digest ^= word.rotate_left((i as u32 * 7) & 63);
            }
            let mut idx = self.index_of(digest);
            while self.values[idx] != EMPTY {
                idx = (idx + 1) & mask;
            }
            let new_at = idx * self.key_words;
            self.keys[new_at..new_at + self.key_words].copy_from_slice(words);
            self.values[idx] = value;
        }
    }
}
