//! Fixed-length field bitset
//!
//! One bit per field ordinal. Used for the dirty and readable states of a
//! record and for field selections passed in by store adapters.

/// Fixed-length bitset over field ordinals
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct FieldBits {
    words: Vec<u64>,
    len: usize,
}

impl FieldBits {
    /// Creates an all-clear bitset of `len` bits
    pub fn new(len: usize) -> Self {
        Self {
            words: vec![0; len.div_ceil(64)],
            len,
        }
    }

    /// Builds a bitset from a boolean slice
    pub fn from_bools(bools: &[bool]) -> Self {
        let mut bits = Self::new(bools.len());
        for (i, _) in bools.iter().enumerate().filter(|(_, b)| **b) {
            bits.set(i);
        }
        bits
    }

    /// Number of bits (not the number of set bits)
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns bit `index`; out-of-range bits read as clear
    pub fn get(&self, index: usize) -> bool {
        if index >= self.len {
            return false;
        }
        self.words[index / 64] & (1u64 << (index % 64)) != 0
    }

    /// Sets bit `index`; out-of-range indices are ignored
    pub fn set(&mut self, index: usize) {
        if index < self.len {
            self.words[index / 64] |= 1u64 << (index % 64);
        }
    }

    /// Clears bit `index`; out-of-range indices are ignored
    pub fn unset(&mut self, index: usize) {
        if index < self.len {
            self.words[index / 64] &= !(1u64 << (index % 64));
        }
    }

    pub fn set_all(&mut self) {
        for i in 0..self.len {
            self.set(i);
        }
    }

    pub fn clear_all(&mut self) {
        self.words.iter_mut().for_each(|w| *w = 0);
    }

    /// Number of set bits
    pub fn count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    pub fn any(&self) -> bool {
        self.words.iter().any(|w| *w != 0)
    }

    /// Indices of set bits in ascending order
    pub fn iter_ones(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.len).filter(move |i| self.get(*i))
    }

    pub fn to_bools(&self) -> Vec<bool> {
        (0..self.len).map(|i| self.get(i)).collect()
    }
}
