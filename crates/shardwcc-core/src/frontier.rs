//! Double-buffered frontier over local vertices.
//!
//! [`DenseVertexSet`] is a fixed-capacity atomic bitset. Inserts from many
//! worker threads are lock-free and idempotent; clears and emptiness checks
//! work a word (64 vertices) at a time. [`FrontierPair`] holds the `curr`
//! set being propagated this round and the `next` set being accumulated,
//! and swaps the two handles between rounds.

// SAFETY: Numeric casts in bitset addressing are intentional:
// - u32 local indices widen to usize word offsets
// - word index * 64 + bit stays below the set capacity, which fits u32
#![allow(clippy::cast_possible_truncation)]

use std::sync::atomic::{AtomicU64, Ordering};

use rayon::prelude::*;

use crate::fragment::{Vertex, VertexRange};

const WORD_BITS: usize = 64;

#[inline]
fn word_of(index: usize) -> usize {
    index / WORD_BITS
}

#[inline]
fn bit_of(index: usize) -> u64 {
    1u64 << (index % WORD_BITS)
}

/// Mask of the bits of word `word` that fall inside `range`.
#[inline]
fn range_mask(word: usize, range: VertexRange) -> u64 {
    let word_begin = word * WORD_BITS;
    let lo = (range.begin() as usize).max(word_begin) - word_begin;
    let hi = (range.end() as usize).min(word_begin + WORD_BITS) - word_begin;
    if lo >= hi {
        return 0;
    }
    let upper = if hi == WORD_BITS {
        u64::MAX
    } else {
        (1u64 << hi) - 1
    };
    upper & !((1u64 << lo) - 1)
}

/// Atomic bitset over local vertex indices `0..capacity`.
#[derive(Debug)]
pub struct DenseVertexSet {
    words: Box<[AtomicU64]>,
    capacity: usize,
}

impl DenseVertexSet {
    /// Creates an empty set able to hold vertices `0..capacity`.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let words = capacity.div_ceil(WORD_BITS);
        Self {
            words: (0..words).map(|_| AtomicU64::new(0)).collect(),
            capacity,
        }
    }

    /// Number of vertices the set can address.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Adds `v`; returns true if it was not already present.
    ///
    /// # Panics
    ///
    /// Panics if `v` is outside `0..capacity`.
    #[inline]
    pub fn insert(&self, v: Vertex) -> bool {
        let i = self.checked(v);
        let bit = bit_of(i);
        self.words[word_of(i)].fetch_or(bit, Ordering::Relaxed) & bit == 0
    }

    /// Returns true if `v` is present.
    ///
    /// # Panics
    ///
    /// Panics if `v` is outside `0..capacity`.
    #[inline]
    #[must_use]
    pub fn exists(&self, v: Vertex) -> bool {
        let i = self.checked(v);
        self.words[word_of(i)].load(Ordering::Relaxed) & bit_of(i) != 0
    }

    /// Removes every vertex.
    pub fn clear(&self) {
        for word in self.words.iter() {
            word.store(0, Ordering::Relaxed);
        }
    }

    /// Removes every vertex, word ranges split across the current rayon pool.
    pub fn par_clear(&self) {
        self.words
            .par_iter()
            .with_min_len(256)
            .for_each(|word| word.store(0, Ordering::Relaxed));
    }

    /// Returns true if no vertex of `range` is present.
    #[must_use]
    pub fn partial_empty(&self, range: VertexRange) -> bool {
        self.word_span(range)
            .all(|w| self.masked_word(w, range) == 0)
    }

    /// Number of vertices of `range` that are present.
    #[must_use]
    pub fn partial_count(&self, range: VertexRange) -> usize {
        self.word_span(range)
            .map(|w| self.masked_word(w, range).count_ones() as usize)
            .sum()
    }

    /// Total number of vertices present.
    #[must_use]
    pub fn count(&self) -> usize {
        self.words
            .iter()
            .map(|w| w.load(Ordering::Relaxed).count_ones() as usize)
            .sum()
    }

    /// Members of `range` in ascending order.
    pub fn iter_range(&self, range: VertexRange) -> impl Iterator<Item = Vertex> + '_ {
        self.word_span(range)
            .flat_map(move |w| WordBits::new(w, self.masked_word(w, range)))
    }

    /// Word indices overlapping `range`.
    pub(crate) fn word_span(&self, range: VertexRange) -> std::ops::Range<usize> {
        let end = (range.end() as usize).min(self.capacity);
        let begin = (range.begin() as usize).min(end);
        if begin == end {
            return 0..0;
        }
        word_of(begin)..word_of(end - 1) + 1
    }

    /// Members of word `w` restricted to `range`.
    pub(crate) fn members_in_word(
        &self,
        w: usize,
        range: VertexRange,
    ) -> impl Iterator<Item = Vertex> {
        WordBits::new(w, self.masked_word(w, range))
    }

    /// Exchanges contents with `other` without copying any word.
    pub fn swap(&mut self, other: &mut Self) {
        std::mem::swap(self, other);
    }

    #[inline]
    fn masked_word(&self, w: usize, range: VertexRange) -> u64 {
        self.words[w].load(Ordering::Relaxed) & range_mask(w, range)
    }

    #[inline]
    fn checked(&self, v: Vertex) -> usize {
        let i = v.index();
        assert!(
            i < self.capacity,
            "vertex {i} out of range for frontier of capacity {}",
            self.capacity
        );
        i
    }
}

/// Iterator over the set bits of one word.
struct WordBits {
    base: usize,
    bits: u64,
}

impl WordBits {
    fn new(word: usize, bits: u64) -> Self {
        Self {
            base: word * WORD_BITS,
            bits,
        }
    }
}

impl Iterator for WordBits {
    type Item = Vertex;

    fn next(&mut self) -> Option<Vertex> {
        if self.bits == 0 {
            return None;
        }
        let offset = self.bits.trailing_zeros() as usize;
        self.bits &= self.bits - 1;
        Some(Vertex::new((self.base + offset) as u32))
    }
}

/// The `curr`/`next` frontier pair.
///
/// Between rounds `curr` holds exactly the vertices that must re-propagate;
/// `next` is cleared before a round's propagation starts and only gains
/// vertices whose label strictly decreased in that round.
#[derive(Debug)]
pub struct FrontierPair {
    curr: DenseVertexSet,
    next: DenseVertexSet,
}

impl FrontierPair {
    /// Creates two empty sets over `capacity` vertices.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            curr: DenseVertexSet::new(capacity),
            next: DenseVertexSet::new(capacity),
        }
    }

    /// Set being propagated this round.
    #[must_use]
    pub fn curr(&self) -> &DenseVertexSet {
        &self.curr
    }

    /// Set collecting vertices for the following round.
    #[must_use]
    pub fn next(&self) -> &DenseVertexSet {
        &self.next
    }

    /// Exchanges `curr` and `next` in O(1).
    pub fn swap(&mut self) {
        self.curr.swap(&mut self.next);
    }
}
