//! Per-vertex component labels.
//!
//! One atomic slot per local vertex (inner and outer). Slots only ever
//! decrease after initialisation, so a single `fetch_min` per offer is
//! enough to keep every slot at the minimum of all candidates it has seen,
//! whatever the interleaving. Relaxed ordering suffices: each slot is
//! linearizable on its own and round boundaries are fork-join points.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::fragment::Vertex;
use crate::Vid;

/// Arena of atomic label slots indexed by dense local vertex index.
///
/// # Panics
///
/// Every accessor panics on an index outside `0..len()`. Indices come from
/// the fragment, so an out-of-range index is a storage bug and must not be
/// swallowed.
#[derive(Debug)]
pub struct LabelStore {
    slots: Box<[AtomicU64]>,
}

impl LabelStore {
    /// Creates `len` slots, all holding `Vid::MAX` until initialised.
    #[must_use]
    pub fn new(len: usize) -> Self {
        Self {
            slots: (0..len).map(|_| AtomicU64::new(Vid::MAX)).collect(),
        }
    }

    /// Number of slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns true if the store has no slot.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Current label of `v`.
    #[inline]
    #[must_use]
    pub fn get(&self, v: Vertex) -> Vid {
        self.slots[v.index()].load(Ordering::Relaxed)
    }

    /// Unconditionally stores `label`. Initialisation only.
    #[inline]
    pub fn set(&self, v: Vertex, label: Vid) {
        self.slots[v.index()].store(label, Ordering::Relaxed);
    }

    /// Lowers the label of `v` to `candidate` if it is strictly smaller.
    ///
    /// Returns true iff this call changed the slot. Concurrent callers on the
    /// same slot may each observe a change as successive smaller offers land;
    /// an equal or larger candidate never does.
    #[inline]
    pub fn try_set_min(&self, v: Vertex, candidate: Vid) -> bool {
        self.slots[v.index()].fetch_min(candidate, Ordering::Relaxed) > candidate
    }

    /// Copies every label, by local index.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Vid> {
        self.slots
            .iter()
            .map(|slot| slot.load(Ordering::Relaxed))
            .collect()
    }
}
