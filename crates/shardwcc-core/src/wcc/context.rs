//! Per-fragment computation state.

use std::fmt;

use crate::fragment::{Fragment, Vertex};
use crate::frontier::FrontierPair;
use crate::label_store::LabelStore;
use crate::Vid;

/// Position of a fragment in the evaluation protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Context allocated, labels not yet assigned.
    Uninitialized,
    /// PEval has run.
    Initial,
    /// IncEval has run this many times.
    Incremental(u32),
    /// The scheduler observed global quiescence; labels are final.
    Converged,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Uninitialized => f.write_str("Uninitialized"),
            Phase::Initial => f.write_str("Initial"),
            Phase::Incremental(round) => write!(f, "Incremental({round})"),
            Phase::Converged => f.write_str("Converged"),
        }
    }
}

/// Labels and frontier of one fragment for the life of a computation.
#[derive(Debug)]
pub struct WccContext {
    pub(crate) labels: LabelStore,
    pub(crate) frontier: FrontierPair,
    pub(crate) phase: Phase,
}

impl WccContext {
    /// Allocates one label slot and one frontier bit per local vertex.
    #[must_use]
    pub fn new<F: Fragment>(frag: &F) -> Self {
        let n = frag.vertices_num();
        Self {
            labels: LabelStore::new(n),
            frontier: FrontierPair::new(n),
            phase: Phase::Uninitialized,
        }
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Label store, indexed by local vertex.
    #[must_use]
    pub fn labels(&self) -> &LabelStore {
        &self.labels
    }

    /// Frontier pair. After a round, `curr` holds the vertices that will
    /// propagate in the next one.
    #[must_use]
    pub fn frontier(&self) -> &FrontierPair {
        &self.frontier
    }

    /// Label of one local vertex.
    #[must_use]
    pub fn label_of(&self, v: Vertex) -> Vid {
        self.labels.get(v)
    }

    /// `(gid, label)` for every inner vertex of `frag`.
    pub fn inner_labels<'a, F: Fragment>(
        &'a self,
        frag: &'a F,
    ) -> impl Iterator<Item = (Vid, Vid)> + 'a {
        frag.inner_vertices()
            .iter()
            .map(move |v| (frag.gid(v), self.labels.get(v)))
    }

    /// Marks the computation finished. Called by the scheduler once no
    /// fragment requests another round and no message is in flight.
    ///
    /// Deciding quiescence is the scheduler's job; once it has, the labels
    /// are final and the controller rejects further `peval`/`inc_eval`
    /// calls on this context with [`Error::PhaseOrder`](crate::Error::PhaseOrder).
    pub fn converge(&mut self) {
        self.phase = Phase::Converged;
    }
}
