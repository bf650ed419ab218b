//! Vertex-to-fragment assignment used when building fragments.

use super::FragmentId;
use crate::Vid;

/// Decides which fragment owns a vertex.
pub trait Partitioner: Send + Sync {
    /// Owning fragment of `gid`. Must be in `0..fnum` of the builder.
    fn fragment_of(&self, gid: Vid) -> FragmentId;
}

impl<F> Partitioner for F
where
    F: Fn(Vid) -> FragmentId + Send + Sync,
{
    fn fragment_of(&self, gid: Vid) -> FragmentId {
        self(gid)
    }
}

/// Modulo assignment: `gid % fnum`.
#[derive(Debug, Clone, Copy)]
pub struct HashPartitioner {
    fnum: u64,
}

impl HashPartitioner {
    /// Creates a partitioner over `fnum` fragments (at least one).
    #[must_use]
    pub fn new(fnum: usize) -> Self {
        Self {
            fnum: (fnum as u64).max(1),
        }
    }
}

impl Partitioner for HashPartitioner {
    // SAFETY: the remainder is below fnum, which came from a usize
    // fragment count and is far below u32::MAX in practice.
    #[allow(clippy::cast_possible_truncation)]
    fn fragment_of(&self, gid: Vid) -> FragmentId {
        (gid % self.fnum) as FragmentId
    }
}
