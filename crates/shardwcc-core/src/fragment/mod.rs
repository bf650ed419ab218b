//! Partitioned graph storage.
//!
//! A [`Fragment`] is one partition of an undirected graph. It owns a set of
//! *inner* vertices and keeps read-only *outer* mirrors of remote vertices
//! that are adjacent to an inner vertex across the partition boundary.
//!
//! Local vertices use a dense index space: `0..ivnum` are inner and
//! `ivnum..ivnum + ovnum` are outer. The label store and frontier sets are
//! indexed by that space, so implementations must keep indices stable for
//! the whole computation.
//!
//! # Example
//!
//! ```rust
//! use shardwcc_core::fragment::{Fragment, FragmentBuilder};
//!
//! let mut builder = FragmentBuilder::new(2);
//! builder.add_edge(1, 2);
//! builder.add_edge(2, 3);
//! let fragments = builder.build().unwrap();
//!
//! let total_inner: usize = fragments.iter().map(|f| f.inner_vertices_num()).sum();
//! assert_eq!(total_inner, 3);
//! ```

// SAFETY: Numeric casts in fragment indexing are intentional:
// - u32->usize for local indices: usize is at least 32 bits on supported targets
// - usize->u32 only after FragmentBuilder checked the fragment fits in u32
#![allow(clippy::cast_possible_truncation)]

mod edge_cut;
mod partitioner;


pub use edge_cut::{EdgeCutFragment, FragmentBuilder};
pub use partitioner::{HashPartitioner, Partitioner};

use crate::Vid;

/// Identifier of a fragment, `0..fnum`.
pub type FragmentId = u32;

/// Dense local vertex index within one fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Vertex(u32);

impl Vertex {
    /// Wraps a local index.
    #[must_use]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Returns the local index as `usize` for slot addressing.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Returns the raw local index.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

/// Half-open range of local vertex indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexRange {
    begin: u32,
    end: u32,
}

impl VertexRange {
    /// Creates `begin..end`. An inverted range is treated as empty.
    #[must_use]
    pub fn new(begin: u32, end: u32) -> Self {
        Self {
            begin,
            end: end.max(begin),
        }
    }

    /// First index in the range.
    #[must_use]
    pub fn begin(&self) -> u32 {
        self.begin
    }

    /// One past the last index in the range.
    #[must_use]
    pub fn end(&self) -> u32 {
        self.end
    }

    /// Number of vertices in the range.
    #[must_use]
    pub fn len(&self) -> usize {
        (self.end - self.begin) as usize
    }

    /// Returns true if the range holds no vertex.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.begin == self.end
    }

    /// Returns true if `v` lies in the range.
    #[must_use]
    pub fn contains(&self, v: Vertex) -> bool {
        (self.begin..self.end).contains(&v.raw())
    }

    /// Iterates the vertices in ascending index order.
    pub fn iter(&self) -> impl Iterator<Item = Vertex> {
        (self.begin..self.end).map(Vertex)
    }
}

/// Capability set the propagation core needs from partitioned storage.
///
/// Everything here is read-only: the graph is immutable for the duration
/// of a computation, and implementations are shared across worker threads.
pub trait Fragment: Sync {
    /// Identifier of this fragment.
    fn fid(&self) -> FragmentId;

    /// Total number of fragments in the partitioning.
    fn fnum(&self) -> usize;

    /// Number of owned vertices.
    fn inner_vertices_num(&self) -> usize;

    /// Number of mirrored remote vertices.
    fn outer_vertices_num(&self) -> usize;

    /// Neighbours of `v` reachable by outgoing adjacency. Outer vertices
    /// carry no adjacency.
    fn outgoing_neighbors(&self, v: Vertex) -> &[Vertex];

    /// Global id of a local vertex.
    fn gid(&self, v: Vertex) -> Vid;

    /// Local vertex for a global id, inner or outer, if this fragment
    /// holds it.
    fn gid_to_vertex(&self, gid: Vid) -> Option<Vertex>;

    /// Fragment that owns `v`.
    fn owner(&self, v: Vertex) -> FragmentId;

    /// Inner plus outer vertex count; the size of per-vertex arrays.
    fn vertices_num(&self) -> usize {
        self.inner_vertices_num() + self.outer_vertices_num()
    }

    /// Range of inner vertices, `0..ivnum`.
    fn inner_vertices(&self) -> VertexRange {
        VertexRange::new(0, self.inner_vertices_num() as u32)
    }

    /// Range of outer vertices, `ivnum..ivnum + ovnum`.
    fn outer_vertices(&self) -> VertexRange {
        VertexRange::new(
            self.inner_vertices_num() as u32,
            self.vertices_num() as u32,
        )
    }

    /// Returns true if `v` is owned by this fragment.
    fn is_inner(&self, v: Vertex) -> bool {
        v.index() < self.inner_vertices_num()
    }
}
