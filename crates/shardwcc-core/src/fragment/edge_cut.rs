//! Edge-cut fragments in compressed sparse row layout.
//!
//! Every vertex is owned by exactly one fragment. An undirected edge whose
//! endpoints live in different fragments is stored in both, once from each
//! side, with the remote endpoint mirrored as an outer vertex.

use rustc_hash::{FxHashMap, FxHashSet};

use super::{Fragment, FragmentId, HashPartitioner, Partitioner, Vertex};
use crate::error::{Error, Result};
use crate::Vid;

/// In-memory fragment of an undirected graph.
///
/// Adjacency is stored for inner vertices only, in CSR form: the neighbours
/// of inner vertex `v` are `neighbors[offsets[v]..offsets[v + 1]]`.
#[derive(Debug, Clone)]
pub struct EdgeCutFragment {
    fid: FragmentId,
    fnum: usize,
    ivnum: usize,
    /// Local index -> global id, inner vertices first.
    gids: Vec<Vid>,
    /// Owner of each outer vertex, indexed by `v - ivnum`.
    outer_owners: Vec<FragmentId>,
    offsets: Vec<usize>,
    neighbors: Vec<Vertex>,
    gid_index: FxHashMap<Vid, Vertex>,
}

impl EdgeCutFragment {
    /// Global ids of all local vertices, inner first, by local index.
    #[must_use]
    pub fn gids(&self) -> &[Vid] {
        &self.gids
    }

    /// Number of stored adjacency entries (edges seen from inner vertices).
    #[must_use]
    pub fn edge_num(&self) -> usize {
        self.neighbors.len()
    }
}

impl Fragment for EdgeCutFragment {
    fn fid(&self) -> FragmentId {
        self.fid
    }

    fn fnum(&self) -> usize {
        self.fnum
    }

    fn inner_vertices_num(&self) -> usize {
        self.ivnum
    }

    fn outer_vertices_num(&self) -> usize {
        self.gids.len() - self.ivnum
    }

    fn outgoing_neighbors(&self, v: Vertex) -> &[Vertex] {
        let i = v.index();
        if i >= self.ivnum {
            assert!(
                i < self.gids.len(),
                "vertex {i} out of range for fragment {}",
                self.fid
            );
            return &[];
        }
        &self.neighbors[self.offsets[i]..self.offsets[i + 1]]
    }

    fn gid(&self, v: Vertex) -> Vid {
        self.gids[v.index()]
    }

    fn gid_to_vertex(&self, gid: Vid) -> Option<Vertex> {
        self.gid_index.get(&gid).copied()
    }

    fn owner(&self, v: Vertex) -> FragmentId {
        let i = v.index();
        if i < self.ivnum {
            self.fid
        } else {
            self.outer_owners[i - self.ivnum]
        }
    }
}

/// Builds the full set of [`EdgeCutFragment`]s for a graph.
///
/// Edges are undirected; both endpoints are registered as vertices. Vertex
/// ownership comes from a [`Partitioner`], [`HashPartitioner`] by default.
pub struct FragmentBuilder {
    fnum: usize,
    partitioner: Box<dyn Partitioner>,
    vertices: FxHashSet<Vid>,
    edges: Vec<(Vid, Vid)>,
}

impl FragmentBuilder {
    /// Creates a builder for `fnum` fragments with modulo assignment.
    #[must_use]
    pub fn new(fnum: usize) -> Self {
        Self {
            fnum,
            partitioner: Box::new(HashPartitioner::new(fnum)),
            vertices: FxHashSet::default(),
            edges: Vec::new(),
        }
    }

    /// Replaces the vertex assignment (builder pattern).
    #[must_use]
    pub fn with_partitioner<P: Partitioner + 'static>(mut self, partitioner: P) -> Self {
        self.partitioner = Box::new(partitioner);
        self
    }

    /// Registers a vertex, which may be isolated.
    pub fn add_vertex(&mut self, gid: Vid) -> &mut Self {
        self.vertices.insert(gid);
        self
    }

    /// Adds an undirected edge, registering both endpoints.
    pub fn add_edge(&mut self, src: Vid, dst: Vid) -> &mut Self {
        self.vertices.insert(src);
        self.vertices.insert(dst);
        self.edges.push((src, dst));
        self
    }

    /// Adds every edge of an iterator.
    pub fn extend_edges<I>(&mut self, edges: I) -> &mut Self
    where
        I: IntoIterator<Item = (Vid, Vid)>,
    {
        for (src, dst) in edges {
            self.add_edge(src, dst);
        }
        self
    }

    /// Number of distinct registered vertices.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of edges added, duplicates included.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Partitions the graph and returns fragments ordered by fragment id.
    pub fn build(&self) -> Result<Vec<EdgeCutFragment>> {
        if self.fnum == 0 {
            return Err(Error::EmptyPartitioning);
        }

        let mut owners: FxHashMap<Vid, FragmentId> = FxHashMap::default();
        owners.reserve(self.vertices.len());
        let mut inner: Vec<Vec<Vid>> = vec![Vec::new(); self.fnum];
        for &gid in &self.vertices {
            let fid = self.partitioner.fragment_of(gid);
            if fid as usize >= self.fnum {
                return Err(Error::InvalidPartition {
                    gid,
                    fid,
                    fnum: self.fnum,
                });
            }
            owners.insert(gid, fid);
            inner[fid as usize].push(gid);
        }

        // Half-edges in gid space, grouped by the fragment owning the source
        let mut half_edges: Vec<Vec<(Vid, Vid)>> = vec![Vec::new(); self.fnum];
        for &(src, dst) in &self.edges {
            half_edges[owners[&src] as usize].push((src, dst));
            if src != dst {
                half_edges[owners[&dst] as usize].push((dst, src));
            }
        }

        let fragments = inner
            .into_iter()
            .zip(half_edges)
            .enumerate()
            .map(|(fid, (inner_gids, edges))| {
                // SAFETY: fid < fnum and every fid came from a FragmentId
                #[allow(clippy::cast_possible_truncation)]
                let fid = fid as FragmentId;
                self.build_fragment(fid, inner_gids, &edges, &owners)
            })
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!(
            fnum = self.fnum,
            vertices = self.vertices.len(),
            edges = self.edges.len(),
            "built edge-cut fragments"
        );
        Ok(fragments)
    }

    fn build_fragment(
        &self,
        fid: FragmentId,
        mut inner_gids: Vec<Vid>,
        edges: &[(Vid, Vid)],
        owners: &FxHashMap<Vid, FragmentId>,
    ) -> Result<EdgeCutFragment> {
        inner_gids.sort_unstable();
        let ivnum = inner_gids.len();

        let mut outer_gids: Vec<Vid> = edges
            .iter()
            .map(|&(_, dst)| dst)
            .filter(|dst| owners[dst] != fid)
            .collect();
        outer_gids.sort_unstable();
        outer_gids.dedup();

        let total = ivnum + outer_gids.len();
        if u32::try_from(total).is_err() {
            return Err(Error::FragmentTooLarge {
                fid,
                vertices: total,
            });
        }

        let mut gids = inner_gids;
        gids.extend_from_slice(&outer_gids);
        let gid_index: FxHashMap<Vid, Vertex> = gids
            .iter()
            .enumerate()
            .map(|(i, &gid)| (gid, Vertex::new(i as u32)))
            .collect();
        let outer_owners = outer_gids.iter().map(|gid| owners[gid]).collect();

        let mut adjacency: Vec<Vec<Vertex>> = vec![Vec::new(); ivnum];
        for &(src, dst) in edges {
            adjacency[gid_index[&src].index()].push(gid_index[&dst]);
        }

        let mut offsets = Vec::with_capacity(ivnum + 1);
        let mut neighbors = Vec::with_capacity(edges.len());
        offsets.push(0);
        for mut list in adjacency {
            list.sort_unstable();
            list.dedup();
            neighbors.extend_from_slice(&list);
            offsets.push(neighbors.len());
        }

        Ok(EdgeCutFragment {
            fid,
            fnum: self.fnum,
            ivnum,
            gids,
            outer_owners,
            offsets,
            neighbors,
            gid_index,
        })
    }
}

impl std::fmt::Debug for FragmentBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FragmentBuilder")
            .field("fnum", &self.fnum)
            .field("vertices", &self.vertices.len())
            .field("edges", &self.edges.len())
            .finish_non_exhaustive()
    }
}
