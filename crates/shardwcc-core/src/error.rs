//! Error types for shardwcc.
//!
//! Label propagation itself is total over valid indices: out-of-range local
//! indices panic. Everything that can go wrong at the edges of the core
//! (configuration, fragment construction, message delivery, phase ordering)
//! is reported through [`Error`].

use thiserror::Error;

use crate::config::ConfigError;
use crate::fragment::FragmentId;
use crate::wcc::Phase;
use crate::Vid;

/// Errors raised by shardwcc.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration could not be loaded or failed validation.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The partitioner assigned a vertex to a fragment outside `0..fnum`.
    #[error("Partitioner assigned vertex {gid} to fragment {fid}, but only {fnum} fragments exist")]
    InvalidPartition {
        /// Global id of the vertex.
        gid: Vid,
        /// Fragment returned by the partitioner.
        fid: FragmentId,
        /// Number of fragments requested.
        fnum: usize,
    },

    /// A fragment set was requested with zero fragments.
    #[error("Cannot partition a graph into zero fragments")]
    EmptyPartitioning,

    /// A fragment holds more vertices than local indices can address.
    #[error("Fragment {fid} holds {vertices} vertices, exceeding the local index space")]
    FragmentTooLarge {
        /// Offending fragment.
        fid: FragmentId,
        /// Inner plus outer vertex count.
        vertices: usize,
    },

    /// A delivered message targets a vertex the fragment does not hold.
    #[error("Fragment {fid} received a label for unknown vertex {gid}")]
    UnknownVertex {
        /// Receiving fragment.
        fid: FragmentId,
        /// Target global id carried by the message.
        gid: Vid,
    },

    /// The phase controller was invoked out of order.
    #[error("Phase order violation: expected {expected}, found {found}")]
    PhaseOrder {
        /// Phase(s) the operation requires.
        expected: &'static str,
        /// Phase the context was in.
        found: Phase,
    },

    /// A peer endpoint of the in-process transport has gone away.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The worker thread pool could not be built.
    #[error("Thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// The driver gave up before global quiescence.
    #[error("No convergence after {limit} rounds")]
    RoundLimitExceeded {
        /// Configured round bound.
        limit: u32,
    },

    /// The driver was given fragments that do not form one partitioning.
    #[error("Inconsistent fragment set: {0}")]
    FragmentMismatch(String),
}

/// Result type alias for shardwcc operations.
pub type Result<T> = std::result::Result<T, Error>;
