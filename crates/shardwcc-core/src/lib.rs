//! # `shardwcc` Core
//!
//! Weakly connected components over edge-cut partitioned graphs, computed
//! by bulk-synchronous label propagation.
//!
//! Every vertex starts labelled with its own global id. In each superstep a
//! fragment pushes labels from the vertices that changed in the previous
//! round to their neighbours, lowering any strictly larger label, and
//! forwards the new labels of boundary mirrors to the fragments that own
//! them. When no fragment has pending work and no message is in flight,
//! every vertex carries the minimum global id of its component.
//!
//! ## Features
//!
//! - **Lock-free merge**: per-vertex labels live in `AtomicU64` slots lowered
//!   with `fetch_min`
//! - **Sparse work**: atomic bitset frontiers, swapped between rounds
//! - **Parallel rounds**: rayon pool per fragment, fragments run concurrently
//! - **Pluggable transport**: [`message::MessageManager`] seam with an
//!   in-process crossbeam mesh
//!
//! ## Quick Start
//!
//! ```rust
//! use shardwcc_core::{FragmentBuilder, SuperstepDriver, WccConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut builder = FragmentBuilder::new(2);
//!     builder.extend_edges([(1, 2), (2, 3), (10, 11)]);
//!     let fragments = builder.build()?;
//!
//!     let driver = SuperstepDriver::new(WccConfig::default())?;
//!     let (labels, summary) = driver.run(&fragments)?;
//!
//!     assert_eq!(labels.get(3), Some(1));
//!     assert_eq!(labels.get(11), Some(10));
//!     assert_eq!(labels.component_count(), 2);
//!     println!("converged after {} rounds", summary.rounds);
//!     # Ok(())
//! }
//! ```

#![warn(missing_docs)]
// Clippy lints configured in workspace Cargo.toml [workspace.lints.clippy]
#![cfg_attr(
    test,
    allow(
        clippy::doc_markdown,
        clippy::uninlined_format_args,
        clippy::cast_possible_truncation,
        clippy::manual_assert
    )
)]

pub mod config;
pub mod driver;
pub mod error;
pub mod fragment;
pub mod frontier;
pub mod label_store;
pub mod logging;
pub mod message;
#[cfg(test)]
mod message_tests;
pub mod parallel;
pub mod wcc;

/// Global vertex identifier. Also the type of component labels.
pub type Vid = u64;

pub use config::{ThreadConfig, WccConfig};
pub use driver::{ComponentLabels, RunSummary, SuperstepDriver};
pub use error::{Error, Result};
pub use fragment::{EdgeCutFragment, Fragment, FragmentBuilder, FragmentId, Vertex, VertexRange};
pub use message::{LabelMessage, LocalMessageManager, MessageManager};
pub use wcc::{Phase, RoundReport, Wcc, WccContext};
