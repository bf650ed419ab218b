//! Weakly connected components by superstep label propagation.
//!
//! Each vertex starts with its own global id as label and repeatedly pushes
//! its label to its neighbours; a neighbour adopts any strictly smaller
//! label. At quiescence every vertex carries the minimum global id of its
//! component.
//!
//! [`Wcc`] is the phase controller. The scheduler calls [`Wcc::peval`] once
//! per fragment, then [`Wcc::inc_eval`] every superstep until no fragment
//! asks for another round and no message is in flight. Continuation is
//! signalled through [`MessageManager::force_continue`] whenever the next
//! frontier holds an inner vertex.
//!
//! # Example
//!
//! ```rust
//! use shardwcc_core::config::ParallelConfig;
//! use shardwcc_core::fragment::FragmentBuilder;
//! use shardwcc_core::message::LocalMessageManager;
//! use shardwcc_core::wcc::{Wcc, WccContext};
//!
//! let mut builder = FragmentBuilder::new(1);
//! builder.extend_edges([(1, 2), (2, 3), (3, 4)]);
//! let fragments = builder.build().unwrap();
//! let frag = &fragments[0];
//!
//! let wcc = Wcc::new(&ParallelConfig::default()).unwrap();
//! let mut ctx = WccContext::new(frag);
//! let mut messages = LocalMessageManager::mesh(1).remove(0);
//!
//! let mut report = wcc.peval(frag, &mut ctx, &mut messages).unwrap();
//! while report.continue_requested {
//!     messages.finish_round().unwrap();
//!     report = wcc.inc_eval(frag, &mut ctx, &mut messages).unwrap();
//! }
//! assert!(ctx.inner_labels(frag).all(|(_, label)| label == 1));
//! ```

mod context;
mod propagate;

#[cfg(test)]
mod tests;

pub use context::{Phase, WccContext};
pub use propagate::propagate_label_push;

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::config::ParallelConfig;
use crate::error::{Error, Result};
use crate::fragment::Fragment;
use crate::message::MessageManager;
use crate::parallel::ParallelEngine;

/// Counters for one fragment's round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundReport {
    /// Phase the context entered by completing this round.
    pub phase: Phase,
    /// Messages drained at the start of the round (0 for PEval).
    pub messages_received: usize,
    /// Drained messages that lowered a label.
    pub messages_applied: usize,
    /// Outer-vertex updates queued for other fragments.
    pub messages_queued: usize,
    /// Inner vertices in the next frontier.
    pub frontier_size: usize,
    /// Whether this fragment asked for another round.
    pub continue_requested: bool,
}

/// Phase controller for WCC on one fragment.
#[derive(Debug)]
pub struct Wcc {
    engine: ParallelEngine,
}

impl Wcc {
    /// Creates a controller with its own worker pool.
    pub fn new(config: &ParallelConfig) -> Result<Self> {
        Ok(Self::with_engine(ParallelEngine::new(config)?))
    }

    /// Creates a controller over an existing engine.
    #[must_use]
    pub fn with_engine(engine: ParallelEngine) -> Self {
        Self { engine }
    }

    /// Number of workers in the pool.
    #[must_use]
    pub fn thread_num(&self) -> usize {
        self.engine.thread_num()
    }

    /// Allocates the label store and frontier pair for `frag`, ready for
    /// [`peval`](Self::peval).
    #[must_use]
    pub fn init_context<F: Fragment>(&self, frag: &F) -> WccContext {
        WccContext::new(frag)
    }

    /// Initial evaluation: label every vertex with its own global id, seed
    /// the frontier with all inner vertices, and propagate once.
    pub fn peval<F, M>(
        &self,
        frag: &F,
        ctx: &mut WccContext,
        messages: &mut M,
    ) -> Result<RoundReport>
    where
        F: Fragment,
        M: MessageManager,
    {
        if ctx.phase != Phase::Uninitialized {
            return Err(Error::PhaseOrder {
                expected: "Uninitialized",
                found: ctx.phase,
            });
        }
        check_sizes(frag, ctx)?;

        messages.init_channels(self.engine.thread_num());

        let labels = &ctx.labels;
        let curr = ctx.frontier.curr();
        self.engine.for_each(frag.inner_vertices(), |_, v| {
            labels.set(v, frag.gid(v));
            curr.insert(v);
        });
        // Placeholder until the owner's label arrives
        self.engine.for_each(frag.outer_vertices(), |_, v| {
            labels.set(v, frag.gid(v));
        });

        let queued =
            propagate_label_push(frag, &self.engine, &ctx.labels, &ctx.frontier, &*messages);
        Ok(self.finish_round(frag, ctx, messages, Phase::Initial, 0, 0, queued))
    }

    /// Incremental evaluation: apply labels delivered since the previous
    /// round, then propagate from every vertex they lowered.
    pub fn inc_eval<F, M>(
        &self,
        frag: &F,
        ctx: &mut WccContext,
        messages: &mut M,
    ) -> Result<RoundReport>
    where
        F: Fragment,
        M: MessageManager,
    {
        let round = match ctx.phase {
            Phase::Initial => 1,
            Phase::Incremental(round) => round + 1,
            found => {
                return Err(Error::PhaseOrder {
                    expected: "Initial or Incremental",
                    found,
                })
            }
        };

        self.engine.clear(ctx.frontier.next());

        let incoming = messages.take_incoming();
        let applied = AtomicUsize::new(0);
        let labels = &ctx.labels;
        let curr = ctx.frontier.curr();
        self.engine.for_each_message(&incoming, |_, msg| {
            let u = frag
                .gid_to_vertex(msg.gid)
                .filter(|&u| frag.is_inner(u))
                .ok_or(Error::UnknownVertex {
                    fid: frag.fid(),
                    gid: msg.gid,
                })?;
            if labels.get(u) > msg.label && labels.try_set_min(u, msg.label) {
                curr.insert(u);
                applied.fetch_add(1, Ordering::Relaxed);
            }
            Ok(())
        })?;

        let queued =
            propagate_label_push(frag, &self.engine, &ctx.labels, &ctx.frontier, &*messages);
        Ok(self.finish_round(
            frag,
            ctx,
            messages,
            Phase::Incremental(round),
            incoming.len(),
            applied.into_inner(),
            queued,
        ))
    }

    /// Continuation check, frontier swap and phase transition shared by
    /// both entry points.
    #[allow(clippy::too_many_arguments)]
    fn finish_round<F, M>(
        &self,
        frag: &F,
        ctx: &mut WccContext,
        messages: &M,
        phase: Phase,
        received: usize,
        applied: usize,
        queued: usize,
    ) -> RoundReport
    where
        F: Fragment,
        M: MessageManager,
    {
        let frontier_size = ctx.frontier.next().partial_count(frag.inner_vertices());
        let continue_requested = frontier_size > 0;
        if continue_requested {
            messages.force_continue();
        }
        ctx.frontier.swap();
        ctx.phase = phase;

        tracing::debug!(
            fid = frag.fid(),
            %phase,
            received,
            applied,
            queued,
            frontier = frontier_size,
            continue_requested,
            "wcc round complete"
        );

        RoundReport {
            phase,
            messages_received: received,
            messages_applied: applied,
            messages_queued: queued,
            frontier_size,
            continue_requested,
        }
    }
}

fn check_sizes<F: Fragment>(frag: &F, ctx: &WccContext) -> Result<()> {
    if ctx.labels.len() != frag.vertices_num() {
        return Err(Error::FragmentMismatch(format!(
            "context sized for {} vertices, fragment {} holds {}",
            ctx.labels.len(),
            frag.fid(),
            frag.vertices_num()
        )));
    }
    Ok(())
}
