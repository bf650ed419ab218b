//! Push-based label propagation step.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::fragment::Fragment;
use crate::frontier::FrontierPair;
use crate::label_store::LabelStore;
use crate::message::MessageManager;
use crate::parallel::ParallelEngine;

/// Runs one propagation pass and returns the number of messages queued.
///
/// Every inner vertex of `curr` offers its label to each outgoing neighbour.
/// A neighbour holding a strictly larger label takes the offer through the
/// atomic minimum and joins `next`. A second pass hands the label of every
/// outer vertex in `next` to the calling worker's outbound channel.
pub fn propagate_label_push<F, M>(
    frag: &F,
    engine: &ParallelEngine,
    labels: &LabelStore,
    frontier: &FrontierPair,
    messages: &M,
) -> usize
where
    F: Fragment,
    M: MessageManager,
{
    let curr = frontier.curr();
    let next = frontier.next();

    engine.for_each_in(curr, frag.inner_vertices(), |_, v| {
        let cid = labels.get(v);
        for &u in frag.outgoing_neighbors(v) {
            if labels.get(u) > cid && labels.try_set_min(u, cid) {
                next.insert(u);
            }
        }
    });

    let queued = AtomicUsize::new(0);
    engine.for_each_in(next, frag.outer_vertices(), |tid, v| {
        messages.sync_state_on_outer_vertex(tid, frag.owner(v), frag.gid(v), labels.get(v));
        queued.fetch_add(1, Ordering::Relaxed);
    });
    queued.into_inner()
}
