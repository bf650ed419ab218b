//! Cross-fragment label messages.
//!
//! [`MessageManager`] is the transport seam the phase controller talks to.
//! [`LocalMessageManager`] implements it in-process: every fragment gets an
//! endpoint with one outbox per worker thread and a crossbeam channel per
//! peer. Outboxes are only touched by their own worker during a round and
//! are flushed to the peers at the round boundary by
//! [`LocalMessageManager::finish_round`].

use std::sync::atomic::{AtomicBool, Ordering};

use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::error::{Error, Result};
use crate::fragment::FragmentId;
use crate::Vid;

/// New label for a vertex, addressed to the fragment that owns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelMessage {
    /// Global id of the target vertex.
    pub gid: Vid,
    /// Candidate component label.
    pub label: Vid,
}

impl LabelMessage {
    /// Creates a message.
    #[must_use]
    pub const fn new(gid: Vid, label: Vid) -> Self {
        Self { gid, label }
    }
}

/// Transport used by the phase controller.
///
/// Sends are queued per worker and become visible to the receiver no later
/// than the start of the next round. No ordering is assumed between
/// messages; label merging is commutative.
pub trait MessageManager: Sync {
    /// Prepares one outbound channel per worker. Called once per PEval.
    fn init_channels(&mut self, thread_num: usize);

    /// Queues the new label of an outer vertex for its owner `dst` on
    /// worker `tid`'s channel.
    fn sync_state_on_outer_vertex(&self, tid: usize, dst: FragmentId, gid: Vid, label: Vid);

    /// Takes every message delivered since the previous call.
    fn take_incoming(&mut self) -> Vec<LabelMessage>;

    /// Asks the scheduler for another round on behalf of this fragment.
    fn force_continue(&self);
}

/// Traffic of one fragment for one round, as seen by the driver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoundTraffic {
    /// Messages handed to peers by this flush.
    pub sent: usize,
    /// Whether the fragment called `force_continue` this round.
    pub continue_requested: bool,
}

type Batch = Vec<LabelMessage>;

/// In-process endpoint of a fully connected fragment mesh.
#[derive(Debug)]
pub struct LocalMessageManager {
    fid: FragmentId,
    outboxes: Vec<Mutex<Vec<(FragmentId, LabelMessage)>>>,
    inbox: Receiver<Batch>,
    peers: Vec<Sender<Batch>>,
    continue_requested: AtomicBool,
}

impl LocalMessageManager {
    /// Creates `fnum` connected endpoints, indexed by fragment id.
    #[must_use]
    pub fn mesh(fnum: usize) -> Vec<Self> {
        let (senders, receivers): (Vec<_>, Vec<_>) =
            (0..fnum).map(|_| crossbeam_channel::unbounded()).unzip();

        receivers
            .into_iter()
            .enumerate()
            .map(|(fid, inbox)| {
                // SAFETY: fid < fnum, and fragment ids are u32 by construction
                #[allow(clippy::cast_possible_truncation)]
                let fid = fid as FragmentId;
                Self {
                    fid,
                    outboxes: vec![Mutex::new(Vec::new())],
                    inbox,
                    peers: senders.clone(),
                    continue_requested: AtomicBool::new(false),
                }
            })
            .collect()
    }

    /// Fragment this endpoint belongs to.
    #[must_use]
    pub fn fid(&self) -> FragmentId {
        self.fid
    }

    /// Messages queued in the outboxes and not yet flushed.
    #[must_use]
    pub fn pending_outbound(&self) -> usize {
        self.outboxes.iter().map(|o| o.lock().len()).sum()
    }

    /// Flushes every outbox to its destinations and resets the round's
    /// continuation flag.
    ///
    /// Messages are batched per destination so each peer receives at most
    /// one channel item per round from this fragment.
    pub fn finish_round(&mut self) -> Result<RoundTraffic> {
        let mut batches: FxHashMap<FragmentId, Batch> = FxHashMap::default();
        let mut sent = 0usize;
        for outbox in &mut self.outboxes {
            for (dst, msg) in outbox.get_mut().drain(..) {
                batches.entry(dst).or_default().push(msg);
                sent += 1;
            }
        }

        for (dst, batch) in batches {
            let peer = self.peers.get(dst as usize).ok_or_else(|| {
                Error::Transport(format!(
                    "fragment {} addressed unknown fragment {dst}",
                    self.fid
                ))
            })?;
            peer.send(batch).map_err(|_| {
                Error::Transport(format!(
                    "fragment {dst} disconnected before round flush from fragment {}",
                    self.fid
                ))
            })?;
        }

        Ok(RoundTraffic {
            sent,
            continue_requested: self.continue_requested.swap(false, Ordering::AcqRel),
        })
    }
}

impl MessageManager for LocalMessageManager {
    fn init_channels(&mut self, thread_num: usize) {
        self.outboxes = (0..thread_num.max(1))
            .map(|_| Mutex::new(Vec::new()))
            .collect();
    }

    fn sync_state_on_outer_vertex(&self, tid: usize, dst: FragmentId, gid: Vid, label: Vid) {
        self.outboxes[tid]
            .lock()
            .push((dst, LabelMessage::new(gid, label)));
    }

    fn take_incoming(&mut self) -> Vec<LabelMessage> {
        self.inbox.try_iter().flatten().collect()
    }

    fn force_continue(&self) {
        self.continue_requested.store(true, Ordering::Release);
    }
}
