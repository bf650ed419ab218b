//! Bulk-synchronous driver.
//!
//! [`SuperstepDriver`] runs one [`Wcc`] controller per fragment over an
//! in-process [`LocalMessageManager`] mesh. Every superstep runs the
//! fragments concurrently on scoped OS threads, joins them as the barrier,
//! then flushes all outboxes. The run ends once a flush carries no message
//! and no fragment asked for continuation.

use std::time::{Duration, Instant};

use rustc_hash::{FxHashMap, FxHashSet};

use crate::config::WccConfig;
use crate::error::{Error, Result};
use crate::fragment::Fragment;
use crate::message::LocalMessageManager;
use crate::wcc::{RoundReport, Wcc, WccContext};
use crate::Vid;

/// Final component label of every vertex, keyed by global id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComponentLabels {
    labels: FxHashMap<Vid, Vid>,
}

impl ComponentLabels {
    fn gather<F: Fragment>(fragments: &[F], contexts: &[WccContext]) -> Self {
        let labels = fragments
            .iter()
            .zip(contexts)
            .flat_map(|(frag, ctx)| ctx.inner_labels(frag))
            .collect();
        Self { labels }
    }

    /// Label of `gid`, if the graph contains it.
    #[must_use]
    pub fn get(&self, gid: Vid) -> Option<Vid> {
        self.labels.get(&gid).copied()
    }

    /// Number of labelled vertices.
    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Returns true if the graph had no vertices.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Number of distinct components.
    #[must_use]
    pub fn component_count(&self) -> usize {
        self.labels.values().collect::<FxHashSet<_>>().len()
    }

    /// `(gid, label)` pairs in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (Vid, Vid)> + '_ {
        self.labels.iter().map(|(&gid, &label)| (gid, label))
    }

    /// `(gid, label)` pairs sorted by gid.
    #[must_use]
    pub fn to_sorted_vec(&self) -> Vec<(Vid, Vid)> {
        let mut pairs: Vec<_> = self.iter().collect();
        pairs.sort_unstable();
        pairs
    }

    /// Consumes the labels into the underlying map.
    #[must_use]
    pub fn into_map(self) -> FxHashMap<Vid, Vid> {
        self.labels
    }
}

/// Totals for a completed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// IncEval supersteps executed after PEval.
    pub rounds: u32,
    /// Label messages exchanged between fragments.
    pub messages_sent: usize,
    /// Number of fragments.
    pub fragments: usize,
    /// Wall-clock time of the run.
    pub elapsed: Duration,
}

/// State handed to the observer after every superstep's flush.
#[derive(Debug)]
pub struct SuperstepReport<'a, F> {
    /// 0 for PEval, then 1, 2, ... for IncEval.
    pub superstep: u32,
    /// Per-fragment reports, indexed by fragment id.
    pub reports: &'a [RoundReport],
    /// Messages flushed at the end of this superstep.
    pub messages_sent: usize,
    /// Whether another superstep follows.
    pub active: bool,
    fragments: &'a [F],
    contexts: &'a [WccContext],
}

impl<'a, F: Fragment> SuperstepReport<'a, F> {
    /// Current `(gid, label)` of every inner vertex.
    pub fn labels(&self) -> impl Iterator<Item = (Vid, Vid)> + 'a {
        let fragments = self.fragments;
        let contexts = self.contexts;
        fragments
            .iter()
            .zip(contexts)
            .flat_map(|(frag, ctx)| ctx.inner_labels(frag))
    }
}

/// Runs WCC over a complete fragment set.
#[derive(Debug, Clone)]
pub struct SuperstepDriver {
    config: WccConfig,
}

impl SuperstepDriver {
    /// Creates a driver after validating `config`.
    pub fn new(config: WccConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Effective configuration.
    #[must_use]
    pub fn config(&self) -> &WccConfig {
        &self.config
    }

    /// Runs to global quiescence.
    ///
    /// # Errors
    ///
    /// Fails on an inconsistent fragment set, a transport or delivery error,
    /// or when the run has not converged after `driver.max_rounds`
    /// IncEval supersteps.
    pub fn run<F: Fragment>(&self, fragments: &[F]) -> Result<(ComponentLabels, RunSummary)> {
        self.run_with_observer(fragments, |_| {})
    }

    /// Like [`run`](Self::run), calling `observer` after every superstep.
    pub fn run_with_observer<F, O>(
        &self,
        fragments: &[F],
        mut observer: O,
    ) -> Result<(ComponentLabels, RunSummary)>
    where
        F: Fragment,
        O: FnMut(&SuperstepReport<'_, F>),
    {
        check_fragment_set(fragments)?;
        let max_rounds = self.config.driver.max_rounds;

        let controllers = fragments
            .iter()
            .map(|_| Wcc::new(&self.config.parallel))
            .collect::<Result<Vec<_>>>()?;
        let mut contexts: Vec<WccContext> = fragments
            .iter()
            .zip(&controllers)
            .map(|(frag, wcc)| wcc.init_context(frag))
            .collect();
        let mut mesh = LocalMessageManager::mesh(fragments.len());

        tracing::info!(
            fragments = fragments.len(),
            threads_per_fragment = controllers[0].thread_num(),
            max_rounds,
            "starting wcc run"
        );
        let start = Instant::now();

        let mut superstep = 0u32;
        let mut messages_sent = 0usize;
        loop {
            let span = tracing::debug_span!("superstep", superstep);
            let _enter = span.enter();

            let reports = step_all(fragments, &controllers, &mut contexts, &mut mesh, superstep)?;
            let (sent, continue_requested) = flush(&mut mesh)?;
            messages_sent += sent;
            let active = continue_requested || sent > 0;

            tracing::debug!(sent, continue_requested, "superstep barrier");
            observer(&SuperstepReport {
                superstep,
                reports: &reports,
                messages_sent: sent,
                active,
                fragments,
                contexts: &contexts,
            });

            if !active {
                break;
            }
            if superstep >= max_rounds {
                tracing::warn!(
                    max_rounds,
                    in_flight = sent,
                    "wcc run did not converge within the round limit"
                );
                return Err(Error::RoundLimitExceeded { limit: max_rounds });
            }
            superstep += 1;
        }

        for ctx in &mut contexts {
            ctx.converge();
        }
        let labels = ComponentLabels::gather(fragments, &contexts);
        let summary = RunSummary {
            rounds: superstep,
            messages_sent,
            fragments: fragments.len(),
            elapsed: start.elapsed(),
        };

        tracing::info!(
            rounds = summary.rounds,
            messages_sent,
            vertices = labels.len(),
            elapsed_ms = summary.elapsed.as_millis(),
            "wcc run converged"
        );
        Ok((labels, summary))
    }
}

fn check_fragment_set<F: Fragment>(fragments: &[F]) -> Result<()> {
    if fragments.is_empty() {
        return Err(Error::EmptyPartitioning);
    }
    for (index, frag) in fragments.iter().enumerate() {
        if frag.fid() as usize != index {
            return Err(Error::FragmentMismatch(format!(
                "fragment at position {index} reports id {}",
                frag.fid()
            )));
        }
        if frag.fnum() != fragments.len() {
            return Err(Error::FragmentMismatch(format!(
                "fragment {} expects {} fragments, {} given",
                frag.fid(),
                frag.fnum(),
                fragments.len()
            )));
        }
    }
    Ok(())
}

/// Runs PEval (superstep 0) or IncEval on every fragment and waits for all
/// of them.
fn step_all<F: Fragment>(
    fragments: &[F],
    controllers: &[Wcc],
    contexts: &mut [WccContext],
    mesh: &mut [LocalMessageManager],
    superstep: u32,
) -> Result<Vec<RoundReport>> {
    let step = move |frag: &F,
                     wcc: &Wcc,
                     ctx: &mut WccContext,
                     messages: &mut LocalMessageManager| {
        if superstep == 0 {
            wcc.peval(frag, ctx, messages)
        } else {
            wcc.inc_eval(frag, ctx, messages)
        }
    };

    // No thread hop for a single fragment
    if let ([frag], [wcc], [ctx], [messages]) =
        (fragments, controllers, &mut *contexts, &mut *mesh)
    {
        return Ok(vec![step(frag, wcc, ctx, messages)?]);
    }

    std::thread::scope(|scope| {
        let handles: Vec<_> = fragments
            .iter()
            .zip(controllers)
            .zip(contexts.iter_mut())
            .zip(mesh.iter_mut())
            .map(|(((frag, wcc), ctx), messages)| {
                scope.spawn(move || step(frag, wcc, ctx, messages))
            })
            .collect();

        handles
            .into_iter()
            .map(|handle| match handle.join() {
                Ok(report) => report,
                Err(payload) => std::panic::resume_unwind(payload),
            })
            .collect()
    })
}

/// Delivers every outbox. Returns the number of messages sent and whether
/// any fragment requested continuation.
fn flush(mesh: &mut [LocalMessageManager]) -> Result<(usize, bool)> {
    let mut sent = 0;
    let mut continue_requested = false;
    for endpoint in mesh {
        let traffic = endpoint.finish_round()?;
        sent += traffic.sent;
        continue_requested |= traffic.continue_requested;
    }
    Ok((sent, continue_requested))
}
