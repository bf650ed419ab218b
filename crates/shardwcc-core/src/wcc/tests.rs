//! Tests for the WCC phase controller.

use super::*;
use crate::config::{ParallelConfig, ThreadConfig};
use crate::fragment::{EdgeCutFragment, FragmentBuilder, FragmentId};
use crate::message::LocalMessageManager;
use crate::Vid;

fn controller(threads: usize) -> Wcc {
    let config = ParallelConfig {
        threads: ThreadConfig::Fixed(threads),
        parallel_threshold: 1,
    };
    Wcc::new(&config).unwrap()
}

fn build(fnum: usize, edges: &[(Vid, Vid)]) -> Vec<EdgeCutFragment> {
    let mut builder = FragmentBuilder::new(fnum);
    builder.extend_edges(edges.iter().copied());
    builder.build().unwrap()
}

/// Drives every fragment to quiescence on the calling thread and returns
/// `(gid, label)` for all inner vertices, sorted by gid, plus the number of
/// supersteps after PEval.
fn run_to_quiescence(wcc: &Wcc, fragments: &[EdgeCutFragment]) -> (Vec<(Vid, Vid)>, u32) {
    let mut mesh = LocalMessageManager::mesh(fragments.len());
    let mut contexts: Vec<WccContext> = fragments.iter().map(WccContext::new).collect();

    for ((frag, ctx), messages) in fragments.iter().zip(&mut contexts).zip(&mut mesh) {
        wcc.peval(frag, ctx, messages).unwrap();
    }
    let mut active = flush(&mut mesh);

    let mut rounds = 0;
    while active {
        rounds += 1;
        for ((frag, ctx), messages) in fragments.iter().zip(&mut contexts).zip(&mut mesh) {
            wcc.inc_eval(frag, ctx, messages).unwrap();
        }
        active = flush(&mut mesh);
    }

    let mut labels: Vec<(Vid, Vid)> = fragments
        .iter()
        .zip(&contexts)
        .flat_map(|(frag, ctx)| ctx.inner_labels(frag).collect::<Vec<_>>())
        .collect();
    labels.sort_unstable();
    (labels, rounds)
}

fn flush(mesh: &mut [LocalMessageManager]) -> bool {
    mesh.iter_mut().fold(false, |active, endpoint| {
        let traffic = endpoint.finish_round().unwrap();
        active | traffic.continue_requested | (traffic.sent > 0)
    })
}

#[test]
fn test_path_collapses_to_smallest_gid() {
    let fragments = build(1, &[(1, 2), (2, 3), (3, 4)]);
    let (labels, _) = run_to_quiescence(&controller(1), &fragments);
    assert_eq!(labels, vec![(1, 1), (2, 1), (3, 1), (4, 1)]);
}

#[test]
fn test_two_triangles_stay_separate() {
    let edges = [(1, 2), (2, 3), (3, 1), (4, 5), (5, 6), (6, 4)];
    for threads in [1, 3] {
        let fragments = build(1, &edges);
        let (labels, _) = run_to_quiescence(&controller(threads), &fragments);
        assert_eq!(
            labels,
            vec![(1, 1), (2, 1), (3, 1), (4, 4), (5, 4), (6, 4)],
            "threads = {threads}"
        );
    }
}

#[test]
fn test_cross_fragment_edge_resolves_in_one_superstep() {
    // 10 lives in fragment 0, 5 in fragment 1
    let fragments = build(2, &[(10, 5)]);
    let wcc = controller(1);
    let mut mesh = LocalMessageManager::mesh(2);
    let mut ctx0 = WccContext::new(&fragments[0]);
    let mut ctx1 = WccContext::new(&fragments[1]);

    let r0 = wcc.peval(&fragments[0], &mut ctx0, &mut mesh[0]).unwrap();
    let r1 = wcc.peval(&fragments[1], &mut ctx1, &mut mesh[1]).unwrap();
    assert_eq!(r0.messages_queued, 0);
    assert_eq!(r1.messages_queued, 1);
    assert!(!r0.continue_requested);
    assert!(!r1.continue_requested);
    assert_eq!(mesh[1].finish_round().unwrap().sent, 1);
    mesh[0].finish_round().unwrap();

    let r0 = wcc.inc_eval(&fragments[0], &mut ctx0, &mut mesh[0]).unwrap();
    assert_eq!(r0.phase, Phase::Incremental(1));
    assert_eq!(r0.messages_received, 1);
    assert_eq!(r0.messages_applied, 1);
    assert_eq!(r0.messages_queued, 0);
    assert!(!r0.continue_requested);

    let ten = fragments[0].gid_to_vertex(10).unwrap();
    assert_eq!(ctx0.label_of(ten), 5);
}

#[test]
fn test_cross_fragment_chain_matches_single_fragment() {
    let edges: Vec<(Vid, Vid)> = (1..40).map(|i| (i, i + 1)).collect();
    let single = run_to_quiescence(&controller(1), &build(1, &edges)).0;
    for fnum in 2..=4 {
        let (split, rounds) = run_to_quiescence(&controller(2), &build(fnum, &edges));
        assert_eq!(split, single, "fnum = {fnum}");
        assert!(rounds > 0);
    }
    assert!(single.iter().all(|&(_, label)| label == 1));
}

#[test]
fn test_repeated_runs_agree() {
    let fragments = build(2, &[(1, 2), (2, 3), (3, 4)]);
    let wcc = controller(1);
    let first = run_to_quiescence(&wcc, &fragments).0;
    let second = run_to_quiescence(&wcc, &fragments).0;
    assert_eq!(first, second);
}

#[test]
fn test_fragment_without_inner_vertices() {
    let fragments = FragmentBuilder::new(2)
        .with_partitioner(|_gid: Vid| -> FragmentId { 0 })
        .extend_edges([(1, 2)])
        .build()
        .unwrap();
    let wcc = controller(1);

    let empty = &fragments[1];
    assert_eq!(empty.inner_vertices_num(), 0);
    let mut ctx = WccContext::new(empty);
    let mut mesh = LocalMessageManager::mesh(2);
    let report = wcc.peval(empty, &mut ctx, &mut mesh[1]).unwrap();
    assert_eq!(report.frontier_size, 0);
    assert_eq!(report.messages_queued, 0);
    assert!(!report.continue_requested);

    let (labels, _) = run_to_quiescence(&wcc, &fragments);
    assert_eq!(labels, vec![(1, 1), (2, 1)]);
}

/// Converges a single fragment over a one-endpoint mesh so tests can post
/// messages to themselves.
fn converged_single(edges: &[(Vid, Vid)]) -> (EdgeCutFragment, WccContext, LocalMessageManager) {
    let frag = build(1, edges).remove(0);
    let wcc = controller(1);
    let mut ctx = WccContext::new(&frag);
    let mut messages = LocalMessageManager::mesh(1).remove(0);
    let mut report = wcc.peval(&frag, &mut ctx, &mut messages).unwrap();
    while report.continue_requested {
        messages.finish_round().unwrap();
        report = wcc.inc_eval(&frag, &mut ctx, &mut messages).unwrap();
    }
    messages.finish_round().unwrap();
    (frag, ctx, messages)
}

#[test]
fn test_equal_label_message_is_ignored() {
    let (frag, mut ctx, mut messages) = converged_single(&[(1, 2)]);
    messages.sync_state_on_outer_vertex(0, 0, 2, 1);
    messages.finish_round().unwrap();

    let report = controller(1).inc_eval(&frag, &mut ctx, &mut messages).unwrap();
    assert_eq!(report.messages_received, 1);
    assert_eq!(report.messages_applied, 0);
    assert_eq!(report.frontier_size, 0);
    assert!(!report.continue_requested);
    assert!(!messages.finish_round().unwrap().continue_requested);
}

#[test]
fn test_smaller_label_message_reactivates_component() {
    let (frag, mut ctx, mut messages) = converged_single(&[(1, 2)]);
    messages.sync_state_on_outer_vertex(0, 0, 2, 0);
    messages.finish_round().unwrap();

    let wcc = controller(1);
    let report = wcc.inc_eval(&frag, &mut ctx, &mut messages).unwrap();
    assert_eq!(report.messages_applied, 1);
    assert_eq!(report.frontier_size, 1);
    assert!(report.continue_requested);
    assert!(messages.finish_round().unwrap().continue_requested);

    let report = wcc.inc_eval(&frag, &mut ctx, &mut messages).unwrap();
    assert!(!report.continue_requested);
    assert!(ctx.inner_labels(&frag).all(|(_, label)| label == 0));
}

#[test]
fn test_message_for_unknown_vertex_fails() {
    let (frag, mut ctx, mut messages) = converged_single(&[(1, 2)]);
    messages.sync_state_on_outer_vertex(0, 0, 999, 0);
    messages.finish_round().unwrap();

    let err = controller(1)
        .inc_eval(&frag, &mut ctx, &mut messages)
        .unwrap_err();
    assert!(matches!(err, Error::UnknownVertex { fid: 0, gid: 999 }));
}

#[test]
fn test_message_for_outer_vertex_fails() {
    let fragments = build(2, &[(10, 5)]);
    let wcc = controller(1);
    let mut mesh = LocalMessageManager::mesh(2);
    let mut ctx = WccContext::new(&fragments[0]);
    wcc.peval(&fragments[0], &mut ctx, &mut mesh[0]).unwrap();

    // 5 is only a mirror in fragment 0
    mesh[1].sync_state_on_outer_vertex(0, 0, 5, 1);
    mesh[1].finish_round().unwrap();
    let err = wcc.inc_eval(&fragments[0], &mut ctx, &mut mesh[0]).unwrap_err();
    assert!(matches!(err, Error::UnknownVertex { fid: 0, gid: 5 }));
}

#[test]
fn test_phase_order_is_enforced() {
    let frag = build(1, &[(1, 2)]).remove(0);
    let wcc = controller(1);
    let mut ctx = WccContext::new(&frag);
    let mut messages = LocalMessageManager::mesh(1).remove(0);

    let err = wcc.inc_eval(&frag, &mut ctx, &mut messages).unwrap_err();
    assert!(matches!(
        err,
        Error::PhaseOrder {
            found: Phase::Uninitialized,
            ..
        }
    ));

    wcc.peval(&frag, &mut ctx, &mut messages).unwrap();
    assert_eq!(ctx.phase(), Phase::Initial);
    assert!(wcc.peval(&frag, &mut ctx, &mut messages).is_err());

    wcc.inc_eval(&frag, &mut ctx, &mut messages).unwrap();
    wcc.inc_eval(&frag, &mut ctx, &mut messages).unwrap();
    assert_eq!(ctx.phase(), Phase::Incremental(2));

    ctx.converge();
    assert!(wcc.inc_eval(&frag, &mut ctx, &mut messages).is_err());
}

#[test]
fn test_init_context_matches_fragment_layout() {
    let fragments = build(2, &[(10, 5), (10, 4)]);
    let wcc = controller(2);
    for frag in &fragments {
        let ctx = wcc.init_context(frag);
        assert_eq!(ctx.phase(), Phase::Uninitialized);
        assert_eq!(ctx.labels().len(), frag.vertices_num());
        assert_eq!(ctx.frontier().curr().capacity(), frag.vertices_num());
        assert_eq!(ctx.frontier().curr().count(), 0);
    }

    let frag = &fragments[0];
    let mut ctx = wcc.init_context(frag);
    let mut messages = LocalMessageManager::mesh(2).remove(0);
    assert!(wcc.peval(frag, &mut ctx, &mut messages).is_ok());
}

#[test]
fn test_converged_context_keeps_final_labels() {
    let (frag, mut ctx, mut messages) = converged_single(&[(1, 2), (2, 3)]);
    ctx.converge();
    let settled = ctx.labels().snapshot();

    // Even a smaller label is refused once the scheduler has converged
    messages.sync_state_on_outer_vertex(0, 0, 3, 0);
    messages.finish_round().unwrap();
    let err = controller(1)
        .inc_eval(&frag, &mut ctx, &mut messages)
        .unwrap_err();
    assert!(matches!(
        err,
        Error::PhaseOrder {
            found: Phase::Converged,
            ..
        }
    ));
    assert_eq!(ctx.labels().snapshot(), settled);
    assert_eq!(ctx.phase(), Phase::Converged);
}

#[test]
fn test_context_from_other_fragment_is_rejected() {
    let small = build(1, &[(1, 2)]).remove(0);
    let large = build(1, &[(1, 2), (2, 3)]).remove(0);
    let mut ctx = WccContext::new(&small);
    let mut messages = LocalMessageManager::mesh(1).remove(0);

    let err = controller(1)
        .peval(&large, &mut ctx, &mut messages)
        .unwrap_err();
    assert!(matches!(err, Error::FragmentMismatch(_)));
}

#[test]
fn test_peval_report_counts_frontier() {
    let frag = build(1, &[(1, 2), (2, 3)]).remove(0);
    let mut ctx = WccContext::new(&frag);
    let mut messages = LocalMessageManager::mesh(1).remove(0);

    let report = controller(2).peval(&frag, &mut ctx, &mut messages).unwrap();
    assert_eq!(report.phase, Phase::Initial);
    assert_eq!(report.messages_received, 0);
    // Exact size depends on visit order
    assert!(report.frontier_size >= 1);
    assert!(report.continue_requested);
    assert_eq!(ctx.frontier().curr().count(), report.frontier_size);
}
