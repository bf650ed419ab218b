//! Tests for the in-process message mesh.

use super::message::{LabelMessage, LocalMessageManager, MessageManager, RoundTraffic};

#[test]
fn test_mesh_endpoints_are_indexed_by_fragment() {
    let mesh = LocalMessageManager::mesh(3);
    let fids: Vec<u32> = mesh.iter().map(LocalMessageManager::fid).collect();
    assert_eq!(fids, vec![0, 1, 2]);
}

#[test]
fn test_messages_are_delivered_after_flush() {
    let mut mesh = LocalMessageManager::mesh(2);
    mesh[0].init_channels(2);
    mesh[0].sync_state_on_outer_vertex(0, 1, 5, 3);
    mesh[0].sync_state_on_outer_vertex(1, 1, 7, 3);
    assert_eq!(mesh[0].pending_outbound(), 2);

    // Nothing is visible before the round boundary
    assert!(mesh[1].take_incoming().is_empty());

    let traffic = mesh[0].finish_round().unwrap();
    assert_eq!(
        traffic,
        RoundTraffic {
            sent: 2,
            continue_requested: false
        }
    );
    assert_eq!(mesh[0].pending_outbound(), 0);

    let mut incoming = mesh[1].take_incoming();
    incoming.sort_by_key(|m| m.gid);
    assert_eq!(
        incoming,
        vec![LabelMessage::new(5, 3), LabelMessage::new(7, 3)]
    );
    // Drained exactly once
    assert!(mesh[1].take_incoming().is_empty());
}

#[test]
fn test_continue_flag_is_per_round() {
    let mut mesh = LocalMessageManager::mesh(1);
    mesh[0].init_channels(1);
    mesh[0].force_continue();
    assert!(mesh[0].finish_round().unwrap().continue_requested);
    assert!(!mesh[0].finish_round().unwrap().continue_requested);
}

#[test]
fn test_batches_accumulate_across_rounds_until_drained() {
    let mut mesh = LocalMessageManager::mesh(3);
    for endpoint in &mut mesh {
        endpoint.init_channels(1);
    }
    mesh[0].sync_state_on_outer_vertex(0, 2, 1, 0);
    mesh[0].finish_round().unwrap();
    mesh[1].sync_state_on_outer_vertex(0, 2, 4, 0);
    mesh[1].finish_round().unwrap();

    assert_eq!(mesh[2].take_incoming().len(), 2);
}

#[test]
fn test_flush_to_unknown_fragment_fails() {
    let mut mesh = LocalMessageManager::mesh(1);
    mesh[0].init_channels(1);
    mesh[0].sync_state_on_outer_vertex(0, 9, 1, 1);
    assert!(mesh[0].finish_round().is_err());
}
