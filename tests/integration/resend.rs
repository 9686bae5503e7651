//! Resend planner scenarios: restart recovery, transport windows, and the
//! periodic driver sweep.

use crate::*;

use std::sync::Arc;

use tether_core::config::TetherConfig;
use tether_core::model::{
    NodeRole, Notification, NotificationStatus, ObjectStatus, TransportProtocol,
};
use tether_sync::{Engine, MemoryStore, Store};

/// A node whose chunk retry deadlines land immediately (zero interval).
fn impatient_node(role: NodeRole, max_inflight: usize) -> Node {
    let mut config = TetherConfig::default();
    config.node.role = role;
    config.sync.max_inflight_chunks = max_inflight;
    config.sync.resend_interval_secs = 0;

    let store = Arc::new(MemoryStore::new());
    let comms = Arc::new(RecordingComms::new());
    let webhooks = Arc::new(CountingWebhooks::default());
    let engine = Engine::new(&config, store.clone(), comms.clone())
        .with_webhooks(webhooks.clone());
    Node {
        store,
        comms,
        webhooks,
        engine,
    }
}

/// After a restart there is no in-flight entry: the planner rebuilds one
/// from the store's `Getdata` record and returns the initial MQTT window,
/// without touching the stored record.
#[test]
fn restart_resend_plans_from_scratch() {
    let n = node(NodeRole::Css, 3);
    let meta = sample_meta(20, 8);
    let key = meta.object_key();
    let peer = origin(&meta);

    n.store
        .store_destination(&tether_core::model::Destination {
            org_id: "acme".into(),
            dest_type: peer.peer_type.clone(),
            dest_id: peer.peer_id.clone(),
            protocol: TransportProtocol::Mqtt,
        })
        .unwrap();
    n.store
        .store_object(&meta, None, ObjectStatus::PartiallyReceived)
        .unwrap();
    let record = Notification::new(&key, &peer, NotificationStatus::Getdata, 7);
    n.store.update_notification_record(&record).unwrap();

    assert!(!n.engine.has_active_transfer(&key, &peer));
    let offsets = n.engine.offsets_from_scratch(&record, &meta).unwrap();
    assert_eq!(offsets, vec![0, 8, 16]);

    // The entry now exists; the stored record was not rewritten.
    assert!(n.engine.has_active_transfer(&key, &peer));
    assert_eq!(
        n.store
            .retrieve_notification_record(&key, &peer)
            .unwrap()
            .unwrap(),
        record
    );
}

/// HTTP destinations get a single-request window.
#[test]
fn http_window_is_one() {
    let n = node(NodeRole::Css, 3);
    let meta = sample_meta(20, 8);
    let peer = origin(&meta);

    n.store
        .store_destination(&tether_core::model::Destination {
            org_id: "acme".into(),
            dest_type: peer.peer_type.clone(),
            dest_id: peer.peer_id.clone(),
            protocol: TransportProtocol::Http,
        })
        .unwrap();
    let record = Notification::new(&meta.object_key(), &peer, NotificationStatus::Getdata, 7);

    assert_eq!(
        n.engine.offsets_from_scratch(&record, &meta).unwrap(),
        vec![0]
    );
}

/// Degenerate sizes collapse to a single request at offset 0.
#[test]
fn from_scratch_degenerate_sizes() {
    let n = node(NodeRole::Css, 3);
    let meta = sample_meta(0, 0);
    let peer = origin(&meta);

    n.store
        .store_destination(&tether_core::model::Destination {
            org_id: "acme".into(),
            dest_type: peer.peer_type.clone(),
            dest_id: peer.peer_id.clone(),
            protocol: TransportProtocol::Mqtt,
        })
        .unwrap();
    let record = Notification::new(&meta.object_key(), &peer, NotificationStatus::Getdata, 7);

    assert_eq!(
        n.engine.offsets_from_scratch(&record, &meta).unwrap(),
        vec![0]
    );
}

/// An unknown destination yields nothing from the planner front door, and
/// no entry is created.
#[test]
fn planner_absorbs_store_errors() {
    let n = node(NodeRole::Css, 3);
    let meta = sample_meta(20, 8);
    let peer = origin(&meta);
    let record = Notification::new(&meta.object_key(), &peer, NotificationStatus::Getdata, 7);

    assert!(n.engine.offsets_to_resend(&record, &meta).is_empty());
    assert!(!n.engine.has_active_transfer(&meta.object_key(), &peer));
}

/// Fresh in-flight requests are not due yet.
#[test]
fn nothing_due_while_requests_are_fresh() {
    let n = node(NodeRole::Ess, 2);
    let meta = sample_meta(10, 4);
    n.engine.handle_update(&meta).unwrap();

    let record = n
        .store
        .retrieve_notification_record(&meta.object_key(), &origin(&meta))
        .unwrap()
        .unwrap();
    assert!(n.engine.offsets_to_resend(&record, &meta).is_empty());
}

/// Driver sweep end-to-end: expired requests are re-armed and re-sent.
#[test]
fn resend_pending_reissues_expired_requests() {
    let n = impatient_node(NodeRole::Ess, 2);
    let meta = sample_meta(10, 4);

    n.engine.handle_update(&meta).unwrap();
    assert_eq!(n.comms.get_data_offsets(), vec![0, 4]);
    n.comms.take();

    // Zero interval: both outstanding requests are already past due.
    let requested = n.engine.resend_pending().unwrap();
    assert_eq!(requested, 2);
    assert_eq!(n.comms.get_data_offsets(), vec![0, 4]);

    // The re-request is live: delivering against it still works.
    n.engine
        .handle_data(data_message(&meta, 0, b"aaaa"))
        .unwrap();
}

/// The sweep ignores records whose object has vanished.
#[test]
fn resend_pending_skips_unknown_objects() {
    let n = impatient_node(NodeRole::Ess, 2);
    let meta = sample_meta(10, 4);
    let record = Notification::new(
        &meta.object_key(),
        &origin(&meta),
        NotificationStatus::Getdata,
        7,
    );
    n.store.update_notification_record(&record).unwrap();

    assert_eq!(n.engine.resend_pending().unwrap(), 0);
    assert!(n.comms.sent().is_empty());
}
